pub mod app_env;
pub mod backend;
pub mod domain;
pub mod entity;
pub mod external_connections;
pub mod logging;
pub mod shell;
