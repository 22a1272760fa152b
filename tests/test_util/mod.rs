use dotenv::dotenv;
use lazy_static::lazy_static;
use rand::{Rng, thread_rng};
use std::{env, future::Future};
use todo_board::backend::{self, ExternalConnectivity};
use tokio::runtime::Runtime;

lazy_static! {
    static ref TOKIO_RT: Runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Tokio runtime failed to initialize");
}

/// An account which already exists on the test backend and has a verified email
pub struct TestAccount {
    pub email: String,
    pub password: String,
}

/// An address nobody has signed up with yet
pub fn unused_email() -> String {
    let mut rng = thread_rng();
    let suffix: u32 = rng.gen_range(10_000..99_999);
    format!("todo-board-test-{suffix}@example.com")
}

/// Connects to the backend named by BACKEND_URL and BACKEND_ANON_KEY and runs [test_fn] with
/// a signed-out connection and the account from TEST_USER_EMAIL / TEST_USER_PASSWORD.
pub fn prepare_backend_and_test<F, R>(test_fn: F)
where
    R: Future<Output = ()>,
    F: FnOnce(ExternalConnectivity, TestAccount) -> R,
{
    if dotenv().is_err() {
        println!("Test is running without .env file.");
    }

    TOKIO_RT.block_on(async move {
        let endpoint = backend::endpoint_from_env()
            .expect("BACKEND_URL and BACKEND_ANON_KEY must point at a test backend");
        let account = TestAccount {
            email: env::var("TEST_USER_EMAIL")
                .expect("You must provide TEST_USER_EMAIL, a verified account on the test backend"),
            password: env::var("TEST_USER_PASSWORD")
                .expect("You must provide TEST_USER_PASSWORD for TEST_USER_EMAIL"),
        };
        let ext_cxn =
            ExternalConnectivity::new(endpoint).expect("HTTP client should build for tests");

        test_fn(ext_cxn, account).await;
    });
}
