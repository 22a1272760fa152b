/// Base URL of the backend-as-a-service project (e.g. https://abcdefgh.supabase.co)
pub const BACKEND_URL: &str = "BACKEND_URL";
/// Public ("anon") API key for the backend. Sent on every request, so it must never be a service key.
pub const BACKEND_ANON_KEY: &str = "BACKEND_ANON_KEY";
/// Origin the backend should send users back to after email verification or OAuth.
/// Defaults to http://localhost:3000
pub const SITE_URL: &str = "SITE_URL";
/// Storage bucket which holds profile avatars. Defaults to "avatars"
pub const AVATAR_BUCKET: &str = "AVATAR_BUCKET";
/// Log level configuration for the application. For formatting info, see [EnvFilter's documentation](https://docs.rs/tracing-subscriber/latest/tracing_subscriber/filter/struct.EnvFilter.html)
pub const LOG_LEVEL: &str = "LOG_LEVEL";

/// OpenTelemetry span export URL. Usually http://localhost:4317 when a collector is running locally.
/// Span export is disabled when this is unset.
pub const OTEL_SPAN_EXPORT_URL: &str = "OTEL_SPAN_EXPORT_URL";
/// OpenTelemetry metrics export URL. Usually http://localhost:4317 when a collector is running locally.
pub const OTEL_METRIC_EXPORT_URL: &str = "OTEL_METRIC_EXPORT_URL";

