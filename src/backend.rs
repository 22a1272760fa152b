pub mod auth_driven_ports;
pub mod rest_category_driven_ports;
pub mod rest_profile_driven_ports;
pub mod rest_todo_driven_ports;
pub mod storage_driven_ports;

use crate::app_env;
use crate::domain::DrivenPortError;
use crate::domain::auth::Session;
use crate::entity::ErrorBody;
use crate::external_connections::{self, BackendEndpoint};
use anyhow::Context;
use reqwest::StatusCode;
use reqwest_middleware::{ClientBuilder, RequestBuilder};
use reqwest_tracing::TracingMiddleware;
use serde::de::DeserializeOwned;
use std::env;

const DEFAULT_SITE_URL: &str = "http://localhost:3000";
const DEFAULT_AVATAR_BUCKET: &str = "avatars";

/// Owns the HTTP client and the session for the whole run of the application, so business
/// logic stays agnostic of how the backend is reached
pub struct ExternalConnectivity {
    http_client: reqwest_middleware::ClientWithMiddleware,
    endpoint: BackendEndpoint,
    session: Option<Session>,
}

impl ExternalConnectivity {
    pub fn new(endpoint: BackendEndpoint) -> Result<Self, anyhow::Error> {
        let base_client = reqwest::Client::builder()
            .use_rustls_tls()
            .build()
            .context("building the HTTP client")?;
        let http_client = ClientBuilder::new(base_client)
            .with(TracingMiddleware::default())
            .build();

        Ok(ExternalConnectivity {
            http_client,
            endpoint,
            session: None,
        })
    }
}

impl external_connections::ExternalConnectivity for ExternalConnectivity {
    fn http_client(&self) -> &reqwest_middleware::ClientWithMiddleware {
        &self.http_client
    }

    fn endpoint(&self) -> &BackendEndpoint {
        &self.endpoint
    }

    fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    fn set_session(&mut self, session: Option<Session>) {
        self.session = session;
    }
}

/// Reads the backend's location and credentials from the environment
pub fn endpoint_from_env() -> Result<BackendEndpoint, anyhow::Error> {
    endpoint_from(|name| env::var(name).ok())
}

fn endpoint_from(
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<BackendEndpoint, anyhow::Error> {
    let required = |name: &str| lookup(name).with_context(|| format!("{name} must be set"));

    let base_url = required(app_env::BACKEND_URL)?;
    let anon_key = required(app_env::BACKEND_ANON_KEY)?;
    let site_url = lookup(app_env::SITE_URL).unwrap_or_else(|| DEFAULT_SITE_URL.to_owned());
    let avatar_bucket =
        lookup(app_env::AVATAR_BUCKET).unwrap_or_else(|| DEFAULT_AVATAR_BUCKET.to_owned());

    reqwest::Url::parse(&base_url)
        .with_context(|| format!("{} is not a valid URL: {base_url}", app_env::BACKEND_URL))?;

    Ok(BackendEndpoint {
        base_url: base_url.trim_end_matches('/').to_owned(),
        anon_key,
        site_url: site_url.trim_end_matches('/').to_owned(),
        avatar_bucket,
    })
}

/// Absolute URL of a path on the backend
fn url(ext_cxn: &impl external_connections::ExternalConnectivity, path: &str) -> String {
    format!("{}{path}", ext_cxn.endpoint().base_url)
}

/// Attaches the API key and the bearer credential every backend call needs
fn authorized(
    request: RequestBuilder,
    ext_cxn: &impl external_connections::ExternalConnectivity,
) -> RequestBuilder {
    request
        .header("apikey", &ext_cxn.endpoint().anon_key)
        .bearer_auth(ext_cxn.bearer_token())
}

/// Picks the readable text out of an error response body
fn error_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(ErrorBody::into_message)
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .map(str::to_owned)
                .unwrap_or_else(|| status.to_string())
        })
}

/// Sends a request, turning a non-success status into [DrivenPortError::Rejected]
async fn send(request: RequestBuilder) -> Result<reqwest::Response, DrivenPortError> {
    let response = request.send().await?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(DrivenPortError::Rejected {
        status: status.as_u16(),
        message: error_message(status, &body),
    })
}

async fn send_for_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, DrivenPortError> {
    let parsed = send(request).await?.json::<T>().await?;
    Ok(parsed)
}

#[cfg(test)]
mod backend_tests {
    use super::*;
    use crate::external_connections::test_util::FakeExternalConnectivity;
    use speculoos::prelude::*;

    #[test]
    fn error_message_falls_back_to_status_reason() {
        assert_eq!(
            "Invalid login credentials",
            error_message(
                StatusCode::BAD_REQUEST,
                r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#
            )
        );
        assert_eq!(
            "duplicate key value violates unique constraint",
            error_message(
                StatusCode::CONFLICT,
                r#"{"code":"23505","message":"duplicate key value violates unique constraint"}"#
            )
        );
        assert_eq!(
            "Service Unavailable",
            error_message(StatusCode::SERVICE_UNAVAILABLE, "<html>upstream down</html>")
        );
        assert_eq!("Not Found", error_message(StatusCode::NOT_FOUND, "{}"));
    }

    mod endpoint_from {
        use super::*;
        use std::collections::HashMap;

        fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
            pairs
                .iter()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect()
        }

        #[test]
        fn fills_defaults_and_trims_slash() {
            let env = vars(&[
                (app_env::BACKEND_URL, "https://abc.supabase.co/"),
                (app_env::BACKEND_ANON_KEY, "anon"),
            ]);

            let endpoint = endpoint_from(|name| env.get(name).cloned())
                .expect("complete configuration should be accepted");
            assert_eq!("https://abc.supabase.co", endpoint.base_url);
            assert_eq!("anon", endpoint.anon_key);
            assert_eq!(DEFAULT_SITE_URL, endpoint.site_url);
            assert_eq!(DEFAULT_AVATAR_BUCKET, endpoint.avatar_bucket);
        }

        #[test]
        fn requires_url_and_key() {
            let env = vars(&[(app_env::BACKEND_URL, "https://abc.supabase.co")]);

            let missing_key = endpoint_from(|name| env.get(name).cloned());
            assert_that!(missing_key.map_err(|err| err.to_string()))
                .is_err_containing(format!("{} must be set", app_env::BACKEND_ANON_KEY));
        }

        #[test]
        fn rejects_malformed_url() {
            let env = vars(&[
                (app_env::BACKEND_URL, "not a url"),
                (app_env::BACKEND_ANON_KEY, "anon"),
            ]);

            assert_that!(endpoint_from(|name| env.get(name).cloned())).is_err();
        }
    }

    #[test]
    fn urls_are_rooted_at_backend() {
        let ext_cxn = FakeExternalConnectivity::new();

        assert_eq!(
            "http://localhost:54321/rest/v1/todos",
            url(&ext_cxn, "/rest/v1/todos")
        );
    }
}
