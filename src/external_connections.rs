use crate::domain::auth::Session;

/// Where the backend lives and how the application identifies itself to it
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackendEndpoint {
    /// Base URL without a trailing slash
    pub base_url: String,
    /// Public API key sent on every request
    pub anon_key: String,
    /// Origin that email verification and OAuth flows redirect back to
    pub site_url: String,
    /// Storage bucket for profile avatars
    pub avatar_bucket: String,
}

impl BackendEndpoint {
    /// Target the backend sends users to after verifying an email or finishing OAuth
    pub fn auth_callback_url(&self) -> String {
        format!("{}/auth/callback", self.site_url.trim_end_matches('/'))
    }
}

/// The shared client handle. Owns the HTTP client and the signed-in session so the domain
/// stays agnostic of how the backend is reached.
pub trait ExternalConnectivity {
    fn http_client(&self) -> &reqwest_middleware::ClientWithMiddleware;
    fn endpoint(&self) -> &BackendEndpoint;
    fn session(&self) -> Option<&Session>;
    fn set_session(&mut self, session: Option<Session>);

    /// Token to present as the bearer credential: the session's access token when signed in,
    /// otherwise the anon key
    fn bearer_token(&self) -> &str {
        match self.session() {
            Some(session) => session.access_token.as_str(),
            None => self.endpoint().anon_key.as_str(),
        }
    }
}
