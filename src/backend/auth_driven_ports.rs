use crate::domain::DrivenPortError;
use crate::domain::auth::driven_ports::AuthProvider;
use crate::domain::auth::{OAuthProvider, Session, User};
use crate::entity::{AuthUser, PasswordCredentials, TokenResponse};
use crate::external_connections::ExternalConnectivity;

/// The backend's auth service
pub struct RestAuthProvider;

/// Builds the authorize URL for an OAuth sign-in
fn authorize_url(base_url: &str, provider: OAuthProvider, redirect_to: &str) -> String {
    let mut url = match reqwest::Url::parse(&format!("{base_url}/auth/v1/authorize")) {
        Ok(url) => url,
        Err(_) => return format!("{base_url}/auth/v1/authorize?provider={provider}"),
    };
    url.query_pairs_mut()
        .append_pair("provider", &provider.to_string())
        .append_pair("redirect_to", redirect_to);

    url.into()
}

impl AuthProvider for RestAuthProvider {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
        ext_cxn: &impl ExternalConnectivity,
    ) -> Result<Session, DrivenPortError> {
        let request = ext_cxn
            .http_client()
            .post(super::url(ext_cxn, "/auth/v1/token"))
            .query(&[("grant_type", "password")])
            .json(&PasswordCredentials { email, password });

        let token: TokenResponse = super::send_for_json(super::authorized(request, ext_cxn)).await?;
        Ok(token.into())
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        redirect_to: &str,
        ext_cxn: &impl ExternalConnectivity,
    ) -> Result<(), DrivenPortError> {
        let request = ext_cxn
            .http_client()
            .post(super::url(ext_cxn, "/auth/v1/signup"))
            .query(&[("redirect_to", redirect_to)])
            .json(&PasswordCredentials { email, password });

        super::send(super::authorized(request, ext_cxn)).await?;
        Ok(())
    }

    fn oauth_authorize_url(
        &self,
        provider: OAuthProvider,
        redirect_to: &str,
        ext_cxn: &impl ExternalConnectivity,
    ) -> String {
        authorize_url(&ext_cxn.endpoint().base_url, provider, redirect_to)
    }

    async fn sign_out(&self, ext_cxn: &impl ExternalConnectivity) -> Result<(), DrivenPortError> {
        let request = ext_cxn
            .http_client()
            .post(super::url(ext_cxn, "/auth/v1/logout"));

        super::send(super::authorized(request, ext_cxn)).await?;
        Ok(())
    }

    async fn current_user(
        &self,
        ext_cxn: &impl ExternalConnectivity,
    ) -> Result<User, DrivenPortError> {
        let request = ext_cxn.http_client().get(super::url(ext_cxn, "/auth/v1/user"));

        let user: AuthUser = super::send_for_json(super::authorized(request, ext_cxn)).await?;
        Ok(user.into())
    }
}
