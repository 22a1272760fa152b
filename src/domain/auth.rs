use crate::domain;
use crate::domain::DrivenPortError;
use crate::domain::auth::driven_ports::AuthProvider;
use crate::domain::auth::driving_ports::{CurrentUserError, SignInError, SignUpError};
use crate::external_connections::ExternalConnectivity;
use chrono::{DateTime, Utc};
use derive_more::Display;
use tracing::{error, info};
use uuid::Uuid;
use validator::Validate;

/// The identity behind a session
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub email: String,
}

/// An authenticated session. Only ever held in memory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub user: User,
}

/// Sign-up form input. The confirmation must match and the password must meet the minimum length
/// before anything is sent to the backend.
#[derive(Clone, Debug, Validate)]
pub struct SignUpRequest {
    pub email: String,
    #[validate(length(min = 6))]
    pub password: String,
    #[validate(must_match = "password")]
    pub confirm_password: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SignUpOutcome {
    /// The account exists but stays inactive until the link mailed to [email] is followed
    EmailSent { email: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, clap::ValueEnum)]
pub enum OAuthProvider {
    #[display("github")]
    Github,
    #[display("google")]
    Google,
}

pub mod driven_ports {
    use super::*;

    pub trait AuthProvider {
        async fn sign_in_with_password(
            &self,
            email: &str,
            password: &str,
            ext_cxn: &impl ExternalConnectivity,
        ) -> Result<Session, DrivenPortError>;

        /// Registers an account. [redirect_to] is where the verification email should send the user.
        async fn sign_up(
            &self,
            email: &str,
            password: &str,
            redirect_to: &str,
            ext_cxn: &impl ExternalConnectivity,
        ) -> Result<(), DrivenPortError>;

        /// URL the user's browser must visit to start an OAuth sign-in
        fn oauth_authorize_url(
            &self,
            provider: OAuthProvider,
            redirect_to: &str,
            ext_cxn: &impl ExternalConnectivity,
        ) -> String;

        async fn sign_out(&self, ext_cxn: &impl ExternalConnectivity)
        -> Result<(), DrivenPortError>;

        async fn current_user(
            &self,
            ext_cxn: &impl ExternalConnectivity,
        ) -> Result<User, DrivenPortError>;
    }
}

pub mod driving_ports {
    use super::*;
    use thiserror::Error;

    #[derive(Debug, Error)]
    pub enum SignInError {
        #[error("Please verify your email before logging in. Check your inbox.")]
        EmailNotConfirmed,
        #[error("{0}")]
        Rejected(String),
        #[error("could not reach the backend: {0}")]
        CommsFailure(anyhow::Error),
    }

    impl From<DrivenPortError> for SignInError {
        fn from(value: DrivenPortError) -> Self {
            match value {
                DrivenPortError::Rejected { message, .. }
                    if message.contains("Email not confirmed") =>
                {
                    SignInError::EmailNotConfirmed
                }
                DrivenPortError::Rejected { message, .. } => SignInError::Rejected(message),
                DrivenPortError::CommsFailure(err) => SignInError::CommsFailure(err),
            }
        }
    }

    #[derive(Debug, Error)]
    pub enum SignUpError {
        #[error("Passwords do not match.")]
        PasswordMismatch,
        #[error("Password must be at least 6 characters.")]
        PasswordTooShort,
        #[error("{0}")]
        Rejected(String),
        #[error("could not reach the backend: {0}")]
        CommsFailure(anyhow::Error),
    }

    #[derive(Debug, Error)]
    pub enum CurrentUserError {
        #[error(transparent)]
        NotSignedIn(#[from] domain::NotSignedIn),
        #[error(transparent)]
        PortError(#[from] DrivenPortError),
    }

    impl From<DrivenPortError> for SignUpError {
        fn from(value: DrivenPortError) -> Self {
            match value {
                DrivenPortError::Rejected { message, .. } => SignUpError::Rejected(message),
                DrivenPortError::CommsFailure(err) => SignUpError::CommsFailure(err),
            }
        }
    }

    pub trait AuthPort {
        /// Signs in and attaches the resulting session to [ext_cxn]
        async fn sign_in(
            &self,
            email: &str,
            password: &str,
            ext_cxn: &mut impl ExternalConnectivity,
            auth: &impl driven_ports::AuthProvider,
        ) -> Result<User, SignInError>;
        async fn sign_up(
            &self,
            request: &SignUpRequest,
            ext_cxn: &impl ExternalConnectivity,
            auth: &impl driven_ports::AuthProvider,
        ) -> Result<SignUpOutcome, SignUpError>;
        fn oauth_sign_in_url(
            &self,
            provider: OAuthProvider,
            ext_cxn: &impl ExternalConnectivity,
            auth: &impl driven_ports::AuthProvider,
        ) -> String;
        /// Ends the session. The local session is dropped even if the backend can't be told.
        async fn sign_out(
            &self,
            ext_cxn: &mut impl ExternalConnectivity,
            auth: &impl driven_ports::AuthProvider,
        ) -> Result<(), DrivenPortError>;
        /// Asks the backend who the session's token belongs to
        async fn current_user(
            &self,
            ext_cxn: &impl ExternalConnectivity,
            auth: &impl driven_ports::AuthProvider,
        ) -> Result<User, CurrentUserError>;
    }
}

/// Runs the local sign-up checks. A mismatched confirmation is reported ahead of a short password.
fn check_sign_up(request: &SignUpRequest) -> Result<(), SignUpError> {
    let Err(problems) = request.validate() else {
        return Ok(());
    };

    let field_problems = problems.field_errors();
    if field_problems.contains_key("confirm_password") {
        Err(SignUpError::PasswordMismatch)
    } else {
        Err(SignUpError::PasswordTooShort)
    }
}

pub struct AuthService;

impl driving_ports::AuthPort for AuthService {
    #[tracing::instrument(skip_all, fields(email = %email))]
    async fn sign_in(
        &self,
        email: &str,
        password: &str,
        ext_cxn: &mut impl ExternalConnectivity,
        auth: &impl AuthProvider,
    ) -> Result<User, SignInError> {
        let session = match auth.sign_in_with_password(email, password, &*ext_cxn).await {
            Ok(session) => session,
            Err(port_err) => {
                error!("Sign-in failed: {port_err}");
                return Err(port_err.into());
            }
        };

        let user = session.user.clone();
        ext_cxn.set_session(Some(session));
        info!(user_id = %user.id, "signed in");

        Ok(user)
    }

    #[tracing::instrument(skip_all, fields(email = %request.email))]
    async fn sign_up(
        &self,
        request: &SignUpRequest,
        ext_cxn: &impl ExternalConnectivity,
        auth: &impl AuthProvider,
    ) -> Result<SignUpOutcome, SignUpError> {
        check_sign_up(request)?;

        let redirect_to = ext_cxn.endpoint().auth_callback_url();
        auth.sign_up(&request.email, &request.password, &redirect_to, ext_cxn)
            .await
            .inspect_err(|port_err| error!("Sign-up failed: {port_err}"))?;

        Ok(SignUpOutcome::EmailSent {
            email: request.email.clone(),
        })
    }

    fn oauth_sign_in_url(
        &self,
        provider: OAuthProvider,
        ext_cxn: &impl ExternalConnectivity,
        auth: &impl AuthProvider,
    ) -> String {
        let redirect_to = ext_cxn.endpoint().auth_callback_url();
        auth.oauth_authorize_url(provider, &redirect_to, ext_cxn)
    }

    async fn sign_out(
        &self,
        ext_cxn: &mut impl ExternalConnectivity,
        auth: &impl AuthProvider,
    ) -> Result<(), DrivenPortError> {
        if ext_cxn.session().is_none() {
            return Ok(());
        }

        let sign_out_result = auth.sign_out(&*ext_cxn).await;
        ext_cxn.set_session(None);
        if let Err(ref port_err) = sign_out_result {
            error!("Backend sign-out failed, session dropped locally anyway: {port_err}");
        }

        sign_out_result
    }

    async fn current_user(
        &self,
        ext_cxn: &impl ExternalConnectivity,
        auth: &impl AuthProvider,
    ) -> Result<User, CurrentUserError> {
        domain::require_user(ext_cxn)?;

        let user = auth
            .current_user(ext_cxn)
            .await
            .inspect_err(|port_err| error!("Could not fetch current user: {port_err}"))?;
        Ok(user)
    }
}
