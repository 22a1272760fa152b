use crate::external_connections::ExternalConnectivity;
use thiserror::Error;

pub mod auth;
pub mod board;
pub mod category;
pub mod profile;
pub mod todo;

#[cfg(test)]
pub(crate) mod test_util;

#[derive(Error, Debug)]
pub enum DrivenPortError {
    #[error("a communication failure occurred: {0}")]
    CommsFailure(anyhow::Error),
    #[error("{message}")]
    Rejected { status: u16, message: String },
}

impl DrivenPortError {
    /// The human-readable text to show a user for this failure
    pub fn user_message(&self) -> String {
        match self {
            Self::Rejected { message, .. } => message.clone(),
            Self::CommsFailure(err) => format!("could not reach the backend: {err}"),
        }
    }
}

impl From<reqwest_middleware::Error> for DrivenPortError {
    fn from(value: reqwest_middleware::Error) -> Self {
        Self::CommsFailure(value.into())
    }
}

impl From<reqwest::Error> for DrivenPortError {
    fn from(value: reqwest::Error) -> Self {
        Self::CommsFailure(value.into())
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("you must sign in first")]
pub struct NotSignedIn;

/// Retrieves the user attached to the shared client handle, failing if nobody is signed in
pub(crate) fn require_user(
    ext_cxn: &impl ExternalConnectivity,
) -> Result<auth::User, NotSignedIn> {
    ext_cxn
        .session()
        .map(|session| session.user.clone())
        .ok_or(NotSignedIn)
}
