use shared::{
    domain::{Action, Role},
    error::ApiError,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("not logged in")]
    NotLoggedIn,
    #[error("cannot {action} as {}", role_label(.role))]
    NotPermitted { action: Action, role: Role },
    #[error("at least one email address is required")]
    NoRecipients,
    #[error("invalid event id '{0}'")]
    InvalidEventId(String),
    #[error("invalid api url: {0}")]
    InvalidApiUrl(#[from] url::ParseError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("No response from server")]
    NoResponse(#[source] reqwest::Error),
    #[error("unexpected response from server: {0}")]
    UnexpectedResponse(String),
    #[error("Request setup error: {0}")]
    Request(#[source] reqwest::Error),
}

fn role_label(role: &Role) -> &'static str {
    match role {
        Role::None => "a non-participant",
        other => other.as_str(),
    }
}

impl ClientError {
    pub(crate) fn from_transport(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            ClientError::NoResponse(err)
        } else {
            ClientError::Request(err)
        }
    }

    /// True when the stored session should be discarded and the user asked
    /// to log in again.
    pub fn requires_reauth(&self) -> bool {
        match self {
            ClientError::NotLoggedIn => true,
            ClientError::Api(err) => err.requires_reauth(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
