//! Remote store error type.

use tasklist_core::{AppError, NetworkError, ReqwestErrorExt};
use thiserror::Error;

/// A remote call failed. The caller must assume the remote state is unknown.
#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Task store returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Task store unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid task store URL: {0}")]
    InvalidUrl(String),
}

impl RemoteError {
    /// User-friendly error message for display.
    pub fn user_message(&self) -> String {
        match self {
            Self::Network(_) => "Network error. Check your connection.".to_string(),
            Self::Status { status, .. } if *status >= 500 => {
                "The task server is having trouble. Please try again later.".to_string()
            }
            Self::Status { status, .. } => format!("The task server rejected the change ({})", status),
            Self::InvalidResponse(_) => "Unexpected response from the task server".to_string(),
            Self::Unavailable(_) => "The task server is unavailable".to_string(),
            Self::InvalidUrl(_) => "The task server address is not valid".to_string(),
        }
    }
}

impl From<RemoteError> for NetworkError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::Network(e) => e.into_network_error(),
            RemoteError::Status { status, body } => NetworkError::ServerError {
                status,
                message: body,
            },
            RemoteError::InvalidResponse(msg) => NetworkError::InvalidResponse(msg),
            RemoteError::Unavailable(msg) | RemoteError::InvalidUrl(msg) => {
                NetworkError::ConnectionFailed(msg)
            }
        }
    }
}

impl From<RemoteError> for AppError {
    fn from(err: RemoteError) -> Self {
        AppError::Network(err.into())
    }
}
