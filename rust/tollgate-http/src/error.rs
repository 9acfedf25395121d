use reqwest::StatusCode;
use thiserror::Error;

/// Errors surfaced by the HTTP pipeline
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TollgateHttpError {
    /// The request never produced a response (network unreachable, timeout)
    #[error("Transport failed: {0}")]
    Transport(String),

    /// The server rejected the credential and no refresh was attempted
    /// (the request was already retried, or it targeted the refresh
    /// endpoint itself)
    #[error("Request was not authorized ({status})")]
    Unauthorized {
        /// Status the server responded with
        status: StatusCode,
    },

    /// The server rejected the credential and refreshing it failed. The
    /// session's tokens have been cleared; callers should treat this as a
    /// sign-out rather than retry.
    #[error("Session ended: credential rejected ({status}) and could not be refreshed")]
    SessionEnded {
        /// Status of the original failing response
        status: StatusCode,
    },

    /// Any other unsuccessful status
    #[error("Request failed with status {status}: {body}")]
    Status {
        /// Status the server responded with
        status: StatusCode,
        /// Response body, lossily decoded
        body: String,
    },

    /// A response body could not be decoded
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// A request could not be constructed
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl TollgateHttpError {
    /// True for errors caused by a rejected credential
    pub fn is_authorization(&self) -> bool {
        matches!(self, Self::Unauthorized { .. } | Self::SessionEnded { .. })
    }

    /// The response status, when the error came from a response
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Unauthorized { status }
            | Self::SessionEnded { status }
            | Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for TollgateHttpError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            TollgateHttpError::Decode(error.to_string())
        } else if error.is_builder() {
            TollgateHttpError::InvalidRequest(error.to_string())
        } else {
            TollgateHttpError::Transport(error.to_string())
        }
    }
}

impl From<serde_json::Error> for TollgateHttpError {
    fn from(error: serde_json::Error) -> Self {
        TollgateHttpError::Decode(error.to_string())
    }
}

impl From<url::ParseError> for TollgateHttpError {
    fn from(error: url::ParseError) -> Self {
        TollgateHttpError::InvalidRequest(error.to_string())
    }
}
