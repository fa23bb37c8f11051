use thiserror::Error;

/// Errors returned by backend calls.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),

    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP error! Status: {status}")]
    Status {
        status: u16,
        /// `message` field of the error body, when the server sent one.
        message: Option<String>,
    },

    #[error("Invalid response from {endpoint}: {reason}")]
    Decode {
        endpoint: &'static str,
        reason: String,
    },
}

impl ClientError {
    /// HTTP status of a non-2xx response.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Message the server attached to a rejected request.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ClientError::Status {
                message: Some(message),
                ..
            } => Some(message.as_str()),
            _ => None,
        }
    }
}
