use client::ClientError;
use thiserror::Error;

/// Errors surfaced to the user by console operations.
#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// The backend refused the request; the message is shown verbatim.
    #[error("{0}")]
    Rejected(String),

    #[error(transparent)]
    Backend(ClientError),
}

impl ConsoleError {
    /// Maps a backend failure, keeping the server's own message when the
    /// rejection carried one.
    pub fn from_backend(err: ClientError) -> Self {
        match err.server_message() {
            Some(message) => ConsoleError::Rejected(message.to_string()),
            None => ConsoleError::Backend(err),
        }
    }
}

impl From<validator::ValidationErrors> for ConsoleError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .errors()
            .iter()
            .flat_map(|(field, kind)| flatten_validation(field, kind))
            .collect();
        messages.sort();

        ConsoleError::Validation(messages.join(", "))
    }
}

fn flatten_validation(field: &str, kind: &validator::ValidationErrorsKind) -> Vec<String> {
    match kind {
        validator::ValidationErrorsKind::Field(errors) => errors
            .iter()
            .map(|e| {
                let message = e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string());
                format!("{}: {}", field, message)
            })
            .collect(),
        validator::ValidationErrorsKind::Struct(nested) => nested
            .errors()
            .iter()
            .flat_map(|(inner, kind)| flatten_validation(&format!("{}.{}", field, inner), kind))
            .collect(),
        validator::ValidationErrorsKind::List(items) => items
            .iter()
            .flat_map(|(index, nested)| {
                nested
                    .errors()
                    .iter()
                    .flat_map(|(inner, kind)| {
                        flatten_validation(&format!("{}[{}].{}", field, index, inner), kind)
                    })
                    .collect::<Vec<_>>()
            })
            .collect(),
    }
}
