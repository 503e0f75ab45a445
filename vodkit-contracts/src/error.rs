use thiserror::Error;

use crate::storage::StorageError;

/// Message fragment providers use to report an expired or revoked session.
pub const INVALID_TOKEN_MESSAGE: &str = "Invalid JWT token";

/// Failures raised by a provider.
///
/// Expected domain rejections (wrong password, validation) are never
/// reported through this type; they travel in the `errors` list of a
/// [`vodkit_model::ServiceResponse`].
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Invalid JWT token")]
    InvalidToken,

    #[error("{0} is not available for the active integration")]
    OperationUnavailable(&'static str),

    #[error("Failed to decode provider response: {0}")]
    Decode(String),

    #[error("Provider misconfigured: {0}")]
    Configuration(String),

    #[error("Unexpected provider error: {0}")]
    Unexpected(String),

    /// Provider-owned state (persisted credentials) could not be accessed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ProviderError {
    /// True when the provider rejected the session credentials.
    ///
    /// Providers that only surface a message are matched on the message text.
    pub fn is_invalid_token(&self) -> bool {
        match self {
            ProviderError::InvalidToken => true,
            ProviderError::Transport(message)
            | ProviderError::Unexpected(message) => {
                message.contains(INVALID_TOKEN_MESSAGE)
            }
            _ => false,
        }
    }

    /// Classify a free-form provider message.
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.contains(INVALID_TOKEN_MESSAGE) {
            ProviderError::InvalidToken
        } else {
            ProviderError::Unexpected(message)
        }
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        ProviderError::Decode(err.to_string())
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;
