//! Webhook rejection reasons.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("missing webhook signature")]
    MissingSignature,

    #[error("invalid webhook signature")]
    InvalidSignature,

    #[error("invalid JSON payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),
}

impl WebhookError {
    /// Whether the request was rejected for failing authentication, as
    /// opposed to being malformed.
    pub fn is_authentication(&self) -> bool {
        matches!(
            self,
            WebhookError::MissingSignature | WebhookError::InvalidSignature
        )
    }
}

pub type WebhookResult<T> = std::result::Result<T, WebhookError>;
