/// Errors that can occur while turning a request into wire bytes.
///
/// Always raised before any connection is attempted.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    /// The record cannot be represented as JSON.
    #[error("request is not representable as JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The value is JSON, but not a valid action request.
    #[error("invalid action request: {0}")]
    InvalidRequest(String),

    /// The encoded payload exceeds what the framing can carry.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },
}

pub type Result<T> = std::result::Result<T, EncodeError>;
