use thiserror::Error;

/// Failures surfaced by the Xero transport, entity client and managers.
#[derive(Debug, Error)]
pub enum XeroError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rate limit exceeded: gave up after {attempts} attempts")]
    RateLimitExhausted { attempts: u32 },

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Operation not allowed: {0}")]
    OperationNotAllowed(String),

    #[error("HTTP error {status}: {message}")]
    Http {
        status: u16,
        message: String,
        body: String,
    },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for XeroError {
    fn from(err: serde_json::Error) -> Self {
        XeroError::UnexpectedResponse(err.to_string())
    }
}

impl XeroError {
    /// Whether the sync should be attempted again later.
    ///
    /// Credential problems, validation failures and paid-bill guards need a
    /// human; connectivity, throttling and server faults do not.
    pub fn is_retryable(&self) -> bool {
        match self {
            XeroError::Transport(_) | XeroError::RateLimitExhausted { .. } => true,
            XeroError::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
