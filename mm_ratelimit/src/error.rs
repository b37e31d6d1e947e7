use thiserror::Error;

/// Errors that can occur during rate limiting operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RateLimitError {
    /// Rate limit exceeded and the caller's wait budget ran out
    #[error("Rate limit exceeded")]
    Exceeded,

    #[error("Invalid rate limiter configuration: {0}")]
    InvalidConfig(String),

    #[error("Unknown rate limit strategy: {0}")]
    UnknownStrategy(String),

    #[error("Unknown rate limited service: {0}")]
    UnknownService(String),
}

/// Result type for rate limiting operations
pub type Result<T> = std::result::Result<T, RateLimitError>;
