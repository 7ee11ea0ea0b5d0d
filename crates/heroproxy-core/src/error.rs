use thiserror::Error;

/// Shared error taxonomy for HeroProxy operations.
///
/// The variants map one-to-one onto what a caller is allowed to learn:
/// transient upstream trouble, a clean empty answer, back-pressure, bad
/// input, or a generic internal failure with no detail leaked.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("hero not found: {0}")]
    NotFound(String),

    #[error("rate limit exceeded")]
    RateLimited,

    #[error("invalid request: {0}")]
    Validation(String),

    #[error("internal error")]
    Internal(String),
}

impl CoreError {
    /// Create a new UpstreamUnavailable error.
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::UpstreamUnavailable(message.into())
    }

    /// Create a new NotFound error.
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound(id.into())
    }

    /// Create a new Validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a new Internal error. The message is for logs only and is
    /// never rendered to callers.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Check if this error is a client error (4xx category).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_) | Self::RateLimited | Self::Validation(_)
        )
    }

    /// Check if this error is a server error (5xx category).
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::UpstreamUnavailable(_) | Self::Internal(_))
    }

    /// Get error category for logging/monitoring.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::UpstreamUnavailable(_) => ErrorCategory::Upstream,
            Self::NotFound(_) => ErrorCategory::NotFound,
            Self::RateLimited => ErrorCategory::RateLimited,
            Self::Validation(_) => ErrorCategory::Validation,
            Self::Internal(_) => ErrorCategory::Internal,
        }
    }
}

/// Error categories for monitoring and classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Upstream,
    NotFound,
    RateLimited,
    Validation,
    Internal,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Upstream => write!(f, "upstream"),
            Self::NotFound => write!(f, "not_found"),
            Self::RateLimited => write!(f, "rate_limited"),
            Self::Validation => write!(f, "validation"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

/// Convenience result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(CoreError::validation("empty name").is_client_error());
        assert!(CoreError::RateLimited.is_client_error());
        assert!(CoreError::not_found("70").is_client_error());

        assert!(CoreError::upstream("connect timeout").is_server_error());
        assert!(CoreError::internal("registry poisoned").is_server_error());

        let err = CoreError::RateLimited;
        assert!(!err.is_server_error());
    }

    #[test]
    fn test_internal_message_not_rendered() {
        let err = CoreError::internal("dedup table inconsistent for key 'batman'");
        assert_eq!(err.to_string(), "internal error");
    }

    #[test]
    fn test_categories() {
        assert_eq!(
            CoreError::upstream("boom").category(),
            ErrorCategory::Upstream
        );
        assert_eq!(CoreError::RateLimited.category(), ErrorCategory::RateLimited);
        assert_eq!(ErrorCategory::Validation.to_string(), "validation");
        assert_eq!(ErrorCategory::NotFound.to_string(), "not_found");
    }
}
