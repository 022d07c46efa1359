//! Backend error types

use thiserror::Error;

/// Errors that can occur while computing a response
///
/// None of these ever reach the wire: the coordinator downgrades a
/// failed backend call to a readable error string delivered as a
/// normal response, so the requester is never left waiting.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("API key not found in environment variable {0}")]
    MissingApiKey(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl BackendError {
    /// Check if this error is worth an in-call retry
    pub fn is_retryable(&self) -> bool {
        match self {
            BackendError::Network(_) => true,
            BackendError::ApiError { status, .. } => *status >= 500 || *status == 429,
            BackendError::MissingApiKey(_) => false,
            BackendError::InvalidResponse(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_retryable() {
        assert!(
            BackendError::ApiError {
                status: 503,
                message: "overloaded".to_string()
            }
            .is_retryable()
        );

        assert!(
            !BackendError::ApiError {
                status: 401,
                message: "unauthorized".to_string()
            }
            .is_retryable()
        );

        assert!(!BackendError::MissingApiKey("OPENAI_API_KEY".to_string()).is_retryable());
        assert!(!BackendError::InvalidResponse("empty choices".to_string()).is_retryable());
    }
}
