//! Response backends
//!
//! The protocol core treats response generation as an opaque
//! collaborator: given a request string, produce a response string.
//! Two implementations exist - a canned lookup table for offline use
//! and a remote text-completion API.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

mod canned;
mod error;
mod openai;

pub use canned::CannedBackend;
pub use error::BackendError;
pub use openai::OpenAiBackend;

use crate::config::BackendConfig;

/// Stateless response generator - each call is independent
///
/// Implementations may fail (network, credentials); the coordinator
/// downgrades any failure to a readable error string, so a broken
/// backend degrades to visible error responses and never to a stuck
/// protocol.
#[async_trait]
pub trait ResponseBackend: Send + Sync {
    /// Short name for logs and progress output
    fn name(&self) -> &str;

    /// Compute the response text for one request
    async fn respond(&self, request: &str) -> Result<String, BackendError>;
}

/// Create a backend based on the provider specified in config
pub fn create_backend(config: &BackendConfig) -> Result<Arc<dyn ResponseBackend>, BackendError> {
    debug!(provider = %config.provider, "create_backend: called");
    match config.provider.as_str() {
        "canned" => {
            debug!("create_backend: creating canned backend");
            Ok(Arc::new(CannedBackend))
        }
        "openai" => {
            debug!("create_backend: creating OpenAI backend");
            Ok(Arc::new(OpenAiBackend::from_config(config)?))
        }
        other => {
            debug!(provider = %other, "create_backend: unknown provider");
            Err(BackendError::InvalidResponse(format!(
                "Unknown backend provider: '{}'. Supported: canned, openai",
                other
            )))
        }
    }
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scripted backend for unit tests
    ///
    /// Returns the queued replies in order and counts calls; an `Err`
    /// entry simulates a backend failure.
    pub struct MockBackend {
        replies: Vec<Result<String, String>>,
        call_count: AtomicUsize,
    }

    impl MockBackend {
        pub fn new(replies: Vec<Result<String, String>>) -> Self {
            Self {
                replies,
                call_count: AtomicUsize::new(0),
            }
        }

        pub fn always(reply: &str) -> Self {
            Self {
                replies: vec![Ok(reply.to_string())],
                call_count: AtomicUsize::new(0),
            }
        }

        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ResponseBackend for MockBackend {
        fn name(&self) -> &str {
            "mock"
        }

        async fn respond(&self, _request: &str) -> Result<String, BackendError> {
            let idx = self.call_count.fetch_add(1, Ordering::SeqCst);
            // A single-entry script repeats forever
            let entry = if self.replies.len() == 1 {
                &self.replies[0]
            } else {
                self.replies
                    .get(idx)
                    .ok_or_else(|| BackendError::InvalidResponse("No more scripted replies".to_string()))?
            };

            match entry {
                Ok(reply) => Ok(reply.clone()),
                Err(msg) => Err(BackendError::InvalidResponse(msg.clone())),
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[tokio::test]
        async fn test_mock_returns_scripted_replies() {
            let backend = MockBackend::new(vec![Ok("one".to_string()), Ok("two".to_string())]);

            assert_eq!(backend.respond("a").await.unwrap(), "one");
            assert_eq!(backend.respond("b").await.unwrap(), "two");
            assert_eq!(backend.call_count(), 2);
        }

        #[tokio::test]
        async fn test_mock_err_entry_fails() {
            let backend = MockBackend::new(vec![Err("boom".to_string())]);
            assert!(backend.respond("a").await.is_err());
        }
    }
}
