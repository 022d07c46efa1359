//! Canned lookup-table backend
//!
//! Keyword-matched replies for running the protocol without network
//! access or credentials. This is the default backend: the protocol is
//! fully exercisable offline.

use async_trait::async_trait;
use chrono::Local;
use tracing::debug;

use super::{BackendError, ResponseBackend};

/// Backend that answers from a fixed keyword table
pub struct CannedBackend;

#[async_trait]
impl ResponseBackend for CannedBackend {
    fn name(&self) -> &str {
        "canned"
    }

    async fn respond(&self, request: &str) -> Result<String, BackendError> {
        debug!(request_len = request.len(), "respond: called");
        let lower = request.to_lowercase();

        let reply = if request.trim().is_empty() {
            "Please type a question or a thought.".to_string()
        } else if lower.contains("hello") || lower.contains("hi ") || lower == "hi" {
            "Hello! I am the assistant on the other side of the mailbox. Nice to talk to you!".to_string()
        } else if lower.contains("help") {
            "I can explain how this system works or answer simple questions. What would you like to know?".to_string()
        } else if lower.contains("system") {
            "Two processes share one file here: requests go into sector 0, responses come back in sector 1, and \
             sector 2 carries the status token that keeps us in step."
                .to_string()
        } else if lower.contains("thank") {
            "You're welcome! Anything else I can help with?".to_string()
        } else if lower.contains("test") {
            "Self-test passed: the request reached the responder and this reply travelled back the same way.".to_string()
        } else if lower.contains("time") {
            format!("The current time is {}", Local::now().format("%Y-%m-%d %H:%M:%S"))
        } else {
            format!("I hear you saying: \"{}\". Interesting! Tell me more.", request.trim())
        };

        Ok(reply)
    }
}
