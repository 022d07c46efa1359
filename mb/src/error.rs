//! Mailbox error types

use thiserror::Error;

/// Errors that can occur during sector operations
#[derive(Debug, Error)]
pub enum MailboxError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("file too short for sector {sector} ({file_len} bytes)")]
    TooShort { sector: u32, file_len: u64 },
}

impl MailboxError {
    /// Check whether the backing file is missing entirely
    pub fn is_missing_file(&self) -> bool {
        matches!(self, MailboxError::Io(e) if e.kind() == std::io::ErrorKind::NotFound)
    }
}
