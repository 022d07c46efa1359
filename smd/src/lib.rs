//! sectormaild - responder daemon for the sector mailbox protocol
//!
//! Two processes that share nothing but one flat file talk through it
//! as a mailbox: the requester writes its text into sector 0 and flips
//! the status sector to `request_sent`; this daemon notices, computes a
//! response through a pluggable backend, writes it into sector 1 and
//! flips the status to `response_ready`; the requester reads it and
//! returns the status to `idle`. The status token is the only
//! synchronization signal - there are no locks, just payload-before-
//! status write ordering and one exclusive writer per transition.
//!
//! # Modules
//!
//! - [`protocol`] - wire format: sector roles, status tokens, typed channel
//! - [`coordinator`] - responder-side state machine with edge triggering
//! - [`responder`] - the polling loop driver
//! - [`backend`] - response generation (canned table or remote API)
//! - [`config`] - configuration types and loading
//! - [`cli`] - command-line interface

pub mod backend;
pub mod cli;
pub mod config;
pub mod coordinator;
pub mod protocol;
pub mod responder;

// Re-export commonly used types
pub use backend::{create_backend, BackendError, CannedBackend, OpenAiBackend, ResponseBackend};
pub use config::{BackendConfig, Config, MailboxConfig};
pub use coordinator::{Coordinator, PollOutcome, ResponderState};
pub use protocol::{provision, Channel, Status, MIN_SECTORS, REQUEST_SECTOR, RESPONSE_SECTOR, STATUS_SECTOR};
pub use responder::Responder;
