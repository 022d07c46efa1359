//! Request/response coordinator state machine (responder side)
//!
//! Interprets the status sector and drives the backend. The shared
//! status sector only ever holds the three wire tokens; the local state
//! here is private bookkeeping so a `request_sent` that stays on the
//! wire across several polls triggers the backend exactly once.
//!
//! Transition table (responder perspective):
//!
//! | observed wire status | local state         | action                                   |
//! |----------------------|---------------------|------------------------------------------|
//! | `request_sent`       | any (edge)          | read request, respond, `response_ready`  |
//! | `request_sent`       | any (re-observed)   | nothing                                  |
//! | `idle`               | `ResponseDelivered` | acknowledge pickup                       |
//! | `idle`               | anything else       | nothing                                  |
//! | `response_ready`     | any                 | nothing (awaiting pickup)                |

use mailbox::{MailboxError, SECTOR_SIZE};
use tracing::{debug, info, warn};

use crate::backend::ResponseBackend;
use crate::protocol::{Channel, Status};

/// Local responder state, tracked per coordinator instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponderState {
    /// Nothing in flight
    Idle,
    /// A request edge has been observed and is being answered
    RequestPending,
    /// A response is on the wire, awaiting requester pickup
    ResponseDelivered,
}

/// What one poll iteration observed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// A new request was answered and `response_ready` is on the wire
    Answered { request: String, response: String },
    /// The requester consumed the response and returned the wire to idle
    Acknowledged,
    /// Nothing changed
    Quiet,
}

/// Responder-side protocol state machine
///
/// Owns its state rather than keeping it in module-level variables, so
/// independent instances (one per mailbox, or several in tests) never
/// interfere.
pub struct Coordinator {
    state: ResponderState,
    last_status: Option<Status>,
}

impl Coordinator {
    pub fn new() -> Self {
        Self {
            state: ResponderState::Idle,
            last_status: None,
        }
    }

    /// Current local state
    pub fn state(&self) -> ResponderState {
        self.state
    }

    /// Last wire status observed by [`poll_once`](Self::poll_once)
    pub fn last_status(&self) -> Option<&Status> {
        self.last_status.as_ref()
    }

    /// Observe the status sector once and act on it
    ///
    /// Storage errors propagate to the caller (the driver logs and
    /// backs off); backend errors never do - they degrade to an error
    /// string delivered as a normal response, so the requester is not
    /// left waiting on `request_sent`.
    pub async fn poll_once(
        &mut self,
        channel: &Channel,
        backend: &dyn ResponseBackend,
    ) -> Result<PollOutcome, MailboxError> {
        let status = channel.read_status()?;
        debug!(%status, state = ?self.state, "poll_once: observed status");

        let outcome = match &status {
            Status::RequestSent => {
                if self.last_status == Some(Status::RequestSent) {
                    // Same edge re-observed; the backend already ran
                    debug!("poll_once: request_sent re-observed, no action");
                    self.state = ResponderState::ResponseDelivered;
                    PollOutcome::Quiet
                } else {
                    self.state = ResponderState::RequestPending;
                    let (request, response) = self.answer(channel, backend).await?;
                    self.state = ResponderState::ResponseDelivered;
                    PollOutcome::Answered { request, response }
                }
            }
            Status::Idle => {
                let outcome = if self.state == ResponderState::ResponseDelivered {
                    info!("poll_once: requester consumed the response");
                    PollOutcome::Acknowledged
                } else {
                    PollOutcome::Quiet
                };
                self.state = ResponderState::Idle;
                outcome
            }
            Status::ResponseReady => {
                // Our own write, still awaiting pickup
                self.state = ResponderState::ResponseDelivered;
                PollOutcome::Quiet
            }
            Status::Unknown(raw) => {
                // Empty/garbage before first use: not a request, not a pickup
                debug!(raw = %raw, "poll_once: unknown status token, no action");
                PollOutcome::Quiet
            }
        };

        self.last_status = Some(status);
        Ok(outcome)
    }

    /// Answer the request currently in the request sector
    ///
    /// Payload is written and flushed before the status transition -
    /// the requester only trusts the response sector after observing
    /// `response_ready`.
    async fn answer(
        &mut self,
        channel: &Channel,
        backend: &dyn ResponseBackend,
    ) -> Result<(String, String), MailboxError> {
        let request = channel.read_request()?;
        if request.trim().is_empty() {
            warn!("answer: request_sent observed with empty request text");
        }
        info!(request = %request, "answer: new request");

        let response = match backend.respond(&request).await {
            Ok(text) => text,
            Err(e) => {
                // Degrade to a visible error message; the protocol
                // transition must still complete
                warn!(error = %e, backend = backend.name(), "answer: backend failed, degrading to error text");
                format!("[backend error] {e}")
            }
        };
        let response = fit_sector(&response);

        channel.write_response(response)?;
        channel.write_status(&Status::ResponseReady)?;
        info!(response_len = response.len(), "answer: response delivered");

        Ok((request, response.to_string()))
    }
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new()
    }
}

/// Clip text to what fits a null-terminated sector (511 bytes),
/// cutting at a char boundary so the wire never carries a torn codepoint
fn fit_sector(text: &str) -> &str {
    let max = SECTOR_SIZE - 1;
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
