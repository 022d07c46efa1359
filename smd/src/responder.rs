//! Responder loop driver
//!
//! Single-tasked cooperative polling: one poll, one action, one sleep,
//! repeat. The loop only ends on a shutdown signal; per-iteration
//! errors are logged and followed by a longer backoff so a transient
//! storage failure never kills the daemon.

use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::backend::ResponseBackend;
use crate::config::MailboxConfig;
use crate::coordinator::{Coordinator, PollOutcome};
use crate::protocol::Channel;

/// Long-lived foreground responder process
pub struct Responder {
    channel: Channel,
    backend: std::sync::Arc<dyn ResponseBackend>,
    coordinator: Coordinator,
    config: MailboxConfig,
}

impl Responder {
    pub fn new(channel: Channel, backend: std::sync::Arc<dyn ResponseBackend>, config: MailboxConfig) -> Self {
        Self {
            channel,
            backend,
            coordinator: Coordinator::new(),
            config,
        }
    }

    /// Run until the shutdown channel fires
    ///
    /// No cleanup is needed on exit: every sector write is flushed as
    /// it happens, so there is nothing in flight to roll back.
    pub async fn run(&mut self, mut shutdown: mpsc::Receiver<()>) {
        info!(
            mailbox = %self.channel.path().display(),
            backend = self.backend.name(),
            poll_interval_ms = self.config.poll_interval_ms,
            "Responder started"
        );
        println!("Watching mailbox: {}", self.channel.path().display());
        println!("Waiting for requests...");

        loop {
            let pause = match self.poll_and_report().await {
                Ok(()) => self.config.poll_interval(),
                Err(e) => {
                    error!(error = %e, "Poll iteration failed, backing off");
                    println!("! mailbox error: {e} (retrying)");
                    self.config.error_backoff()
                }
            };

            tokio::select! {
                _ = shutdown.recv() => {
                    debug!("run: shutdown signal received");
                    break;
                }
                _ = tokio::time::sleep(pause) => {}
            }
        }

        info!("Responder stopped");
        println!("Responder stopped.");
    }

    /// One poll iteration plus its progress output
    async fn poll_and_report(&mut self) -> Result<(), mailbox::MailboxError> {
        let outcome = self.coordinator.poll_once(&self.channel, self.backend.as_ref()).await?;

        match outcome {
            PollOutcome::Answered { request, response } => {
                println!("\n[new request] {request}");
                println!("[response]    {response}");
                println!("[delivered, waiting for pickup]");
            }
            PollOutcome::Acknowledged => {
                println!("[requester read the response, waiting for the next request]");
            }
            PollOutcome::Quiet => {}
        }

        Ok(())
    }

    /// Run a single poll (useful for testing)
    pub async fn poll_once(&mut self) -> Result<PollOutcome, mailbox::MailboxError> {
        self.coordinator.poll_once(&self.channel, self.backend.as_ref()).await
    }
}
