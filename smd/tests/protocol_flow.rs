//! End-to-end protocol flow tests
//!
//! Plays the requester side of the protocol against a live responder
//! on a real temp mailbox file: write request, flip to `request_sent`,
//! wait for `response_ready`, read the response, return to `idle`.

use std::sync::Arc;
use std::time::Duration;

use sectormaild::config::MailboxConfig;
use sectormaild::protocol::{provision, Channel, Status};
use sectormaild::responder::Responder;
use sectormaild::{CannedBackend, Coordinator, PollOutcome};
use tempfile::TempDir;

fn fresh_mailbox() -> (TempDir, Channel) {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let path = temp.path().join("mailbox.img");
    provision(&path, 3).expect("Failed to provision mailbox");
    let chan = Channel::new(&path);
    chan.write_status(&Status::Idle).expect("Failed to set initial status");
    (temp, chan)
}

/// Requester side of one exchange: send, wait, consume
async fn exchange(chan: &Channel, request: &str) -> String {
    // Payload strictly before status, so the responder never pairs
    // request_sent with stale request text
    chan.write_request(request).unwrap();
    chan.write_status(&Status::RequestSent).unwrap();

    for _ in 0..200 {
        tokio::time::sleep(Duration::from_millis(10)).await;
        if chan.read_status().unwrap() == Status::ResponseReady {
            let response = chan.read_response().unwrap();
            chan.write_status(&Status::Idle).unwrap();
            return response;
        }
    }
    panic!("timed out waiting for response_ready");
}

#[tokio::test]
async fn test_single_exchange_through_live_responder() {
    let (_temp, chan) = fresh_mailbox();

    let config = MailboxConfig {
        path: chan.path().to_path_buf(),
        poll_interval_ms: 5,
        error_backoff_ms: 50,
    };
    let mut responder = Responder::new(chan.clone(), Arc::new(CannedBackend), config);

    let (shutdown_tx, shutdown_rx) = tokio::sync::mpsc::channel(1);
    let handle = tokio::spawn(async move { responder.run(shutdown_rx).await });

    let response = exchange(&chan, "hello").await;
    assert!(response.contains("Hello"), "unexpected response: {response}");

    shutdown_tx.send(()).await.unwrap();
    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("responder should shut down")
        .unwrap();
}

#[tokio::test]
async fn test_sequential_exchanges_reuse_the_same_sectors() {
    let (_temp, chan) = fresh_mailbox();

    let config = MailboxConfig {
        path: chan.path().to_path_buf(),
        poll_interval_ms: 5,
        error_backoff_ms: 50,
    };
    let mut responder = Responder::new(chan.clone(), Arc::new(CannedBackend), config);

    let (shutdown_tx, shutdown_rx) = tokio::sync::mpsc::channel(1);
    let handle = tokio::spawn(async move { responder.run(shutdown_rx).await });

    let first = exchange(&chan, "self test please").await;
    assert!(first.contains("Self-test"), "unexpected response: {first}");

    let second = exchange(&chan, "and hello again").await;
    assert!(second.contains("Hello"), "unexpected response: {second}");

    // Sectors are overwritten in place; the second exchange fully
    // replaced the first
    assert_eq!(chan.read_request().unwrap(), "and hello again");

    shutdown_tx.send(()).await.unwrap();
    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("responder should shut down")
        .unwrap();
}

#[tokio::test]
async fn test_manual_flow_with_coordinator() {
    // The scripted three-step flow, driven poll by poll
    let (_temp, chan) = fresh_mailbox();
    let backend = CannedBackend;
    let mut coord = Coordinator::new();

    // 1. Requester sends
    chan.write_request("what time is it").unwrap();
    chan.write_status(&Status::RequestSent).unwrap();

    // 2. Responder answers on its next poll
    let outcome = coord.poll_once(&chan, &backend).await.unwrap();
    match outcome {
        PollOutcome::Answered { request, response } => {
            assert_eq!(request, "what time is it");
            assert!(response.starts_with("The current time is "));
        }
        other => panic!("expected Answered, got {other:?}"),
    }
    assert_eq!(chan.read_status().unwrap(), Status::ResponseReady);

    // 3. Requester consumes
    chan.write_status(&Status::Idle).unwrap();
    assert_eq!(coord.poll_once(&chan, &backend).await.unwrap(), PollOutcome::Acknowledged);
}

#[tokio::test]
async fn test_two_coordinators_do_not_share_state() {
    // Independent instances on independent mailboxes - module-level
    // state would break this
    let (_temp_a, chan_a) = fresh_mailbox();
    let (_temp_b, chan_b) = fresh_mailbox();
    let backend = CannedBackend;

    let mut coord_a = Coordinator::new();
    let mut coord_b = Coordinator::new();

    chan_a.write_request("hello a").unwrap();
    chan_a.write_status(&Status::RequestSent).unwrap();

    let outcome_a = coord_a.poll_once(&chan_a, &backend).await.unwrap();
    assert!(matches!(outcome_a, PollOutcome::Answered { .. }));

    // Coordinator B saw nothing and must stay quiet on its own mailbox
    assert_eq!(coord_b.poll_once(&chan_b, &backend).await.unwrap(), PollOutcome::Quiet);
    assert_eq!(chan_b.read_status().unwrap(), Status::Idle);
}
