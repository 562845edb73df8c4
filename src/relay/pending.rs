//! Pending acknowledgments for forwarded events
//!
//! Every forward that expects a reply gets a correlation token. The
//! responder echoes the token in its `ack`; the waiting task is woken through
//! a oneshot channel. Entries leave the table on completion, on timeout, or
//! when the responder disconnects.
//!
//! Flow:
//! 1. Forwarder calls `register()` and gets a token plus a receiver
//! 2. The forwarded event carries the token as its `ack_id`
//! 3. The responder's `ack` frame reaches `complete()`
//! 4. The forwarder's wait task receives the result or times out and calls `cancel()`

use crate::core::ConnectionId;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tokio::sync::{Mutex, oneshot};

/// A forward waiting for the responder's acknowledgment
struct PendingAck {
    /// Connection the forward was addressed to; only it may answer
    responder: ConnectionId,
    /// Wakes the wait task
    sender: oneshot::Sender<Value>,
    created_at: Instant,
    /// Event name (for logging)
    event: String,
}

/// Table of in-flight forwards keyed by correlation token
pub struct PendingAcks {
    next_token: AtomicU64,
    pending: Mutex<HashMap<u64, PendingAck>>,
}

impl PendingAcks {
    pub fn new() -> Self {
        Self {
            next_token: AtomicU64::new(1),
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Allocate a token for a forward addressed to `responder`
    pub async fn register(
        &self,
        responder: &ConnectionId,
        event: &str,
    ) -> (u64, oneshot::Receiver<Value>) {
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();

        self.pending.lock().await.insert(
            token,
            PendingAck {
                responder: responder.clone(),
                sender: tx,
                created_at: Instant::now(),
                event: event.to_string(),
            },
        );

        tracing::debug!(token, responder = %responder, event, "Registered pending ack");

        (token, rx)
    }

    /// Deliver the responder's result for `token`
    ///
    /// Returns `false` when the token is unknown (already completed or timed
    /// out) or when `from` is not the connection the forward targeted.
    pub async fn complete(&self, token: u64, from: &ConnectionId, result: Value) -> bool {
        let mut pending = self.pending.lock().await;

        match pending.get(&token) {
            Some(entry) if entry.responder == *from => {}
            Some(entry) => {
                tracing::warn!(
                    token,
                    from = %from,
                    expected = %entry.responder,
                    "Ack from a connection the forward was not addressed to"
                );
                return false;
            }
            None => {
                tracing::warn!(token, from = %from, "Ack for unknown or expired token");
                return false;
            }
        }

        let Some(entry) = pending.remove(&token) else {
            return false;
        };
        drop(pending);

        let elapsed_ms = entry.created_at.elapsed().as_millis();
        if entry.sender.send(result).is_err() {
            tracing::debug!(token, event = %entry.event, "Ack waiter already gone");
            return false;
        }

        tracing::debug!(token, event = %entry.event, elapsed_ms, "Completed pending ack");
        true
    }

    /// Drop `token` without a result
    pub async fn cancel(&self, token: u64) -> bool {
        self.pending.lock().await.remove(&token).is_some()
    }

    /// Fail every forward addressed to `responder`
    ///
    /// Dropping the senders wakes each waiter with a receive error.
    pub async fn fail_responder(&self, responder: &ConnectionId) -> usize {
        let mut pending = self.pending.lock().await;
        let before = pending.len();
        pending.retain(|_, entry| entry.responder != *responder);
        before - pending.len()
    }

    /// Number of forwards still waiting
    pub async fn len(&self) -> usize {
        self.pending.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.pending.lock().await.is_empty()
    }
}

impl Default for PendingAcks {
    fn default() -> Self {
        Self::new()
    }
}
