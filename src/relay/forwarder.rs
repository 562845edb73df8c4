//! Relay forwarder: handshake, dispatch and acknowledgment bridge
//!
//! Every inbound event is handled on its own, with the registry as the only
//! shared state:
//!
//! 1. Reserved event names are dropped
//! 2. The sender is resolved to its link
//! 3. Both slots must be occupied, requester checked first
//! 4. Only the requester may initiate
//! 5. The event goes to the responder with the sender id prepended to `args`
//! 6. If the sender attached an `ack_id`, a wait task bridges the responder's
//!    ack back to it, or gives up after the ack timeout
//!
//! Routing failures answer the sender's reply sink with an empty ack.
//! Timeouts and transport failures after the forward leave it unanswered.

use super::handshake::Handshake;
use super::pending::PendingAcks;
use super::protocol::{ServerMessage, stringify_result};
use super::{Outbound, is_reserved_event};
use crate::config::{DEFAULT_ACK_TIMEOUT_MS, DisconnectPolicy};
use crate::core::{ConnectionId, LinkRegistry, Registration, RelayError};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

/// What happened to one inbound event
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// Reserved event name, dropped without logging an error
    Filtered,
    /// Routing failed; nothing was forwarded
    Rejected(RelayError),
    /// Routing succeeded but the responder could not be reached
    Undeliverable(RelayError),
    /// Delivered to the responder
    Forwarded {
        responder: ConnectionId,
        /// Correlation token when a reply is awaited
        token: Option<u64>,
    },
}

/// Routes events between the two peers of a link
pub struct Forwarder {
    registry: Arc<dyn LinkRegistry>,
    outbound: Arc<dyn Outbound>,
    pending: Arc<PendingAcks>,
    ack_timeout: Duration,
    disconnect_policy: DisconnectPolicy,
}

impl Forwarder {
    pub fn new(registry: Arc<dyn LinkRegistry>, outbound: Arc<dyn Outbound>) -> Self {
        Self {
            registry,
            outbound,
            pending: Arc::new(PendingAcks::new()),
            ack_timeout: Duration::from_millis(DEFAULT_ACK_TIMEOUT_MS),
            disconnect_policy: DisconnectPolicy::default(),
        }
    }

    /// How long a forwarded event waits for the responder's ack
    pub fn with_ack_timeout(mut self, ack_timeout: Duration) -> Self {
        self.ack_timeout = ack_timeout;
        self
    }

    pub fn with_disconnect_policy(mut self, policy: DisconnectPolicy) -> Self {
        self.disconnect_policy = policy;
        self
    }

    pub fn pending(&self) -> &Arc<PendingAcks> {
        &self.pending
    }

    /// Ask a new connection for its link id and role
    ///
    /// There is no deadline on the answer.
    pub async fn request_identity(&self, connection_id: &ConnectionId) {
        if let Err(e) = self
            .outbound
            .deliver(connection_id, ServerMessage::Identify)
            .await
        {
            tracing::debug!(connection_id = %connection_id, error = %e, "Identity request not delivered");
        }
    }

    /// Register a connection from its handshake answer
    ///
    /// A later answer re-registers the connection. Malformed answers are
    /// ignored and leave the connection as it was.
    pub async fn handle_identify(
        &self,
        connection_id: &ConnectionId,
        data: &Value,
    ) -> Option<Registration> {
        let Some(handshake) = Handshake::from_value(data) else {
            tracing::warn!(
                connection_id = %connection_id,
                "Malformed handshake answer ignored"
            );
            return None;
        };

        let link_id = handshake.link_id();
        let role = handshake.role();

        if let Err(e) = self.registry.register(connection_id, &link_id, role).await {
            tracing::error!(connection_id = %connection_id, error = %e, "Failed to register connection");
            return None;
        }

        tracing::info!(
            connection_id = %connection_id,
            link_id = %link_id,
            "Socket {} is a {} in pinpoint link {}",
            connection_id,
            role,
            link_id
        );

        if let (Ok(links), Ok(connections)) = (
            self.registry.link_count().await,
            self.registry.connection_count().await,
        ) {
            tracing::debug!(links, connections, "Registry size");
        }

        let confirmation = ServerMessage::Registered {
            link_id: link_id.clone(),
            role,
        };
        if let Err(e) = self.outbound.deliver(connection_id, confirmation).await {
            tracing::debug!(connection_id = %connection_id, error = %e, "Registration confirmation not delivered");
        }

        Some(Registration::new(link_id, role))
    }

    /// Relay one event from `connection_id`
    pub async fn handle_event(
        &self,
        connection_id: &ConnectionId,
        event: String,
        args: Vec<Value>,
        ack_id: Option<u64>,
    ) -> DispatchOutcome {
        if is_reserved_event(&event) {
            tracing::debug!(connection_id = %connection_id, event = %event, "Reserved event not relayed");
            return DispatchOutcome::Filtered;
        }

        tracing::info!(
            connection_id = %connection_id,
            event = %event,
            args = ?args,
            "Handling event"
        );

        let responder = match self.route(connection_id).await {
            Ok(responder) => responder,
            Err(err) => {
                log_rejection(connection_id, &event, &err);
                if let Some(ack_id) = ack_id {
                    self.reply_empty(connection_id, ack_id).await;
                }
                return DispatchOutcome::Rejected(err);
            }
        };

        self.forward(connection_id, responder, event, args, ack_id)
            .await
    }

    /// Responder answer for a forwarded event
    ///
    /// Returns `false` when the token is unknown, expired, or belongs to a
    /// forward addressed to another connection.
    pub async fn handle_ack(&self, connection_id: &ConnectionId, token: u64, result: Value) -> bool {
        self.pending.complete(token, connection_id, result).await
    }

    /// Apply the disconnect policy to a closed connection
    pub async fn disconnect(&self, connection_id: &ConnectionId) {
        tracing::info!(connection_id = %connection_id, "Service disconnected");

        if self.disconnect_policy == DisconnectPolicy::Retain {
            return;
        }

        match self.registry.unregister(connection_id).await {
            Ok(Some(registration)) => {
                tracing::info!(
                    connection_id = %connection_id,
                    link_id = %registration.link_id,
                    role = %registration.role,
                    "Cleared registration"
                );
            }
            Ok(None) => {}
            Err(e) => {
                tracing::error!(connection_id = %connection_id, error = %e, "Failed to clear registration");
            }
        }

        let failed = self.pending.fail_responder(connection_id).await;
        if failed > 0 {
            tracing::warn!(
                connection_id = %connection_id,
                count = failed,
                "Responder left with unanswered forwards"
            );
        }
    }

    /// Find the responder for an event sent by `connection_id`
    async fn route(&self, connection_id: &ConnectionId) -> Result<ConnectionId, RelayError> {
        let registration = self.registry.resolve(connection_id).await?.ok_or_else(|| {
            RelayError::UnregisteredConnection {
                connection_id: connection_id.clone(),
            }
        })?;
        let link_id = registration.link_id;

        let slots = self.registry.peer_slots(&link_id).await?;

        let Some(requester) = slots.requester else {
            return Err(RelayError::MissingRequester { link_id });
        };
        let Some(responder) = slots.responder else {
            return Err(RelayError::MissingResponder { link_id });
        };

        if *connection_id == responder {
            Err(RelayError::ResponderCannotInitiate {
                connection_id: connection_id.clone(),
                link_id,
            })
        } else if *connection_id == requester {
            Ok(responder)
        } else {
            Err(RelayError::StaleRegistration {
                connection_id: connection_id.clone(),
                link_id,
            })
        }
    }

    async fn forward(
        &self,
        sender: &ConnectionId,
        responder: ConnectionId,
        event: String,
        mut args: Vec<Value>,
        ack_id: Option<u64>,
    ) -> DispatchOutcome {
        args.insert(0, Value::String(sender.to_string()));

        tracing::info!(
            connection_id = %sender,
            responder = %responder,
            event = %event,
            "Forwarding to responder"
        );

        let Some(reply_to) = ack_id else {
            let message = ServerMessage::Event {
                event,
                args,
                ack_id: None,
            };
            return match self.outbound.deliver(&responder, message).await {
                Ok(()) => DispatchOutcome::Forwarded {
                    responder,
                    token: None,
                },
                Err(err) => {
                    tracing::error!(responder = %responder, error = %err, "Forward failed");
                    DispatchOutcome::Undeliverable(err)
                }
            };
        };

        let (token, receiver) = self.pending.register(&responder, &event).await;
        let message = ServerMessage::Event {
            event: event.clone(),
            args,
            ack_id: Some(token),
        };

        if let Err(err) = self.outbound.deliver(&responder, message).await {
            self.pending.cancel(token).await;
            tracing::error!(responder = %responder, error = %err, "Forward failed");
            return DispatchOutcome::Undeliverable(err);
        }

        let wait = AckWait {
            outbound: self.outbound.clone(),
            pending: self.pending.clone(),
            requester: sender.clone(),
            reply_to,
            token,
            event,
            timeout: self.ack_timeout,
        };
        tokio::spawn(wait.run(receiver));

        DispatchOutcome::Forwarded {
            responder,
            token: Some(token),
        }
    }

    async fn reply_empty(&self, connection_id: &ConnectionId, ack_id: u64) {
        if let Err(e) = self
            .outbound
            .deliver(connection_id, ServerMessage::empty_ack(ack_id))
            .await
        {
            tracing::debug!(connection_id = %connection_id, error = %e, "Empty ack not delivered");
        }
    }
}

fn log_rejection(connection_id: &ConnectionId, event: &str, err: &RelayError) {
    if err.is_link_state() {
        tracing::warn!(
            connection_id = %connection_id,
            event = %event,
            code = err.error_code(),
            "{}",
            err
        );
    } else {
        tracing::error!(
            connection_id = %connection_id,
            event = %event,
            code = err.error_code(),
            "{}",
            err
        );
    }
}

/// Bridges one responder ack back to the requester's reply sink
struct AckWait {
    outbound: Arc<dyn Outbound>,
    pending: Arc<PendingAcks>,
    requester: ConnectionId,
    /// The requester's own ack id
    reply_to: u64,
    /// Token sent to the responder
    token: u64,
    event: String,
    timeout: Duration,
}

impl AckWait {
    async fn run(self, receiver: oneshot::Receiver<Value>) {
        match tokio::time::timeout(self.timeout, receiver).await {
            Ok(Ok(result)) => {
                let result = stringify_result(result);
                tracing::info!(
                    connection_id = %self.requester,
                    event = %self.event,
                    result = ?result,
                    "Received response"
                );
                let reply = ServerMessage::Ack {
                    ack_id: self.reply_to,
                    result,
                };
                if let Err(e) = self.outbound.deliver(&self.requester, reply).await {
                    tracing::debug!(connection_id = %self.requester, error = %e, "Ack not delivered");
                }
            }
            Ok(Err(_)) => {
                tracing::error!(
                    connection_id = %self.requester,
                    event = %self.event,
                    "Received error: responder went away before acknowledging"
                );
            }
            Err(_) => {
                self.pending.cancel(self.token).await;
                let err = RelayError::AckTimeout {
                    event: self.event.clone(),
                    timeout_ms: self.timeout.as_millis() as u64,
                };
                tracing::error!(
                    connection_id = %self.requester,
                    code = err.error_code(),
                    "Received error: {}",
                    err
                );
            }
        }
    }
}
