//! Relay session: the per-connection state machine.
//!
//! Each connection gets one `RelaySession`, driven by the transport
//! layer. The session registers an identifier on open, hands back the
//! welcome envelope, routes inbound envelopes while active, and
//! deregisters on close. Sessions only share state through the
//! registry; an error on one connection never touches another.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::envelope::Envelope;
use crate::registry::{ConnectionRegistry, OutboundFrame, SendResult};
use crate::types::{ConnectionId, SessionState};

/// State machine for a single relayed connection.
///
/// Lifecycle: `Connected` → [`activate`](Self::activate) once the
/// transport has written the welcome envelope → `Active` →
/// [`close`](Self::close) on disconnect or transport error → `Closed`.
pub struct RelaySession {
    /// Identifier assigned at registration
    id: ConnectionId,
    /// Shared connection registry
    registry: Arc<ConnectionRegistry>,
    /// Current lifecycle state
    state: SessionState,
}

impl RelaySession {
    /// Open a session for a new connection.
    ///
    /// Registers the connection's outbound sender and returns the
    /// session together with the welcome envelope. The transport must
    /// deliver the welcome before any other message, then call
    /// [`activate`](Self::activate).
    pub fn open(
        registry: Arc<ConnectionRegistry>,
        sender: tokio::sync::mpsc::Sender<OutboundFrame>,
    ) -> (Self, Envelope) {
        let id = registry.register(sender);
        info!(id = %id, "Client connected");

        let welcome = Envelope::welcome(id.clone());
        let session = Self {
            id,
            registry,
            state: SessionState::Connected,
        };
        (session, welcome)
    }

    /// The identifier assigned to this connection.
    pub fn id(&self) -> &ConnectionId {
        &self.id
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Mark the welcome envelope as delivered and start routing.
    pub fn activate(&mut self) {
        if self.state == SessionState::Connected {
            self.state = SessionState::Active;
        }
    }

    /// Handle one raw inbound message.
    ///
    /// Returns an envelope the transport should write back to the
    /// sender (currently only the delivery-failure error), or `None`
    /// when there is nothing to respond with. Malformed input is
    /// logged and dropped without closing the connection; envelopes
    /// without a target are recorded and not forwarded.
    #[instrument(name = "relay.handle_message", skip(self, raw), fields(id = %self.id))]
    pub async fn handle_text(&self, raw: &str) -> Option<Envelope> {
        if self.state != SessionState::Active {
            warn!(state = ?self.state, "Message received outside active state, dropping");
            return None;
        }

        let mut envelope = match Envelope::parse(raw) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(error = %e, "Failed to parse inbound message, dropping");
                return None;
            }
        };

        let Some(target) = envelope.target.clone() else {
            debug!(kind = %envelope.kind, "Non-routable message received");
            return None;
        };

        // Stamp the true sender identity, overwriting any caller value.
        envelope.from = Some(self.id.clone());

        let text = match envelope.to_json() {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Failed to serialize envelope, dropping");
                return None;
            }
        };

        match self.registry.send_to(&target, OutboundFrame::new(text)).await {
            SendResult::Sent => {
                debug!(to = %target, kind = %envelope.kind, "Forwarded envelope");
                None
            }
            result => {
                warn!(to = %target, result = ?result, "Target not found or offline");
                Some(Envelope::not_found(&target))
            }
        }
    }

    /// Close the session, deregistering its identifier.
    ///
    /// Idempotent; called by the transport on disconnect or error and
    /// again from `Drop` as a backstop.
    pub fn close(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        self.registry.deregister(&self.id);
        self.state = SessionState::Closed;
        info!(id = %self.id, "Client disconnected");
    }
}

impl Drop for RelaySession {
    fn drop(&mut self) {
        self.close();
    }
}
