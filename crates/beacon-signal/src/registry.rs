//! Connection Registry implementation.
//!
//! Tracks live connections by their assigned identifier for envelope
//! routing. The registry owns the identifier lifecycle: allocation on
//! connect, removal on disconnect. It holds a non-owning handle (the
//! connection's outbound channel sender) and never closes connections
//! itself.

use std::fmt;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

use crate::ident::{IdGenerator, RandomIdGenerator};
use crate::types::ConnectionId;

/// A serialized envelope to be written to a connection.
///
/// This is the message type sent through the outbound channel to
/// deliver frames to connected peers.
#[derive(Debug, Clone)]
pub struct OutboundFrame {
    /// The serialized envelope text
    pub text: String,
}

impl OutboundFrame {
    /// Create a new outbound frame.
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Connection state stored in the registry.
#[derive(Debug)]
pub struct ConnectionEntry {
    /// Channel to send frames to this connection
    pub sender: mpsc::Sender<OutboundFrame>,
}

impl ConnectionEntry {
    /// Create a new connection entry.
    pub fn new(sender: mpsc::Sender<OutboundFrame>) -> Self {
        Self { sender }
    }
}

/// Result of attempting to send a frame to a connection.
#[derive(Debug)]
pub enum SendResult {
    /// Frame was successfully queued for delivery
    Sent,
    /// The target identifier is not currently registered
    NotConnected,
    /// The channel to the target is full (backpressure)
    ChannelFull,
    /// The channel to the target is closed
    ChannelClosed,
}

impl SendResult {
    /// Whether the frame was queued for delivery.
    pub fn is_sent(&self) -> bool {
        matches!(self, SendResult::Sent)
    }
}

/// Registry for tracking live connections.
///
/// Thread-safe map from identifier to connection entry. Uses DashMap
/// for concurrent access without explicit locking; identifier
/// generation and insertion are atomic with respect to concurrent
/// register/deregister calls through the map's entry API.
///
/// ## Usage
///
/// ```ignore
/// let registry = ConnectionRegistry::new();
///
/// // When a connection is established:
/// let (tx, rx) = mpsc::channel(256);
/// let id = registry.register(tx);
///
/// // When routing an envelope:
/// let result = registry.send_to(&target_id, frame).await;
///
/// // When a connection closes:
/// registry.deregister(&id);
/// ```
pub struct ConnectionRegistry {
    /// Map of identifier to connection entry
    connections: DashMap<ConnectionId, ConnectionEntry>,
    /// Identifier generation strategy
    ids: Arc<dyn IdGenerator>,
}

impl ConnectionRegistry {
    /// Create a new connection registry with the default identifier
    /// generator.
    pub fn new() -> Self {
        Self::with_generator(Arc::new(RandomIdGenerator::new()))
    }

    /// Create a registry with a custom identifier generator.
    pub fn with_generator(ids: Arc<dyn IdGenerator>) -> Self {
        info!("Creating connection registry");
        Self {
            connections: DashMap::new(),
            ids,
        }
    }

    /// Register a connection with its outbound channel.
    ///
    /// Generates a fresh identifier not currently present in the
    /// registry and associates it with the sender. On the rare
    /// generator collision the identifier is regenerated; an existing
    /// registration is never replaced.
    #[instrument(skip(self, sender))]
    pub fn register(&self, sender: mpsc::Sender<OutboundFrame>) -> ConnectionId {
        loop {
            let id = self.ids.generate();
            match self.connections.entry(id.clone()) {
                Entry::Vacant(slot) => {
                    slot.insert(ConnectionEntry::new(sender));
                    debug!(id = %id, "Registered new connection");
                    return id;
                }
                Entry::Occupied(_) => {
                    warn!(id = %id, "Identifier collision, regenerating");
                }
            }
        }
    }

    /// Deregister a connection.
    ///
    /// Idempotent: safe to call on an already-removed identifier.
    /// Returns the connection entry if it was registered.
    #[instrument(skip(self), fields(id = %id))]
    pub fn deregister(&self, id: &ConnectionId) -> Option<ConnectionEntry> {
        let removed = self.connections.remove(id);
        if removed.is_some() {
            debug!("Deregistered connection");
        } else {
            debug!("Connection was not registered");
        }
        removed.map(|(_, entry)| entry)
    }

    /// Get the outbound sender for an identifier.
    ///
    /// Returns `None` for unknown identifiers and for entries whose
    /// channel is already known to be closed; stale entries are
    /// removed on sight. A returned sender may still race a concurrent
    /// disconnect — delivery is best-effort.
    pub fn lookup(&self, id: &ConnectionId) -> Option<mpsc::Sender<OutboundFrame>> {
        let sender = self.connections.get(id)?.sender.clone();
        if sender.is_closed() {
            self.connections.remove(id);
            debug!(id = %id, "Removed stale connection on lookup");
            return None;
        }
        Some(sender)
    }

    /// Check if an identifier is currently registered.
    pub fn is_connected(&self, id: &ConnectionId) -> bool {
        self.connections.contains_key(id)
    }

    /// Get the number of live connections.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Send a frame to a registered connection.
    ///
    /// Uses `try_send` so forwarding never blocks the caller on the
    /// target's outbound queue.
    #[instrument(skip(self, frame), fields(to = %id))]
    pub async fn send_to(&self, id: &ConnectionId, frame: OutboundFrame) -> SendResult {
        let sender = match self.connections.get(id) {
            Some(entry) => entry.sender.clone(),
            None => {
                debug!("Target not connected");
                return SendResult::NotConnected;
            }
        };

        match sender.try_send(frame) {
            Ok(()) => {
                debug!("Frame queued for delivery");
                SendResult::Sent
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Outbound channel full, dropping frame");
                SendResult::ChannelFull
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!("Outbound channel closed, connection may have dropped");
                // Remove the stale entry
                self.connections.remove(id);
                SendResult::ChannelClosed
            }
        }
    }

    /// List all registered identifiers.
    ///
    /// Useful for debugging and monitoring.
    pub fn list_connections(&self) -> Vec<ConnectionId> {
        self.connections.iter().map(|r| r.key().clone()).collect()
    }

    /// Remove all stale connections (those with closed channels).
    ///
    /// This can be called periodically to clean up connections that
    /// were not properly deregistered.
    pub fn cleanup_stale(&self) -> usize {
        let stale: Vec<ConnectionId> = self
            .connections
            .iter()
            .filter(|entry| entry.value().sender.is_closed())
            .map(|entry| entry.key().clone())
            .collect();

        let mut removed = 0;
        for id in stale {
            if self.connections.remove(&id).is_some() {
                debug!(id = %id, "Removed stale connection");
                removed += 1;
            }
        }

        if removed > 0 {
            info!(count = removed, "Cleaned up stale connections");
        }

        removed
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ConnectionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionRegistry")
            .field("connection_count", &self.connections.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Mutex;

    use super::*;

    /// Generator replaying a fixed sequence of identifiers.
    struct ScriptedIds {
        queue: Mutex<Vec<ConnectionId>>,
    }

    impl ScriptedIds {
        fn new(ids: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                queue: Mutex::new(ids.iter().rev().map(|s| ConnectionId::from(*s)).collect()),
            })
        }
    }

    impl IdGenerator for ScriptedIds {
        fn generate(&self) -> ConnectionId {
            self.queue.lock().unwrap().pop().expect("script exhausted")
        }
    }

    #[test]
    fn test_registry_creation() {
        let registry = ConnectionRegistry::new();
        assert_eq!(registry.connection_count(), 0);
    }

    #[test]
    fn test_register_assigns_distinct_ids() {
        let registry = ConnectionRegistry::new();
        let mut ids = HashSet::new();

        for _ in 0..50 {
            let (tx, _rx) = mpsc::channel(16);
            let id = registry.register(tx);
            assert!(ids.insert(id), "registered identifiers must be distinct");
        }

        assert_eq!(registry.connection_count(), 50);
    }

    #[test]
    fn test_register_retries_on_collision() {
        let registry =
            ConnectionRegistry::with_generator(ScriptedIds::new(&["AAAAA", "AAAAA", "BBBBB"]));

        let (tx1, _rx1) = mpsc::channel(16);
        let (tx2, _rx2) = mpsc::channel(16);

        let first = registry.register(tx1);
        let second = registry.register(tx2);

        assert_eq!(first, ConnectionId::from("AAAAA"));
        assert_eq!(second, ConnectionId::from("BBBBB"));
        assert_eq!(registry.connection_count(), 2);
    }

    #[test]
    fn test_deregister_connection() {
        let registry = ConnectionRegistry::new();
        let (tx, _rx) = mpsc::channel(16);

        let id = registry.register(tx);
        assert!(registry.is_connected(&id));

        let removed = registry.deregister(&id);
        assert!(removed.is_some());
        assert!(!registry.is_connected(&id));
        assert!(registry.lookup(&id).is_none());
        assert_eq!(registry.connection_count(), 0);
    }

    #[test]
    fn test_deregister_is_idempotent() {
        let registry = ConnectionRegistry::new();
        let (tx, _rx) = mpsc::channel(16);

        let id = registry.register(tx);
        assert!(registry.deregister(&id).is_some());
        assert!(registry.deregister(&id).is_none());
        assert!(registry.deregister(&ConnectionId::from("ZZZZZZZ")).is_none());
    }

    #[test]
    fn test_lookup_skips_closed_channel() {
        let registry = ConnectionRegistry::new();
        let (tx, rx) = mpsc::channel(16);

        let id = registry.register(tx);
        drop(rx);

        assert!(registry.lookup(&id).is_none());
        // The stale entry is gone for good.
        assert!(!registry.is_connected(&id));
    }

    #[tokio::test]
    async fn test_send_to_connected_peer() {
        let registry = ConnectionRegistry::new();
        let (tx, mut rx) = mpsc::channel(16);

        let id = registry.register(tx);

        let result = registry.send_to(&id, OutboundFrame::new("{}")).await;
        assert!(matches!(result, SendResult::Sent));

        let received = rx.recv().await;
        assert_eq!(received.unwrap().text, "{}");
    }

    #[tokio::test]
    async fn test_send_to_unknown_target() {
        let registry = ConnectionRegistry::new();

        let result = registry
            .send_to(&ConnectionId::from("ZZZZZZZ"), OutboundFrame::new("{}"))
            .await;
        assert!(matches!(result, SendResult::NotConnected));
    }

    #[tokio::test]
    async fn test_send_to_closed_channel() {
        let registry = ConnectionRegistry::new();
        let (tx, rx) = mpsc::channel(16);

        let id = registry.register(tx);
        drop(rx);

        let result = registry.send_to(&id, OutboundFrame::new("{}")).await;
        assert!(matches!(result, SendResult::ChannelClosed));

        // Connection should have been removed
        assert!(!registry.is_connected(&id));
    }

    #[tokio::test]
    async fn test_send_to_full_channel() {
        let registry = ConnectionRegistry::new();
        let (tx, _rx) = mpsc::channel(1); // Very small buffer

        let id = registry.register(tx);

        let _ = registry.send_to(&id, OutboundFrame::new("first")).await;
        let result = registry.send_to(&id, OutboundFrame::new("second")).await;
        assert!(matches!(result, SendResult::ChannelFull));
    }

    #[test]
    fn test_list_connections() {
        let registry = ConnectionRegistry::new();

        let (tx1, _rx1) = mpsc::channel(16);
        let (tx2, _rx2) = mpsc::channel(16);

        let id1 = registry.register(tx1);
        let id2 = registry.register(tx2);

        let connections = registry.list_connections();
        assert_eq!(connections.len(), 2);
        assert!(connections.contains(&id1));
        assert!(connections.contains(&id2));
    }

    #[test]
    fn test_cleanup_stale() {
        let registry = ConnectionRegistry::new();

        let (tx1, rx1) = mpsc::channel(16);
        let (tx2, _rx2) = mpsc::channel(16);

        let stale_id = registry.register(tx1);
        let live_id = registry.register(tx2);

        drop(rx1);

        let removed = registry.cleanup_stale();
        assert_eq!(removed, 1);
        assert!(!registry.is_connected(&stale_id));
        assert!(registry.is_connected(&live_id));
    }
}
