//! # beacon-signal
//!
//! Rendezvous relay core for Beacon.
//!
//! Peers connect through an external transport (WebSocket in
//! `beacon-server`), receive a short identifier, and exchange opaque
//! JSON envelopes addressed by identifier. The relay never originates
//! data; it registers connections and forwards envelopes between them,
//! stamping the sender's identity on every forward.
//!
//! ## Architecture
//!
//! - **Registry**: concurrency-safe identifier → connection map,
//!   owning the identifier lifecycle (allocate on connect, remove on
//!   disconnect)
//! - **Session**: per-connection state machine that parses inbound
//!   envelopes and routes them through the registry
//! - **Envelope**: the wire unit; routing fields are interpreted,
//!   everything else passes through untouched
//!
//! The transport hands each connection an outbound
//! [`tokio::sync::mpsc`] channel; forwarding to a target only queues
//! on that channel and never blocks the target's own handler.

pub mod envelope;
pub mod ident;
pub mod registry;
pub mod session;

mod error;
mod types;

pub use envelope::Envelope;
pub use error::SignalError;
pub use ident::{IdGenerator, RandomIdGenerator};
pub use registry::{ConnectionEntry, ConnectionRegistry, OutboundFrame, SendResult};
pub use session::RelaySession;
pub use types::{ConnectionId, SessionState};
