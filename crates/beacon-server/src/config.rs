//! Server configuration.

use std::net::SocketAddr;

use clap::Parser;

/// Beacon rendezvous relay server.
#[derive(Debug, Clone, Parser)]
#[command(name = "beacon-server", version, about)]
pub struct ServerConfig {
    /// Address to listen on for WebSocket connections
    #[arg(long, default_value = "0.0.0.0:9001")]
    pub bind: SocketAddr,

    /// Per-connection outbound queue capacity. Envelopes forwarded to
    /// a peer whose queue is full are dropped (the sender is told the
    /// target is unreachable).
    #[arg(long, default_value_t = 256)]
    pub channel_capacity: usize,
}
