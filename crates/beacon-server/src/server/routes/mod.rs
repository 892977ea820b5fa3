// Route modules for the Beacon relay
pub mod websocket; // Signaling WebSocket endpoint
