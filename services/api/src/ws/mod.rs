//! WebSocket Bridge
//!
//! This module connects JobGenie app clients to the realtime interview
//! session manager. It is structured into submodules for clarity:
//!
//! - `protocol`: Defines the JSON-based message format between the app
//!   client and this service.
//! - `session`: Manages the per-connection lifecycle, from the `start`
//!   handshake to media forwarding and event relay.

pub mod protocol;
pub mod session;

pub use session::ws_handler;
