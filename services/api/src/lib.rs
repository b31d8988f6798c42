//! JobGenie Interview API Library Crate
//!
//! This library contains the web-facing half of the realtime interview
//! feature: configuration, routing, and the WebSocket bridge that connects a
//! JobGenie app client to an `interview-live` session. The rest of the
//! product surface (profiles, saved jobs, documents) lives in the managed
//! backend and never passes through this service.

pub mod config;
pub mod router;
pub mod state;
pub mod ws;
