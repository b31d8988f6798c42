//! Shared Application State
//!
//! This module defines the `AppState` struct holding the shared, clonable
//! resources every handler needs.

use crate::config::Config;
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all
/// handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
}
