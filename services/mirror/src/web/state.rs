//! services/mirror/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::web::transport::Transport;
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Connections)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// The outermost transport; normally an interceptor wrapping the upstream.
    pub transport: Arc<dyn Transport>,
}
