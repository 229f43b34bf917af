//! Shared application state type.

use std::sync::Arc;

use crate::bootstrap::AxumContext;

/// Application state shared across all handlers.
///
/// An Arc-wrapped [`AxumContext`] holding the session settings, engine
/// configuration, and the shared model/synthesizer clients.
pub type AppState = Arc<AxumContext>;
