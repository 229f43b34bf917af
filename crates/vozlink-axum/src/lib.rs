//! Axum web adapter for vozlink.
//!
//! This crate is the composition root: it answers the telephony provider's
//! call webhook with a `<Connect><Stream>` document, upgrades the media
//! WebSocket, wires a [`vozlink_session::SessionCoordinator`] per call with
//! real engine adapters, and carries the provider's JSON wire protocol
//! (`start`/`media`/`mark`/`stop` inbound, `media`/`mark`/`clear` outbound).
#![deny(unused_crate_dependencies)]

// Dependencies used by the vozlink-server binary
use dotenvy as _;
use tracing_subscriber as _;

// Silence unused dev-dependency warnings: these are exercised by tests/
#[cfg(test)]
use http_body_util as _;
#[cfg(test)]
use tower as _;

pub mod bootstrap;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;
pub mod transport;

// Re-export primary types
pub use bootstrap::{AxumContext, serve};
pub use error::HttpError;
pub use routes::build_router;
pub use state::AppState;
pub use transport::WsMediaTransport;
