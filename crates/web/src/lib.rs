//! notesync web server library.
//!
//! Exposes the client's screens as JSON views and live WebSocket streams,
//! gated by the session, over whichever backend the configuration picks.
//! The binary and the integration tests share everything here.

pub mod backend;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;
