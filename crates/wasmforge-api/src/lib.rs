//! Ingress API (C9) and Socket Hub (C3) for wasmforge.
//!
//! Provides the HTTP REST surface for submitting compile/deploy jobs and
//! reading their state, plus a WebSocket endpoint for live log/status
//! fan-out.

pub mod auth;
pub mod error;
pub mod routes;
pub mod state;
pub mod ws;

pub use state::AppState;
