//! Async HTTP client for gantry motion-stage control servers.
//!
//! A gantry is a networked two-axis stage running a small HTTP server.
//! This crate is the wire layer only: one [`GantryClient`] per device,
//! carrying the session token and normalizing responses. Connection
//! lifecycle, liveness monitoring, and fleet orchestration live in
//! `gantry-core`.

pub mod client;
pub mod error;
pub mod transport;

// ── Primary re-exports ──────────────────────────────────────────────
pub use client::{
    Axis, GantryClient, Mode, Payload, PidChannel, PidLoop, PidTerm, SESSION_HEADER, device_url,
};
pub use error::ApiError;
pub use transport::TransportConfig;
