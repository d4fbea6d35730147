//! Matchboard: match ranking, session state and candidate funnel engine.
//!
//! The library is UI-agnostic: ranking and statistics are pure functions over
//! upstream match payloads, while the session cache and the stage store own the
//! only mutable state. `main.rs` hosts the engine behind a small HTTP surface.

pub mod config;
pub mod errors;
pub mod funnel;
pub mod models;
pub mod ranking;
pub mod routes;
pub mod session;
pub mod state;

pub use errors::{AppError, EngineError};
