//! Municipal basic-food-basket distribution service.
//!
//! The library exposes the domain model, storage traits, workflow services,
//! CSV reporting, and the axum router; the binary in `main.rs` wires them to
//! configuration, telemetry, and metrics.

pub mod config;
pub mod error;
pub mod export;
pub mod telemetry;
pub mod workflows;
