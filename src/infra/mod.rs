//! Infrastructure adapters: HTTP boundary, in-memory store, telemetry.

pub mod http;
pub mod memory;
pub mod telemetry;
