//! Structured logging re-exports.
//!
//! With the `tracing` feature enabled these are the real `tracing` macros;
//! otherwise the crate-root no-op macros of the same names are used.

pub use tracing::{debug, trace};
