#![forbid(unsafe_code)]

//! Test harness for edbind bindings.
//!
//! - [`engine`]: a scripted [`MockEditor`](engine::MockEditor) with
//!   observable cells and listener bookkeeping.
//! - [`probe`]: a mounted component binding one swappable factory.
//! - [`trace`]: JSONL step logs with a BLAKE3 checksum.

pub mod engine;
pub mod probe;
pub mod trace;

pub use engine::{CellStats, EngineCell, MockEditor};
pub use probe::BindingProbe;
pub use trace::{BindingTrace, TraceStep, VerifiedTrace, verify_jsonl};
