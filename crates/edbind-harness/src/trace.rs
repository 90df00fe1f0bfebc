#![forbid(unsafe_code)]

//! Recorded binding traces.
//!
//! A [`BindingTrace`] is an ordered log of what a test did to a binding
//! (render, commit, emit, factory swap, unmount) together with the value the
//! component saw and the engine's registry bookkeeping at that point.
//!
//! Traces serialize as JSONL: one `binding_step` object per line, closed by a
//! `trace_end` line carrying a BLAKE3 checksum of the step lines. The
//! checksum lets a stored trace be compared against a fresh run byte for
//! byte without diffing every field.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use serde_json::Value;

use crate::engine::CellStats;

/// One recorded step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceStep {
    pub seq: u64,
    pub event: &'static str,
    /// Debug rendering of the component value, when the step produced one.
    pub value: Option<String>,
    pub stats: CellStats,
}

impl TraceStep {
    fn to_json(&self) -> Value {
        serde_json::json!({
            "event": "binding_step",
            "seq": self.seq,
            "step": self.event,
            "value": self.value,
            "attaches": self.stats.attaches,
            "detaches": self.stats.detaches,
            "active": self.stats.active,
            "reads": self.stats.reads,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct BindingTrace {
    run_id: String,
    steps: Vec<TraceStep>,
}

impl BindingTrace {
    #[must_use]
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            steps: Vec::new(),
        }
    }

    #[must_use]
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    #[must_use]
    pub fn steps(&self) -> &[TraceStep] {
        &self.steps
    }

    pub fn record(&mut self, event: &'static str, value: Option<String>, stats: CellStats) {
        let seq = self.steps.len() as u64;
        self.steps.push(TraceStep {
            seq,
            event,
            value,
            stats,
        });
    }

    /// Values of every `render` step, in order.
    #[must_use]
    pub fn rendered_values(&self) -> Vec<&str> {
        self.steps
            .iter()
            .filter(|s| s.event == "render")
            .filter_map(|s| s.value.as_deref())
            .collect()
    }

    /// Hex BLAKE3 digest of the step lines.
    #[must_use]
    pub fn checksum(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for step in &self.steps {
            hasher.update(step.to_json().to_string().as_bytes());
            hasher.update(b"\n");
        }
        hasher.finalize().to_hex().to_string()
    }

    #[must_use]
    pub fn to_jsonl(&self) -> String {
        let mut out = String::new();
        for step in &self.steps {
            out.push_str(&step.to_json().to_string());
            out.push('\n');
        }
        let end = serde_json::json!({
            "event": "trace_end",
            "run_id": self.run_id,
            "steps": self.steps.len(),
            "checksum": self.checksum(),
        });
        out.push_str(&end.to_string());
        out.push('\n');
        out
    }

    /// Write [`Self::to_jsonl`] to `path`.
    pub fn write_jsonl(&self, path: impl AsRef<Path>) -> io::Result<()> {
        let mut file = File::create(path.as_ref())?;
        file.write_all(self.to_jsonl().as_bytes())
    }
}

/// Summary of a verified JSONL trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedTrace {
    pub run_id: String,
    pub steps: usize,
    pub checksum: String,
}

fn invalid(line: usize, msg: impl std::fmt::Display) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidData,
        format!("invalid trace at line {line}: {msg}"),
    )
}

/// Parse a JSONL trace and check its step count and checksum.
///
/// # Errors
///
/// [`io::ErrorKind::InvalidData`] for malformed lines, a missing or
/// misplaced `trace_end`, or a count or checksum mismatch.
pub fn verify_jsonl(text: &str) -> io::Result<VerifiedTrace> {
    let mut hasher = blake3::Hasher::new();
    let mut steps = 0usize;
    let mut end: Option<(usize, Value)> = None;

    for (idx, line) in text.lines().enumerate() {
        let line_no = idx + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if end.is_some() {
            return Err(invalid(line_no, "content after trace_end"));
        }
        let value: Value = serde_json::from_str(trimmed).map_err(|err| invalid(line_no, err))?;
        match value.get("event").and_then(Value::as_str) {
            Some("binding_step") => {
                // Hash the canonical re-serialization, as the writer does.
                hasher.update(value.to_string().as_bytes());
                hasher.update(b"\n");
                steps += 1;
            }
            Some("trace_end") => end = Some((line_no, value)),
            Some(other) => return Err(invalid(line_no, format!("unknown event {other:?}"))),
            None => return Err(invalid(line_no, "missing event")),
        }
    }

    let Some((line_no, end)) = end else {
        return Err(invalid(text.lines().count(), "missing trace_end"));
    };
    let declared = end
        .get("steps")
        .and_then(Value::as_u64)
        .ok_or_else(|| invalid(line_no, "trace_end without steps"))?;
    if declared != steps as u64 {
        return Err(invalid(
            line_no,
            format!("declared {declared} steps, found {steps}"),
        ));
    }
    let checksum = hasher.finalize().to_hex().to_string();
    let declared = end
        .get("checksum")
        .and_then(Value::as_str)
        .ok_or_else(|| invalid(line_no, "trace_end without checksum"))?;
    if declared != checksum {
        return Err(invalid(line_no, "checksum mismatch"));
    }
    let run_id = end
        .get("run_id")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    Ok(VerifiedTrace {
        run_id,
        steps,
        checksum,
    })
}
