//! The machine-readable result protocol.
//!
//! A sandboxed test run communicates with its parent through exactly one
//! payload: a [`CaseResult`] encoded as a single JSON document on the
//! sandbox's combined output stream. This module owns that wire format, the
//! status classification derived from it, and the decorated one-line
//! rendering used by the report.
//!
//! # Wire format
//!
//! The JSON keys are the harness's historical wire names, which differ from
//! the Rust field names in two places:
//!
//! | field            | wire key      |
//! |------------------|---------------|
//! | `harness_output` | `test_output` |
//! | `executed`       | `tests_run`   |
//!
//! [`CaseResult::decode`] is the exact inverse of [`CaseResult::encode`] for
//! arbitrary output text, including embedded newlines and control
//! characters (JSON string escaping carries them).

use serde::{Deserialize, Serialize};

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors produced while encoding or decoding the wire payload.
///
/// A decode failure is not fatal to a run: the aggregator demotes it to a
/// raw-text anomaly and keeps collecting sibling results.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The payload is not a valid encoded [`CaseResult`].
    #[error("malformed result payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Structured outcome of running exactly one test case.
///
/// Produced by the direct execution context, optionally shipped over the
/// wire by a sandbox, and owned read-only by the aggregator after
/// collection. The status is always derived from the fields via
/// [`status`](Self::status), never stored.
///
/// Every instance carries freshly constructed collections; there is no
/// shared empty default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseResult {
    /// Qualified identifier of the executed test (`namespace.suite.method`).
    pub test: String,

    /// Everything the test body wrote to its application-output sink.
    pub app_output: String,

    /// The harness's own pass/fail narration, kept separate from
    /// application output at all times.
    #[serde(rename = "test_output")]
    pub harness_output: String,

    /// Assertion mismatches reported by the test body, in order.
    pub failures: Vec<String>,

    /// Uncaught faults (panics) raised inside the test body, in order.
    pub errors: Vec<String>,

    /// Number of test cases the harness actually ran.
    ///
    /// Anything other than 1 for a single dispatched leaf is an
    /// orchestration anomaly, classified [`Status::Unknown`].
    #[serde(rename = "tests_run")]
    pub executed: usize,
}

/// Classified status of a [`CaseResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// No failures, no errors, exactly one test executed.
    Success,
    /// At least one reported assertion mismatch (and no errors).
    Failure,
    /// At least one uncaught fault.
    Error,
    /// No failures or errors, but an executed count other than one.
    Unknown,
}

impl Status {
    /// The fixed-width literal tag for this status, colorized when the
    /// output stream supports it.
    ///
    /// Tags are padded to a common width before styling so decorated lines
    /// align in the summary.
    pub fn tag(self) -> String {
        let padded = format!("{:<7}", self.text());
        match self {
            Status::Success => console::style(padded).green(),
            Status::Failure => console::style(padded).red(),
            Status::Error => console::style(padded).red().bold(),
            Status::Unknown => console::style(padded).yellow(),
        }
        .to_string()
    }

    /// The bare tag text.
    pub fn text(self) -> &'static str {
        match self {
            Status::Success => "SUCCESS",
            Status::Failure => "FAILURE",
            Status::Error => "ERROR",
            Status::Unknown => "UNKNOWN",
        }
    }
}

impl CaseResult {
    /// Classifies this result.
    ///
    /// The table, in precedence order: any error wins, then any failure,
    /// then an executed count of exactly one means success, and every other
    /// count is an anomaly. Total over all inputs; never panics.
    pub fn status(&self) -> Status {
        if !self.errors.is_empty() {
            Status::Error
        } else if !self.failures.is_empty() {
            Status::Failure
        } else if self.executed == 1 {
            Status::Success
        } else {
            Status::Unknown
        }
    }

    /// Encodes this result as its single-line wire payload.
    pub fn encode(&self) -> ProtocolResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decodes a wire payload.
    ///
    /// Fails with [`ProtocolError::Malformed`] on anything that is not an
    /// encoded [`CaseResult`]; callers at the aggregator boundary surface
    /// the raw text instead of propagating.
    pub fn decode(payload: &str) -> ProtocolResult<CaseResult> {
        Ok(serde_json::from_str(payload)?)
    }

    /// Renders the status tag followed by the identifier.
    ///
    /// This rendered string is also the canonical sort key for both report
    /// phases.
    pub fn decorated_line(&self) -> String {
        format!("{} {}", self.status().tag(), self.test)
    }
}
