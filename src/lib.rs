//! volley: a containerized system-test dispatcher.
//!
//! This crate runs system tests against the gomment comment server, one
//! disposable Docker sandbox per test, and aggregates the structured
//! results into a deterministic report.
//!
//! # Architecture
//!
//! The main components are:
//!
//! - **Protocol**: the machine-readable result record a sandbox streams
//!   back to its parent, plus the status classifier and decorated rendering
//! - **Discovery**: a static registry of suites, flattened and filtered by
//!   test specifiers
//! - **Execution**: direct (in-process) and indirect (one sandbox per test)
//!   contexts
//! - **Orchestrator**: sequential or concurrent dispatch, completion-order
//!   collection, and the two-phase report

pub mod cli;
pub mod config;
pub mod discovery;
pub mod exec;
pub mod harness;
pub mod orchestrator;
pub mod protocol;
pub mod report;
pub mod suites;

// Re-export commonly used types
pub use config::{load_config, Config};
pub use discovery::{DiscoveryError, RegisteredTest, Registry};
pub use exec::{ExecutionMode, SandboxOutcome};
pub use orchestrator::Orchestrator;
pub use protocol::{CaseResult, ProtocolError, Status};
