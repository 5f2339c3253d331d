//! Execution contexts.
//!
//! Two interchangeable strategies run exactly one leaf test and produce a
//! structured result: [`direct::DirectRun`] executes it in the current
//! process, and [`sandbox::SandboxRun`] launches one disposable container
//! per test that internally invokes direct mode and streams the wire
//! payload back.

pub mod direct;
pub mod sandbox;

pub use direct::DirectRun;
pub use sandbox::{SandboxOutcome, SandboxRun};

/// Which execution strategy a run uses, fixed for the whole invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// In-process, strictly sequential.
    Direct,
    /// One sandbox per test, dispatched concurrently.
    Indirect,
}
