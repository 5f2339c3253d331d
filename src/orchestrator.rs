//! Dispatch and aggregation.
//!
//! The orchestrator resolves specifiers once, then runs every resolved
//! test in the configured execution mode:
//!
//! - **direct**: a strictly sequential in-process loop, no aggregation —
//!   each test's narration is independently readable as it happens;
//! - **indirect**: one sandbox task per test on the async runtime, bounded
//!   by a semaphore, collected in completion order, then rendered as the
//!   deterministic two-phase report.
//!
//! A single test's failure or error never touches its siblings: each one
//! owns its sandbox, its output, and its result until the aggregator takes
//! over. An undecodable payload is demoted to a raw-text anomaly at the
//! collection boundary rather than propagated. There is deliberately no
//! timeout and no cancellation: a sandbox that never exits holds its
//! semaphore permit forever.

use std::io;
use std::sync::Arc;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::config::Config;
use crate::discovery::{Registry, RegisteredTest};
use crate::exec::{DirectRun, ExecutionMode, SandboxOutcome, SandboxRun};
use crate::protocol::CaseResult;
use crate::report;

/// The top-level dispatcher.
pub struct Orchestrator {
    config: Config,
    mode: ExecutionMode,
    emit_protocol: bool,
    passthrough: bool,
}

impl Orchestrator {
    pub fn new(
        config: Config,
        mode: ExecutionMode,
        emit_protocol: bool,
        passthrough: bool,
    ) -> Self {
        Self {
            config,
            mode,
            emit_protocol,
            passthrough,
        }
    }

    /// Resolves the specifiers and runs the whole dispatch.
    ///
    /// A discovery failure aborts here, before any test or scratch
    /// directory exists.
    pub async fn run(&self, registry: &Registry, specifiers: &[String]) -> Result<()> {
        let tests = registry.resolve(specifiers)?;
        info!("resolved {} test case(s)", tests.len());

        match self.mode {
            ExecutionMode::Direct => self.run_direct(&tests).await,
            ExecutionMode::Indirect => self.run_indirect(&tests).await,
        }
    }

    async fn run_direct(&self, tests: &[RegisteredTest]) -> Result<()> {
        let runner = DirectRun::new(self.config.clone(), self.emit_protocol);
        for test in tests {
            debug!("running {} directly", test.id);
            runner.run(test).await?;
        }
        Ok(())
    }

    async fn run_indirect(&self, tests: &[RegisteredTest]) -> Result<()> {
        let runner = Arc::new(SandboxRun::connect(self.config.clone())?);
        let limit = Arc::new(Semaphore::new(self.config.runner.max_parallel));

        let progress = ProgressBar::new(tests.len() as u64);
        progress.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len}")
                .unwrap()
                .progress_chars("#>-"),
        );

        let mut pending = JoinSet::new();
        for test in tests {
            let runner = Arc::clone(&runner);
            let limit = Arc::clone(&limit);
            let test_id = test.id.clone();
            let passthrough = self.passthrough;

            pending.spawn(async move {
                // The semaphore is never closed while tasks are pending.
                let _permit = limit
                    .acquire_owned()
                    .await
                    .expect("dispatch semaphore closed");
                match runner.run(&test_id, passthrough).await {
                    Ok(outcome) => outcome,
                    // A sandbox that never produced a stream degrades to a
                    // raw-text anomaly, keeping the rest of the run alive.
                    Err(e) => SandboxOutcome::Undecodable(format!("{test_id}: {e}")),
                }
            });
        }

        // Completion order; no ordering is assumed between tasks.
        let mut results: Vec<CaseResult> = Vec::new();
        let mut anomalies: Vec<String> = Vec::new();
        while let Some(joined) = pending.join_next().await {
            match joined {
                Ok(SandboxOutcome::Result(result)) => results.push(result),
                Ok(SandboxOutcome::Undecodable(raw)) => anomalies.push(raw),
                Err(e) => anomalies.push(format!("dispatch task failed: {e}")),
            }
            progress.inc(1);
        }
        progress.finish_and_clear();

        let stdout = io::stdout();
        report::render(&results, &anomalies, &mut stdout.lock())?;
        Ok(())
    }
}
