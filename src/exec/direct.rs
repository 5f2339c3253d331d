//! Direct (in-process) execution.
//!
//! Runs one registered test on the blocking thread pool. In protocol mode
//! the application and harness channels are captured into separate buffers
//! and the encoded [`CaseResult`] is the only thing written to stdout — the
//! designated machine sink. In human mode nothing is captured: harness
//! narration streams to stderr as it happens and application output goes
//! to stdout, exactly where an operator expects them.

use std::io::{self, Write};
use std::panic;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::config::Config;
use crate::discovery::RegisteredTest;
use crate::harness::{self, SharedBuffer, TestContext};
use crate::protocol::CaseResult;

/// The direct execution context.
pub struct DirectRun {
    config: Config,
    emit_protocol: bool,
}

impl DirectRun {
    pub fn new(config: Config, emit_protocol: bool) -> Self {
        Self {
            config,
            emit_protocol,
        }
    }

    /// Runs one test to completion.
    ///
    /// With `emit_protocol`, writes the encoded result line to stdout after
    /// the run; otherwise the narration already streamed and nothing more
    /// is produced.
    pub async fn run(&self, test: &RegisteredTest) -> Result<()> {
        let config = self.config.clone();
        let test = test.clone();
        let emit_protocol = self.emit_protocol;

        let result = tokio::task::spawn_blocking(move || run_blocking(&config, &test, emit_protocol))
            .await
            .context("direct test task did not complete")??;

        if let Some(case) = result {
            let payload = case.encode()?;
            let stdout = io::stdout();
            let mut sink = stdout.lock();
            writeln!(sink, "{payload}")?;
        }
        Ok(())
    }
}

fn run_blocking(
    config: &Config,
    test: &RegisteredTest,
    emit_protocol: bool,
) -> io::Result<Option<CaseResult>> {
    let db_path = scratch_db_path(config);

    if !emit_protocol {
        let mut ctx = TestContext::new(config.service.clone(), db_path, Box::new(io::stdout()));
        harness::run_case(test, &mut ctx, &mut io::stderr())?;
        return Ok(None);
    }

    let app = SharedBuffer::new();
    let mut harness_sink = SharedBuffer::new();
    let mut ctx = TestContext::new(config.service.clone(), db_path, Box::new(app.clone()));

    // The process's combined output is the wire payload, so the default
    // hook must not print panics; the harness records them as errors.
    let previous_hook = panic::take_hook();
    panic::set_hook(Box::new(|_| {}));
    let tally = harness::run_case(test, &mut ctx, &mut harness_sink);
    panic::set_hook(previous_hook);
    let tally = tally?;

    Ok(Some(CaseResult {
        test: test.id.clone(),
        app_output: app.contents(),
        harness_output: harness_sink.contents(),
        failures: tally.failures,
        errors: tally.errors,
        executed: tally.executed,
    }))
}

/// Resolves this run's private database location: the sandbox communicates
/// it through the environment; outside a sandbox the configured fallback
/// applies.
fn scratch_db_path(config: &Config) -> PathBuf {
    std::env::var_os(&config.sandbox.db_env)
        .map(PathBuf::from)
        .unwrap_or_else(|| config.service.db_fallback.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::Failed;
    use crate::protocol::Status;

    fn failing(_: &mut TestContext) -> Result<(), Failed> {
        Err(Failed::new("expected 1 got 2"))
    }

    fn logging(ctx: &mut TestContext) -> Result<(), Failed> {
        ctx.log("probing the service");
        Ok(())
    }

    #[test]
    fn test_protocol_mode_builds_result_from_both_channels() {
        let test = RegisteredTest {
            id: "a.B.logging".to_string(),
            run: logging,
        };
        let case = run_blocking(&Config::default(), &test, true)
            .unwrap()
            .unwrap();

        assert_eq!(case.test, "a.B.logging");
        assert_eq!(case.executed, 1);
        assert_eq!(case.status(), Status::Success);
        assert!(case.app_output.contains("probing the service"));
        assert!(case.harness_output.contains("test a.B.logging ... ok"));
        assert!(!case.harness_output.contains("probing the service"));
    }

    #[test]
    fn test_protocol_mode_records_failures() {
        let test = RegisteredTest {
            id: "a.B.failing".to_string(),
            run: failing,
        };
        let case = run_blocking(&Config::default(), &test, true)
            .unwrap()
            .unwrap();

        assert_eq!(case.status(), Status::Failure);
        assert_eq!(case.failures, vec!["expected 1 got 2".to_string()]);
    }

    #[test]
    fn test_human_mode_builds_no_result() {
        let test = RegisteredTest {
            id: "a.B.logging".to_string(),
            run: logging,
        };
        assert!(run_blocking(&Config::default(), &test, false)
            .unwrap()
            .is_none());
    }
}
