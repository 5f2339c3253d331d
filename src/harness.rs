//! The in-process test harness.
//!
//! This is the framework the direct execution context drives: it runs one
//! registered test body, tells assertion mismatches apart from uncaught
//! faults, and narrates the run onto a caller-supplied harness sink.
//!
//! Output routing is explicit. A test body never touches process-global
//! streams: it writes diagnostics through the sink carried by its
//! [`TestContext`], and the harness writes its narration to whatever sink
//! the caller passed in. The two channels stay separate end to end because
//! the result protocol stores them as distinct fields.

use std::any::Any;
use std::fmt;
use std::io::{self, Write};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::config::ServiceConfig;
use crate::discovery::RegisteredTest;

/// Signature of a registered test body.
///
/// An `Err` is a reported assertion mismatch (a failure); a panic is an
/// uncaught fault (an error). Both are caught by [`run_case`] and recorded
/// in the tally instead of propagating.
pub type TestFn = fn(&mut TestContext) -> Result<(), Failed>;

/// A reported assertion mismatch.
#[derive(Debug, Clone)]
pub struct Failed {
    message: String,
}

impl Failed {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for Failed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Fails the test unless the condition holds.
pub fn ensure(condition: bool, message: impl Into<String>) -> Result<(), Failed> {
    if condition {
        Ok(())
    } else {
        Err(Failed::new(message))
    }
}

/// Fails the test unless both values compare equal.
pub fn ensure_eq<L, R>(left: L, right: R) -> Result<(), Failed>
where
    L: fmt::Debug + PartialEq<R>,
    R: fmt::Debug,
{
    if left == right {
        Ok(())
    } else {
        Err(Failed::new(format!("{left:?} != {right:?}")))
    }
}

/// Per-invocation context handed to a test body.
///
/// Carries the application-output sink, the scratch database location the
/// sandbox (or a default) assigned to this run, and the settings needed to
/// launch the service under test.
pub struct TestContext {
    service: ServiceConfig,
    db_path: PathBuf,
    app: Box<dyn Write + Send>,
}

impl TestContext {
    pub fn new(service: ServiceConfig, db_path: PathBuf, app: Box<dyn Write + Send>) -> Self {
        Self {
            service,
            db_path,
            app,
        }
    }

    /// Writes one diagnostic line to the application-output channel.
    pub fn log(&mut self, line: impl AsRef<str>) {
        // Diagnostics are best-effort; a full sink must not fail the test.
        let _ = writeln!(self.app, "{}", line.as_ref());
    }

    /// Location of this run's private database file.
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Settings for launching the service under test.
    pub fn service(&self) -> &ServiceConfig {
        &self.service
    }
}

/// Tally of one harness invocation, mirroring the wire record's fields.
#[derive(Debug)]
pub struct Tally {
    pub failures: Vec<String>,
    pub errors: Vec<String>,
    pub executed: usize,
}

/// Runs exactly one test case, narrating onto `harness`.
///
/// Panics raised by the test body are caught and recorded as errors; the
/// caller is responsible for silencing the default panic hook when the
/// process output is a machine sink.
pub fn run_case(
    test: &RegisteredTest,
    ctx: &mut TestContext,
    harness: &mut dyn Write,
) -> io::Result<Tally> {
    let mut tally = Tally {
        failures: Vec::new(),
        errors: Vec::new(),
        executed: 0,
    };

    write!(harness, "test {} ... ", test.id)?;
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| (test.run)(ctx)));
    tally.executed += 1;

    match outcome {
        Ok(Ok(())) => writeln!(harness, "ok")?,
        Ok(Err(failed)) => {
            writeln!(harness, "FAILED")?;
            writeln!(harness, "{}", "=".repeat(70))?;
            writeln!(harness, "FAIL: {}", test.id)?;
            writeln!(harness, "{failed}")?;
            tally.failures.push(failed.to_string());
        }
        Err(payload) => {
            let message = panic_message(payload);
            writeln!(harness, "ERRORED")?;
            writeln!(harness, "{}", "=".repeat(70))?;
            writeln!(harness, "ERROR: {}", test.id)?;
            writeln!(harness, "{message}")?;
            tally.errors.push(message);
        }
    }

    writeln!(harness, "{}", "-".repeat(70))?;
    writeln!(harness, "ran 1 test")?;
    if tally.errors.is_empty() && tally.failures.is_empty() {
        writeln!(harness, "OK")?;
    } else {
        writeln!(
            harness,
            "FAILED (failures={}, errors={})",
            tally.failures.len(),
            tally.errors.len()
        )?;
    }

    Ok(tally)
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// An in-memory sink that can be handed out as a writer and read back after
/// the run, for protocol-mode channel capture.
#[derive(Clone, Default)]
pub struct SharedBuffer {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, lossily decoded.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.inner.lock().unwrap()).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
