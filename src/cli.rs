//! Command-line surface.
//!
//! Flag validation happens entirely at parse time. `--passthrough` only
//! makes sense for sandboxed runs, so combining it with `--direct` is an
//! argument conflict: clap terminates with exit status 2 and an
//! explanatory message before any test resolves, runs, or creates a
//! scratch directory.

use std::path::PathBuf;

use clap::Parser;

use crate::exec::ExecutionMode;

#[derive(Parser, Debug)]
#[command(name = "volley")]
#[command(about = "Containerized system-test dispatcher for the gomment comment server")]
#[command(version)]
pub struct Cli {
    /// Comma-separated test specifiers (leaf tests or groups); omit to run
    /// every registered test
    #[arg(long, value_delimiter = ',', value_name = "SPEC,...")]
    pub tests: Vec<String>,

    /// Run tests sequentially in this process instead of one sandbox per
    /// test
    #[arg(long)]
    pub direct: bool,

    /// With --direct: emit the encoded result record instead of narration
    #[arg(long)]
    pub json: bool,

    /// Bind-mount a locally built service binary into each sandbox
    #[arg(long, conflicts_with = "direct")]
    pub passthrough: bool,

    /// Configuration file (built-in defaults apply when absent)
    #[arg(short, long, default_value = "volley.toml")]
    pub config: PathBuf,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// The execution mode this invocation selected.
    pub fn mode(&self) -> ExecutionMode {
        if self.direct {
            ExecutionMode::Direct
        } else {
            ExecutionMode::Indirect
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["volley"]).unwrap();
        assert!(cli.tests.is_empty());
        assert!(!cli.direct);
        assert!(!cli.json);
        assert!(!cli.passthrough);
        assert_eq!(cli.mode(), ExecutionMode::Indirect);
    }

    #[test]
    fn test_tests_flag_splits_on_commas() {
        let cli =
            Cli::try_parse_from(["volley", "--tests", "a.B.t1,a.B.t2", "--direct"]).unwrap();
        assert_eq!(cli.tests, vec!["a.B.t1", "a.B.t2"]);
        assert_eq!(cli.mode(), ExecutionMode::Direct);
    }

    #[test]
    fn test_passthrough_conflicts_with_direct() {
        let err = Cli::try_parse_from(["volley", "--passthrough", "--direct"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentConflict);
        // clap's conflict errors carry the documented exit status.
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_passthrough_alone_is_valid() {
        let cli = Cli::try_parse_from(["volley", "--passthrough"]).unwrap();
        assert!(cli.passthrough);
        assert_eq!(cli.mode(), ExecutionMode::Indirect);
    }
}
