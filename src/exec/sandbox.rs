//! Indirect (sandboxed) execution.
//!
//! One disposable Docker container per test case. The container binds the
//! test tree read-only, a per-test scratch directory read-write, and —
//! with passthrough — a locally built service binary over the one baked
//! into the image. Inside, the runner invokes itself in direct protocol
//! mode, so the container's combined output stream is the encoded result
//! and nothing else.
//!
//! The launch specification is fully structured (argument vector, bind
//! list, environment list); no identifier or path is ever interpolated
//! into a shell command line.

use std::path::{Path, PathBuf};

use bollard::container::{
    Config as ContainerConfig, CreateContainerOptions, LogOutput, LogsOptions,
    RemoveContainerOptions, StartContainerOptions, WaitContainerOptions,
};
use bollard::models::HostConfig;
use bollard::Docker;
use futures::StreamExt;
use tracing::debug;

use crate::config::Config;
use crate::protocol::CaseResult;

/// Result type for sandbox operations.
pub type SandboxResult<T> = Result<T, SandboxError>;

/// Errors that prevent a sandbox from producing a captured output stream.
///
/// A container that runs but emits garbage is *not* an error — its output
/// is surfaced as an undecodable anomaly. These variants cover the cases
/// where there is no output stream to capture at all.
#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    /// Could not reach the container runtime.
    #[error("failed to connect to the container runtime: {0}")]
    Connection(String),

    /// Could not create or start the container.
    #[error("failed to create sandbox: {0}")]
    CreateFailed(String),

    /// Could not read the container's output stream.
    #[error("failed to capture sandbox output: {0}")]
    CaptureFailed(String),

    /// Host-side filesystem error (scratch directory, bind sources).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// What one sandbox dispatch produced.
#[derive(Debug)]
pub enum SandboxOutcome {
    /// The captured stream decoded into a structured result.
    Result(CaseResult),
    /// The captured stream was not a valid wire payload; the raw text is
    /// surfaced verbatim in the report.
    Undecodable(String),
}

/// The per-test scratch location for an identifier.
///
/// Purely a function of the state root and the identifier: distinct
/// identifiers never share a directory, and re-dispatching an identifier
/// always lands in the same place.
pub fn scratch_dir(state_root: &Path, test_id: &str) -> PathBuf {
    state_root.join(test_id)
}

/// Lazily creates the scratch directory for a test.
///
/// Check-then-create, deliberately not atomic: the same identifier
/// dispatched twice concurrently may race on creation, which is accepted.
pub fn ensure_scratch_dir(state_root: &Path, test_id: &str) -> std::io::Result<PathBuf> {
    let dir = scratch_dir(state_root, test_id);
    if !dir.exists() {
        std::fs::create_dir_all(&dir)?;
    }
    Ok(dir)
}

/// The indirect execution context, shared by all dispatch tasks.
pub struct SandboxRun {
    docker: Docker,
    config: Config,
}

impl SandboxRun {
    /// Connects to the local container runtime.
    pub fn connect(config: Config) -> SandboxResult<Self> {
        let docker = Docker::connect_with_local_defaults()
            .map_err(|e| SandboxError::Connection(e.to_string()))?;
        Ok(Self { docker, config })
    }

    /// Runs one test in its own disposable sandbox and captures the
    /// combined output stream as the wire payload.
    ///
    /// Blocks until the container exits; there is no timeout. The container
    /// is removed before this returns, whatever the outcome.
    pub async fn run(&self, test_id: &str, passthrough: bool) -> SandboxResult<SandboxOutcome> {
        let scratch = ensure_scratch_dir(&self.config.runner.state_dir, test_id)?;

        let sandbox = &self.config.sandbox;
        let mut binds = vec![
            format!(
                "{}:{}:ro",
                host_path(&self.config.runner.test_root)?,
                sandbox.test_mount
            ),
            format!("{}:{}", host_path(&scratch)?, sandbox.state_mount),
        ];
        if passthrough {
            binds.push(format!(
                "{}:{}:ro",
                host_path(&self.config.service.binary)?,
                sandbox.service_mount
            ));
        }

        let env = vec![format!(
            "{}={}/{}",
            sandbox.db_env, sandbox.state_mount, sandbox.db_file
        )];

        let command = vec![
            sandbox.program.clone(),
            "--direct".to_string(),
            "--json".to_string(),
            "--tests".to_string(),
            test_id.to_string(),
        ];

        // Container names must be unique even when one identifier is
        // dispatched twice in a run.
        let name = format!("volley-{}-{}", test_id, uuid::Uuid::new_v4());

        let container_config = ContainerConfig {
            image: Some(sandbox.image.clone()),
            cmd: Some(command),
            env: Some(env),
            working_dir: Some(sandbox.working_dir.clone()),
            host_config: Some(HostConfig {
                binds: Some(binds),
                ..Default::default()
            }),
            ..Default::default()
        };

        let options = CreateContainerOptions {
            name: name.as_str(),
            platform: None,
        };

        let created = self
            .docker
            .create_container(Some(options), container_config)
            .await
            .map_err(|e| SandboxError::CreateFailed(e.to_string()))?;

        self.docker
            .start_container(&created.id, None::<StartContainerOptions<String>>)
            .await
            .map_err(|e| SandboxError::CreateFailed(e.to_string()))?;

        debug!("sandbox {} started for {}", created.id, test_id);

        let captured = self.capture(&created.id).await;

        // Teardown is unconditional; a failed capture must not leak the
        // container.
        let _ = self
            .docker
            .remove_container(
                &created.id,
                Some(RemoveContainerOptions {
                    force: true,
                    ..Default::default()
                }),
            )
            .await;

        let combined = captured?;
        match CaseResult::decode(combined.trim()) {
            Ok(result) => Ok(SandboxOutcome::Result(result)),
            Err(_) => Ok(SandboxOutcome::Undecodable(combined)),
        }
    }

    /// Waits for the container to exit, then collects its combined
    /// stdout/stderr stream in arrival order.
    async fn capture(&self, container_id: &str) -> SandboxResult<String> {
        let mut wait = self
            .docker
            .wait_container(container_id, None::<WaitContainerOptions<String>>);
        while let Some(status) = wait.next().await {
            // A non-zero exit status surfaces here as an error item; the
            // logs are still the payload, so keep going either way.
            if status.is_err() {
                break;
            }
        }

        let mut combined = String::new();
        let mut logs = self.docker.logs(
            container_id,
            Some(LogsOptions::<String> {
                stdout: true,
                stderr: true,
                ..Default::default()
            }),
        );
        while let Some(chunk) = logs.next().await {
            match chunk {
                Ok(LogOutput::StdOut { message })
                | Ok(LogOutput::StdErr { message })
                | Ok(LogOutput::Console { message }) => {
                    combined.push_str(&String::from_utf8_lossy(&message));
                }
                Ok(_) => {}
                Err(e) => return Err(SandboxError::CaptureFailed(e.to_string())),
            }
        }
        Ok(combined)
    }
}

fn host_path(path: &Path) -> SandboxResult<String> {
    let absolute = std::fs::canonicalize(path)?;
    Ok(absolute.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distinct_identifiers_never_share_a_scratch_dir() {
        let root = Path::new("state");
        assert_ne!(
            scratch_dir(root, "a.A.t1"),
            scratch_dir(root, "a.A.t2"),
        );
    }

    #[test]
    fn test_same_identifier_maps_to_same_scratch_dir() {
        let root = Path::new("state");
        assert_eq!(
            scratch_dir(root, "a.A.t1"),
            scratch_dir(root, "a.A.t1"),
        );
    }

    #[test]
    fn test_scratch_dir_created_lazily_and_idempotently() {
        let root = tempfile::tempdir().unwrap();
        let id = "api_basic.ApiBasicTest.status_ok";

        assert!(!scratch_dir(root.path(), id).exists());
        let first = ensure_scratch_dir(root.path(), id).unwrap();
        assert!(first.is_dir());

        // A second dispatch of the same identifier reuses the directory.
        let second = ensure_scratch_dir(root.path(), id).unwrap();
        assert_eq!(first, second);
    }
}
