//! Configuration loading and schema definitions for volley.
//!
//! Configuration is optional: every field has a default equal to the
//! constant the test harness has historically used, so a bare `volley` run
//! with no `volley.toml` behaves identically to one. A TOML file can
//! override any subset.
//!
//! ```toml
//! [runner]
//! max_parallel = 4
//! state_dir = "test-state"
//!
//! [sandbox]
//! image = "gomment-test"
//!
//! [service]
//! binary = "./gomment"
//! warmup_secs = 2
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// Dispatch settings (parallelism, host-side locations).
    #[serde(default)]
    pub runner: RunnerConfig,

    /// Sandbox contract: image, mounts, and the scratch-database
    /// environment variable.
    #[serde(default)]
    pub sandbox: SandboxConfig,

    /// Settings for the service under test, used by suite fixtures.
    #[serde(default)]
    pub service: ServiceConfig,
}

/// Host-side dispatch settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RunnerConfig {
    /// Directory tree mounted read-only into every sandbox.
    #[serde(default = "default_test_root")]
    pub test_root: PathBuf,

    /// Parent directory for per-test scratch directories.
    ///
    /// One subdirectory per test identifier, created lazily, never deleted
    /// by the dispatcher.
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,

    /// Maximum number of sandboxes dispatched concurrently.
    ///
    /// Sandbox tasks are wait-bound, not CPU-bound, so this can comfortably
    /// exceed the core count.
    ///
    /// Default: 10
    #[serde(default = "default_max_parallel")]
    pub max_parallel: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            test_root: default_test_root(),
            state_dir: default_state_dir(),
            max_parallel: default_max_parallel(),
        }
    }
}

/// The fixed sandbox contract.
///
/// Mount points, image name and working directory are conventions shared
/// with the sandbox image; changing one side without the other breaks the
/// inner invocation.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SandboxConfig {
    /// Container image every sandbox is created from.
    #[serde(default = "default_image")]
    pub image: String,

    /// The runner executable invoked inside the sandbox.
    #[serde(default = "default_program")]
    pub program: String,

    /// Working directory inside the sandbox.
    #[serde(default = "default_working_dir")]
    pub working_dir: String,

    /// Mount point of the read-only test tree.
    #[serde(default = "default_test_mount")]
    pub test_mount: String,

    /// Mount point of the per-test scratch directory (read-write).
    #[serde(default = "default_state_mount")]
    pub state_mount: String,

    /// Mount point for a locally supplied service binary (`--passthrough`).
    #[serde(default = "default_service_mount")]
    pub service_mount: String,

    /// Environment variable naming the sandbox-local scratch database.
    #[serde(default = "default_db_env")]
    pub db_env: String,

    /// Database filename inside the scratch mount.
    #[serde(default = "default_db_file")]
    pub db_file: String,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            image: default_image(),
            program: default_program(),
            working_dir: default_working_dir(),
            test_mount: default_test_mount(),
            state_mount: default_state_mount(),
            service_mount: default_service_mount(),
            db_env: default_db_env(),
            db_file: default_db_file(),
        }
    }
}

/// Settings for launching and addressing the service under test.
///
/// The service is started with its storage path and credential material in
/// the environment and given a fixed warm-up delay before the first
/// request; there is no readiness probe.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
    /// Path to the service executable.
    #[serde(default = "default_binary")]
    pub binary: PathBuf,

    /// Base URL of the service's HTTP API.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Environment variable naming the service's storage path.
    #[serde(default = "default_service_db_env")]
    pub db_env: String,

    /// Environment variable carrying the admin password hash.
    #[serde(default = "default_pw_hash_env")]
    pub pw_hash_env: String,

    /// Argon2 hash of the test admin password ("test").
    #[serde(default = "default_pw_hash")]
    pub pw_hash: String,

    /// Fixed warm-up delay, in seconds, between spawning the service and
    /// the first request.
    #[serde(default = "default_warmup_secs")]
    pub warmup_secs: u64,

    /// Database location used when no scratch path is assigned through the
    /// environment (direct runs outside a sandbox).
    #[serde(default = "default_db_fallback")]
    pub db_fallback: PathBuf,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            binary: default_binary(),
            endpoint: default_endpoint(),
            db_env: default_service_db_env(),
            pw_hash_env: default_pw_hash_env(),
            pw_hash: default_pw_hash(),
            warmup_secs: default_warmup_secs(),
            db_fallback: default_db_fallback(),
        }
    }
}

fn default_test_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_state_dir() -> PathBuf {
    PathBuf::from("state")
}

fn default_max_parallel() -> usize {
    10
}

fn default_image() -> String {
    "gomment-test".to_string()
}

fn default_program() -> String {
    "volley".to_string()
}

fn default_working_dir() -> String {
    "/app".to_string()
}

fn default_test_mount() -> String {
    "/app/test".to_string()
}

fn default_state_mount() -> String {
    "/app/test-state".to_string()
}

fn default_service_mount() -> String {
    "/app/gomment".to_string()
}

fn default_db_env() -> String {
    "DB_PATH".to_string()
}

fn default_db_file() -> String {
    "test.db".to_string()
}

fn default_binary() -> PathBuf {
    PathBuf::from("./gomment")
}

fn default_endpoint() -> String {
    "http://localhost:8000/api/v1".to_string()
}

fn default_service_db_env() -> String {
    "GOMMENT_DB_PATH".to_string()
}

fn default_pw_hash_env() -> String {
    "GOMMENT_PW_HASH".to_string()
}

fn default_pw_hash() -> String {
    "$argon2id$v=19$m=65536,t=1,p=4$g3QbUxJU0fxr3M0BLywjjA$IWXFuQOX8jZxtcFhN8VuaCAIAQPRbXtxkSRn1wVgkXw"
        .to_string()
}

fn default_warmup_secs() -> u64 {
    2
}

fn default_db_fallback() -> PathBuf {
    PathBuf::from("./test.db")
}

/// Loads configuration from a TOML file.
///
/// A missing file is not an error: the built-in defaults apply. A present
/// but unreadable or invalid file is.
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;
    load_config_str(&content)
        .with_context(|| format!("failed to parse config file: {}", path.display()))
}

/// Loads configuration from a TOML string.
pub fn load_config_str(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).context("failed to parse config")?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_harness_constants() {
        let config = Config::default();
        assert_eq!(config.sandbox.image, "gomment-test");
        assert_eq!(config.sandbox.test_mount, "/app/test");
        assert_eq!(config.sandbox.state_mount, "/app/test-state");
        assert_eq!(config.sandbox.db_env, "DB_PATH");
        assert_eq!(config.sandbox.working_dir, "/app");
        assert_eq!(config.service.db_env, "GOMMENT_DB_PATH");
        assert_eq!(config.service.warmup_secs, 2);
        assert_eq!(config.runner.max_parallel, 10);
    }

    #[test]
    fn test_empty_document_is_all_defaults() {
        let config = load_config_str("").unwrap();
        assert_eq!(config.sandbox.image, Config::default().sandbox.image);
    }

    #[test]
    fn test_partial_override() {
        let config = load_config_str(
            r#"
            [runner]
            max_parallel = 4

            [sandbox]
            image = "gomment-test:local"
            "#,
        )
        .unwrap();
        assert_eq!(config.runner.max_parallel, 4);
        assert_eq!(config.sandbox.image, "gomment-test:local");
        // Untouched sections keep their defaults.
        assert_eq!(config.sandbox.db_env, "DB_PATH");
        assert_eq!(config.service.endpoint, "http://localhost:8000/api/v1");
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let config = load_config(Path::new("/nonexistent/volley.toml")).unwrap();
        assert_eq!(config.sandbox.image, "gomment-test");
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        assert!(load_config_str("[runner\nmax_parallel = ").is_err());
    }
}
