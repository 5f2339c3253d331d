//! Shared fixtures for the system-test suites.
//!
//! Suite code runs inside the harness: a returned [`Failed`] is a reported
//! assertion mismatch, and a panic — including a failed fixture setup or a
//! dead connection — is the uncaught-fault channel the harness records as
//! an error. That is why the helpers here panic instead of propagating.

use std::fs;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::header::COOKIE;
use serde_json::{json, Value};

use crate::harness::TestContext;

/// One running instance of the service under test.
///
/// Launching removes any stale database, starts the binary with its
/// storage path and credential material in the environment, and sleeps
/// through the fixed warm-up delay — there is no readiness probe. Dropping
/// kills the process, reaps it, and removes the database.
pub struct Service {
    child: Child,
    db_path: PathBuf,
    endpoint: String,
    http: Client,
}

impl Service {
    pub fn launch(ctx: &TestContext) -> Service {
        let cfg = ctx.service().clone();
        let db_path = ctx.db_path().to_path_buf();
        let _ = fs::remove_file(&db_path);

        let child = Command::new(&cfg.binary)
            .env(&cfg.db_env, &db_path)
            .env(&cfg.pw_hash_env, &cfg.pw_hash)
            .stdout(Stdio::null())
            .spawn()
            .unwrap_or_else(|e| panic!("failed to start {}: {e}", cfg.binary.display()));

        thread::sleep(Duration::from_secs(cfg.warmup_secs));

        Service {
            child,
            db_path,
            endpoint: cfg.endpoint,
            http: Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint, path)
    }

    pub fn get(&self, path: &str) -> Response {
        self.http
            .get(self.url(path))
            .send()
            .unwrap_or_else(|e| panic!("GET {path}: {e}"))
    }

    /// GET with the response body parsed as JSON.
    pub fn get_json(&self, path: &str) -> Value {
        self.get(path)
            .json()
            .unwrap_or_else(|e| panic!("GET {path}: body is not json: {e}"))
    }

    pub fn get_with_cookie(&self, path: &str, name: &str, value: &str) -> Response {
        self.http
            .get(self.url(path))
            .header(COOKIE, format!("{name}={value}"))
            .send()
            .unwrap_or_else(|e| panic!("GET {path}: {e}"))
    }

    /// POST with an empty body.
    pub fn post(&self, path: &str) -> Response {
        self.http
            .post(self.url(path))
            .send()
            .unwrap_or_else(|e| panic!("POST {path}: {e}"))
    }

    pub fn post_json(&self, path: &str, body: Value) -> Response {
        self.http
            .post(self.url(path))
            .json(&body)
            .send()
            .unwrap_or_else(|e| panic!("POST {path}: {e}"))
    }

    /// Posts one comment into a thread.
    pub fn post_comment(&self, author: &str, email: &str, text: &str, thread: i64, parent: i64) {
        self.post_json(
            "/comment",
            json!({
                "author": author,
                "email": email,
                "text": text,
                "thread_id": thread,
                "parent_id": parent,
            }),
        );
    }
}

impl Drop for Service {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
        let _ = fs::remove_file(&self.db_path);
    }
}
