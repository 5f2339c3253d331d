//! Binary-level checks of the command-line surface.

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn passthrough_with_direct_is_rejected_before_anything_runs() {
    Command::cargo_bin("volley")
        .unwrap()
        .args(["--passthrough", "--direct"])
        .assert()
        .failure()
        .code(2)
        .stdout(predicate::str::is_empty())
        .stderr(
            predicate::str::contains("--passthrough").and(predicate::str::contains("--direct")),
        );
}

#[test]
fn unknown_specifier_aborts_the_run() {
    // Direct mode so no container runtime is touched; the run must die at
    // discovery, before any test executes.
    Command::cargo_bin("volley")
        .unwrap()
        .args(["--direct", "--tests", "no.Such.test"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("no.Such.test"));
}

#[test]
fn help_documents_the_flags() {
    Command::cargo_bin("volley")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("--tests")
                .and(predicate::str::contains("--direct"))
                .and(predicate::str::contains("--json"))
                .and(predicate::str::contains("--passthrough")),
        );
}
