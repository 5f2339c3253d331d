//! Deterministic two-phase report rendering.
//!
//! Results arrive in completion order; the report does not. Both phases
//! are sorted ascending by the rendered decorated line, so two runs over
//! the same outcomes always print identically:
//!
//! 1. every decoded result that did not succeed, as its decorated line
//!    followed by the full application and harness output — failures are
//!    readable before the summary;
//! 2. one decorated line per decoded result, a scannable summary, followed
//!    by any raw-text anomalies, each printed exactly once, verbatim.

use std::io::{self, Write};

use crate::protocol::{CaseResult, Status};

/// Renders the report for one completed indirect run.
pub fn render(
    results: &[CaseResult],
    anomalies: &[String],
    out: &mut dyn Write,
) -> io::Result<()> {
    let mut ordered: Vec<(String, &CaseResult)> = results
        .iter()
        .map(|result| (result.decorated_line(), result))
        .collect();
    ordered.sort_by(|a, b| a.0.cmp(&b.0));

    for (line, result) in &ordered {
        if result.status() == Status::Success {
            continue;
        }
        writeln!(out, "{line}")?;
        write_block(out, &result.app_output)?;
        write_block(out, &result.harness_output)?;
        writeln!(out)?;
    }

    for (line, _) in &ordered {
        writeln!(out, "{line}")?;
    }
    for raw in anomalies {
        writeln!(out, "{raw}")?;
    }
    Ok(())
}

/// Writes a captured channel in full, terminating it with a newline only
/// when the content itself does not.
fn write_block(out: &mut dyn Write, content: &str) -> io::Result<()> {
    if content.is_empty() {
        return Ok(());
    }
    out.write_all(content.as_bytes())?;
    if !content.ends_with('\n') {
        writeln!(out)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn case(
        test: &str,
        failures: Vec<&str>,
        errors: Vec<&str>,
        app: &str,
        harness: &str,
    ) -> CaseResult {
        CaseResult {
            test: test.to_string(),
            app_output: app.to_string(),
            harness_output: harness.to_string(),
            failures: failures.into_iter().map(String::from).collect(),
            errors: errors.into_iter().map(String::from).collect(),
            executed: 1,
        }
    }

    fn rendered(results: &[CaseResult], anomalies: &[String]) -> String {
        let mut out = Vec::new();
        render(results, anomalies, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    /// Three discovered tests: one success, one error, one failure.
    fn scenario() -> Vec<CaseResult> {
        vec![
            case("a.A.t1", vec![], vec![], "", "ran fine"),
            case(
                "a.B.t2",
                vec![],
                vec!["boom"],
                "service said hello",
                "ERROR: a.B.t2\nboom",
            ),
            case(
                "a.C.t3",
                vec!["expected 1 got 2"],
                vec![],
                "",
                "FAIL: a.C.t3\nexpected 1 got 2",
            ),
        ]
    }

    #[test]
    fn test_phase_one_dumps_non_success_in_sort_order() {
        let output = rendered(&scenario(), &[]);

        // The sort key is the rendered line, so the ERROR tag sorts before
        // the FAILURE tag and the full dumps come out in that order.
        let error_dump = output.find("service said hello").unwrap();
        let failure_dump = output.find("expected 1 got 2").unwrap();
        assert!(error_dump < failure_dump);

        // The success gets no diagnostic dump: its identifier appears only
        // once, in the phase-two summary.
        assert_eq!(output.matches("a.A.t1").count(), 1);
        // Non-success identifiers appear twice: dump header plus summary.
        assert_eq!(output.matches("ERROR   a.B.t2").count(), 2);
        assert_eq!(output.matches("FAILURE a.C.t3").count(), 2);
    }

    #[test]
    fn test_phase_two_lists_every_result_in_sort_order() {
        let output = rendered(&scenario(), &[]);
        let lines: Vec<&str> = output.lines().collect();

        // The last three lines are the summary, sorted by rendered line.
        let summary = &lines[lines.len() - 3..];
        assert_eq!(
            summary,
            &["ERROR   a.B.t2", "FAILURE a.C.t3", "SUCCESS a.A.t1"]
        );
    }

    #[test]
    fn test_anomaly_printed_verbatim_exactly_once() {
        let anomalies = vec!["panic: oom".to_string()];
        let output = rendered(&scenario(), &anomalies);

        assert_eq!(output.matches("panic: oom").count(), 1);
        // The decodable results are still fully reported around it.
        assert!(output.contains("SUCCESS a.A.t1"));
        assert!(output.contains("ERROR   a.B.t2"));
        assert!(output.contains("FAILURE a.C.t3"));
        // Verbatim, after the summary.
        assert!(output.ends_with("panic: oom\n"));
    }

    #[test]
    fn test_all_success_report_is_summary_only() {
        let results = vec![
            case("a.A.t1", vec![], vec![], "chatter", "ok"),
            case("a.A.t2", vec![], vec![], "", "ok"),
        ];
        let output = rendered(&results, &[]);

        // No diagnostic dumps, so the app output never appears.
        assert!(!output.contains("chatter"));
        assert_eq!(output.lines().count(), 2);
    }

    #[test]
    fn test_empty_run_renders_nothing() {
        assert_eq!(rendered(&[], &[]), "");
    }
}
