//! Run summary and result reporting.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::path::Path;
use testhop_core::RunLog;
use tracing::info;

/// Highest exit status a run reports for failed tests; 255 is reserved
/// for runs that abort.
pub const MAX_FAILURE_EXIT: u8 = 254;

/// How one counted test ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Passed,
    Failed,
    /// The descriptor could not be loaded; nothing ran.
    LoadFailed,
}

/// One counted test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestRecord {
    /// Test name, or the directory when the descriptor did not load.
    pub name: String,
    pub outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    /// Captured output, or the load error for [`Outcome::LoadFailed`].
    #[serde(skip)]
    pub output: String,
}

/// Aggregate counters of a run.
///
/// `total == passed + failed` always holds; load failures are part of
/// `failed` and also tallied in `load_failures`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub total: u32,
    pub passed: u32,
    pub failed: u32,
    pub load_failures: u32,
    pub skipped: u32,
    pub halted_early: bool,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    pub tests: Vec<TestRecord>,
}

impl RunSummary {
    pub fn start() -> Self {
        Self {
            total: 0,
            passed: 0,
            failed: 0,
            load_failures: 0,
            skipped: 0,
            halted_early: false,
            started_at: Utc::now(),
            finished_at: None,
            tests: Vec::new(),
        }
    }

    pub fn record_pass(&mut self, name: &str, output: String) {
        self.total += 1;
        self.passed += 1;
        self.tests.push(TestRecord {
            name: name.to_string(),
            outcome: Outcome::Passed,
            exit_code: Some(0),
            output,
        });
    }

    pub fn record_failure(&mut self, name: &str, exit_code: i32, output: String) {
        self.total += 1;
        self.failed += 1;
        self.tests.push(TestRecord {
            name: name.to_string(),
            outcome: Outcome::Failed,
            exit_code: Some(exit_code),
            output,
        });
    }

    pub fn record_load_failure(&mut self, name: &str, error: &str) {
        self.total += 1;
        self.failed += 1;
        self.load_failures += 1;
        self.tests.push(TestRecord {
            name: name.to_string(),
            outcome: Outcome::LoadFailed,
            exit_code: None,
            output: error.to_string(),
        });
    }

    pub fn record_skip(&mut self) {
        self.skipped += 1;
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn success(&self) -> bool {
        self.failed == 0
    }

    /// Process exit status: the failed count, clamped to [`MAX_FAILURE_EXIT`].
    pub fn exit_code(&self) -> u8 {
        self.failed.min(u32::from(MAX_FAILURE_EXIT)) as u8
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Total: {} Passed: {} Failed: {}",
            self.total, self.passed, self.failed
        )
    }
}

/// The flat key=value results artifact.
pub fn render_properties(summary: &RunSummary) -> String {
    format!(
        "tests.total={}\ntests.passed={}\ntests.failed={}\n",
        summary.total, summary.passed, summary.failed
    )
}

pub fn write_properties(path: &Path, summary: &RunSummary) -> Result<()> {
    std::fs::write(path, render_properties(summary))
        .with_context(|| format!("Failed to write results file {}", path.display()))
}

/// JUnit XML for the counted tests. Load failures are `<error>` cases,
/// failed tests are `<failure>` cases; skipped tests do not appear.
pub fn render_junit(summary: &RunSummary) -> String {
    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n");
    xml.push_str(&format!(
        "<testsuite name=\"dotnet\" tests=\"{}\" failures=\"{}\" errors=\"{}\"",
        summary.total,
        summary.failed - summary.load_failures,
        summary.load_failures
    ));
    if summary.tests.is_empty() {
        xml.push_str(" />");
        return xml;
    }

    xml.push_str(">\n");
    for test in &summary.tests {
        xml.push_str(&format!(
            "  <testcase name=\"{}\" classname=\"TestSuite\">\n",
            xml_escape(&test.name)
        ));
        match test.outcome {
            Outcome::Passed => {}
            Outcome::Failed => xml.push_str(&format!(
                "    <failure message=\"Exit code {}\" />\n",
                test.exit_code.unwrap_or_default()
            )),
            Outcome::LoadFailed => xml.push_str(&format!(
                "    <error message=\"{}\" />\n",
                xml_escape(first_line(&test.output))
            )),
        }
        xml.push_str(&format!(
            "    <system-out>{}</system-out>\n",
            xml_escape(&test.output)
        ));
        xml.push_str("  </testcase>\n");
    }
    xml.push_str("</testsuite>");
    xml
}

pub fn write_junit(path: &Path, summary: &RunSummary) -> Result<()> {
    std::fs::write(path, render_junit(summary))
        .with_context(|| format!("Failed to write JUnit report {}", path.display()))
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or_default()
}

/// Escape markup and drop characters XML 1.0 cannot carry.
fn xml_escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars().filter(|c| xml_char(*c)) {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            c => escaped.push(c),
        }
    }
    escaped
}

fn xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r') || (c >= ' ' && c != '\u{FFFE}' && c != '\u{FFFF}')
}

/// Emit the summary line to the run log and stdout.
pub fn report(summary: &RunSummary, log: &RunLog) {
    log.announce(&summary.to_string());
    if summary.halted_early {
        log.record("Run halted after the first failure");
    }
    info!(
        total = summary.total,
        passed = summary.passed,
        failed = summary.failed,
        skipped = summary.skipped,
        success = summary.success(),
        "run finished"
    );
    log.flush();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary() -> RunSummary {
        let mut summary = RunSummary::start();
        summary.record_pass("alpha", "alpha\n\nok\n".to_string());
        summary.record_failure("beta", 3, "beta\n\nboom\n".to_string());
        summary.record_load_failure("gamma", "Failed to load test: missing field `type`");
        summary.record_skip();
        summary.finish();
        summary
    }

    #[test]
    fn test_counts_add_up() {
        let summary = summary();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.passed, 1);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.load_failures, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.total, summary.passed + summary.failed);
        assert!(!summary.success());
        assert_eq!(summary.to_string(), "Total: 3 Passed: 1 Failed: 2");
    }

    #[test]
    fn test_exit_code_is_clamped() {
        let mut summary = RunSummary::start();
        assert_eq!(summary.exit_code(), 0);
        for i in 0..300 {
            summary.record_failure(&format!("t{i}"), 1, String::new());
        }
        assert_eq!(summary.exit_code(), MAX_FAILURE_EXIT);
    }

    #[test]
    fn test_properties_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.properties");
        write_properties(&path, &summary()).unwrap();

        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "tests.total=3\ntests.passed=1\ntests.failed=2\n"
        );
    }

    #[test]
    fn test_summary_serializes_outcomes() {
        let value = serde_json::to_value(summary()).unwrap();
        assert_eq!(value["total"], 3);
        assert_eq!(value["load_failures"], 1);
        assert_eq!(value["tests"][1]["outcome"], "failed");
        assert_eq!(value["tests"][2]["outcome"], "load_failed");
        assert!(value["tests"][2].get("exit_code").is_none());
        assert!(value["tests"][0].get("output").is_none());
    }

    #[test]
    fn test_junit_empty_run() {
        assert_eq!(
            render_junit(&RunSummary::start()),
            "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n\
             <testsuite name=\"dotnet\" tests=\"0\" failures=\"0\" errors=\"0\" />"
        );
    }

    #[test]
    fn test_junit_single_passing_test() {
        let mut summary = RunSummary::start();
        summary.record_pass("foo", String::new());

        assert_eq!(
            render_junit(&summary),
            "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n\
             <testsuite name=\"dotnet\" tests=\"1\" failures=\"0\" errors=\"0\">\n  \
             <testcase name=\"foo\" classname=\"TestSuite\">\n    \
             <system-out></system-out>\n  \
             </testcase>\n\
             </testsuite>"
        );
    }

    #[test]
    fn test_junit_strips_control_characters() {
        let mut summary = RunSummary::start();
        summary.record_pass(
            "foo",
            "\u{1}\u{2}\u{3}\u{4}\u{5}aaa\u{6}\u{7}\u{8}\u{1A}\u{1B}\u{1C}bbb\u{1D}".to_string(),
        );

        assert!(render_junit(&summary).contains("<system-out>aaabbb</system-out>"));
    }

    #[test]
    fn test_junit_marks_failures_and_load_errors() {
        let mut summary = summary();
        summary.record_pass("<odd> & \"quoted\"", "a < b\tc\n".to_string());
        let xml = render_junit(&summary);

        assert!(xml.contains("tests=\"4\" failures=\"1\" errors=\"1\""));
        assert!(xml.contains("<failure message=\"Exit code 3\" />"));
        assert!(xml.contains("<error message=\"Failed to load test: missing field `type`\" />"));
        assert!(xml.contains("<system-out>beta\n\nboom\n</system-out>"));
        assert!(xml.contains("name=\"&lt;odd&gt; &amp; &quot;quoted&quot;\""));
        assert!(xml.contains("<system-out>a &lt; b\tc\n</system-out>"));
        assert!(xml.ends_with("</testsuite>"));
    }

    #[test]
    fn test_write_junit_to_log_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.xml");
        write_junit(&path, &summary()).unwrap();

        let xml = std::fs::read_to_string(&path).unwrap();
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<testsuite"));
        assert_eq!(xml.matches("<testcase ").count(), 3);
    }

    #[test]
    fn test_write_properties_reports_path() {
        let err = write_properties(Path::new("/nonexistent/dir/results.properties"), &summary())
            .unwrap_err();
        assert!(err.to_string().contains("results.properties"));
    }
}
