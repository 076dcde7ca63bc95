//! Plain-text rendering of batch results.

use console::{Term, style};
use textwrap::Options;

use crate::findings::{FileReport, FileStatus, Finding, Severity};
use crate::orchestrator::{BatchSummary, format_eta};
use crate::ui::icons::{CHECK, CROSS, FOLDER};

const MIN_WIDTH: usize = 40;
const MAX_WIDTH: usize = 100;

/// Terminal width clamped to a readable range.
pub fn report_width() -> usize {
    let (_, cols) = Term::stdout().size();
    (cols as usize).clamp(MIN_WIDTH, MAX_WIDTH)
}

/// Render one file's report: a status header, then each finding.
pub fn render_report(report: &FileReport, width: usize) -> String {
    let mut out = String::new();

    let icon = match report.status() {
        FileStatus::Analyzed => &CHECK,
        FileStatus::Failed => &CROSS,
        FileStatus::Pending | FileStatus::Analyzing => &FOLDER,
    };
    out.push_str(&format!(
        "{}{} {}\n",
        icon,
        style(report.file_path()).bold(),
        style(format!("[{}]", report.status())).dim()
    ));

    if let Some(msg) = report.error_message() {
        out.push_str(&format!("   {}\n", style(msg).red()));
    }

    if report.status() == FileStatus::Analyzed && report.findings().is_empty() {
        out.push_str(&format!("   {}\n", style("No issues found.").green()));
    }

    for finding in report.findings() {
        out.push_str(&render_finding(finding, width));
    }
    out
}

/// Render one finding with its description wrapped to `width`.
pub fn render_finding(finding: &Finding, width: usize) -> String {
    let severity = finding.severity();
    let title = match severity {
        Severity::Critical | Severity::High => style(finding.title()).red().bold(),
        Severity::Medium => style(finding.title()).yellow(),
        Severity::Low | Severity::Informational => style(finding.title()).cyan(),
    };

    let mut out = format!(
        "   {} {} {} {}\n",
        severity.emoji(),
        title,
        style(format!("({} / {})", severity, finding.category())).dim(),
        style(finding.line_number().map(|l| format!("line {}", l)).unwrap_or_default()).dim()
    );

    let options = Options::new(width.saturating_sub(6).max(20))
        .initial_indent("      ")
        .subsequent_indent("      ");
    for line in textwrap::wrap(finding.description(), options) {
        out.push_str(&line);
        out.push('\n');
    }
    out
}

/// One-line label for picking a finding in a menu.
pub fn finding_label(finding: &Finding) -> String {
    format!(
        "{} [{}] {} ({})",
        finding.severity().emoji(),
        finding.severity(),
        finding.title(),
        finding.location()
    )
}

pub fn render_summary(summary: &BatchSummary) -> String {
    format!(
        "{} file(s) processed: {} analyzed, {} failed, {} finding(s) in {}",
        summary.processed,
        summary.analyzed,
        summary.failed,
        summary.total_findings,
        format_eta(summary.elapsed.as_secs())
    )
}

/// Print every report followed by the summary line.
pub fn print_reports(reports: &[FileReport], summary: &BatchSummary) {
    let width = report_width();
    println!();
    for report in reports {
        print!("{}", render_report(report, width));
        println!();
    }
    println!("{}", style(render_summary(summary)).bold());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::findings::Category;
    use std::time::Duration;

    fn plain(s: &str) -> String {
        console::strip_ansi_codes(s).into_owned()
    }

    fn finding(line: Option<&str>) -> Finding {
        let f = Finding::new(
            "src/cache.rs",
            "Unbounded cache",
            "The cache grows without limit and will exhaust memory under sustained load from many distinct keys.",
            Severity::High,
            Category::Scalability,
        );
        match line {
            Some(l) => f.with_line_number(l),
            None => f,
        }
    }

    #[test]
    fn test_render_finding_wraps_description() {
        let text = plain(&render_finding(&finding(Some("42")), 40));
        assert!(text.contains("Unbounded cache"));
        assert!(text.contains("(High / Scalability)"));
        assert!(text.contains("line 42"));
        let desc_lines: Vec<&str> = text.lines().skip(1).collect();
        assert!(desc_lines.len() > 1);
        assert!(desc_lines.iter().all(|l| l.starts_with("      ")));
        assert!(desc_lines.iter().all(|l| l.chars().count() <= 34));
    }

    #[test]
    fn test_render_finding_without_line() {
        let text = plain(&render_finding(&finding(None), 80));
        assert!(!text.contains("line "));
    }

    #[test]
    fn test_render_failed_report_shows_error() {
        let mut report = FileReport::pending("a.rs");
        report.mark_analyzing().unwrap();
        report.mark_failed("GitHub API Error: 404 Not Found", Vec::new()).unwrap();

        let text = plain(&render_report(&report, 80));
        assert!(text.contains("a.rs [failed]"));
        assert!(text.contains("GitHub API Error: 404 Not Found"));
    }

    #[test]
    fn test_render_clean_report() {
        let mut report = FileReport::pending("a.rs");
        report.mark_analyzing().unwrap();
        report.mark_analyzed(Vec::new()).unwrap();

        let text = plain(&render_report(&report, 80));
        assert!(text.contains("[analyzed]"));
        assert!(text.contains("No issues found."));
    }

    #[test]
    fn test_finding_label() {
        let label = finding_label(&finding(Some("7")));
        assert!(label.contains("[High] Unbounded cache (src/cache.rs:7)"));
    }

    #[test]
    fn test_render_summary() {
        let summary = BatchSummary {
            processed: 3,
            analyzed: 2,
            failed: 1,
            total_findings: 4,
            elapsed: Duration::from_secs(75),
        };
        assert_eq!(
            render_summary(&summary),
            "3 file(s) processed: 2 analyzed, 1 failed, 4 finding(s) in 1m 15s"
        );
    }
}
