//! Rendering of reports and suite summaries.
//!
//! Reports carry no timestamps, so rendering unchanged data twice yields the
//! same bytes and the same digest.

use crate::error::VerifyError;
use crate::suite::{CheckStatus, VerificationSummary};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt::Write;

/// Output format for rendered reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    #[default]
    Json,
    Markdown,
}

impl std::str::FromStr for ReportFormat {
    type Err = VerifyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "md" | "markdown" => Ok(Self::Markdown),
            other => Err(VerifyError::config(format!("unknown report format '{other}'"))),
        }
    }
}

/// Pretty JSON with a trailing newline.
pub fn render_json<T: Serialize + ?Sized>(report: &T) -> Result<String, VerifyError> {
    let mut out = serde_json::to_string_pretty(report)?;
    out.push('\n');
    Ok(out)
}

/// SHA-256 of a rendered report, hex encoded.
pub fn digest(rendered: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(rendered.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn status_heading(status: CheckStatus) -> &'static str {
    match status {
        CheckStatus::Fail => "Failed",
        CheckStatus::Warning => "Warnings",
        CheckStatus::Pass => "Passed",
    }
}

/// Markdown summary grouped fail, then warning, then pass.
pub fn render_markdown(summary: &VerificationSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Data Verification Report\n");
    let _ = writeln!(out, "| Status | Count |");
    let _ = writeln!(out, "|--------|-------|");
    let _ = writeln!(out, "| pass | {} |", summary.passed);
    let _ = writeln!(out, "| warning | {} |", summary.warnings);
    let _ = writeln!(out, "| fail | {} |", summary.failed);

    for status in [CheckStatus::Fail, CheckStatus::Warning, CheckStatus::Pass] {
        let mut checks = summary.by_status(status).peekable();
        if checks.peek().is_none() {
            continue;
        }
        let _ = writeln!(out, "\n## {}\n", status_heading(status));
        for check in checks {
            let _ = writeln!(out, "- **{}**: {}", check.name, check.message);
        }
    }
    out
}

/// Render a suite summary in the requested format.
pub fn render_summary(
    summary: &VerificationSummary,
    format: ReportFormat,
) -> Result<String, VerifyError> {
    match format {
        ReportFormat::Json => render_json(summary),
        ReportFormat::Markdown => Ok(render_markdown(summary)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::suite::CheckOutcome;
    use pretty_assertions::assert_eq;

    fn outcome(name: &str, status: CheckStatus, message: &str) -> CheckOutcome {
        CheckOutcome {
            name: name.into(),
            status,
            message: message.into(),
            details: serde_json::Value::Null,
        }
    }

    fn sample() -> VerificationSummary {
        VerificationSummary::from_outcomes(vec![
            outcome("races.schema", CheckStatus::Pass, "12 partitions share 30 columns"),
            outcome("features.leakage", CheckStatus::Fail, "label leakage: odds"),
            outcome("races.date_coverage", CheckStatus::Warning, "3 gaps"),
        ])
    }

    #[test]
    fn test_markdown_groups_fail_first() {
        let md = render_markdown(&sample());
        let fail = md.find("## Failed").unwrap();
        let warn = md.find("## Warnings").unwrap();
        let pass = md.find("## Passed").unwrap();
        assert!(fail < warn && warn < pass);
        assert!(md.contains("- **features.leakage**: label leakage: odds"));
        assert!(md.contains("| fail | 1 |"));
    }

    #[test]
    fn test_empty_groups_omitted() {
        let summary =
            VerificationSummary::from_outcomes(vec![outcome("a", CheckStatus::Pass, "ok")]);
        let md = render_markdown(&summary);
        assert!(!md.contains("## Failed"));
        assert!(md.contains("## Passed"));
    }

    #[test]
    fn test_json_digest_is_stable() {
        let a = render_json(&sample()).unwrap();
        let b = render_json(&sample()).unwrap();
        assert_eq!(a, b);
        assert_eq!(digest(&a), digest(&b));
        assert_eq!(digest(&a).len(), 64);
    }

    #[test]
    fn test_format_parse() {
        assert_eq!("md".parse::<ReportFormat>().unwrap(), ReportFormat::Markdown);
        assert_eq!("JSON".parse::<ReportFormat>().unwrap(), ReportFormat::Json);
        assert!("xml".parse::<ReportFormat>().is_err());
    }
}
