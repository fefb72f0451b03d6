use crate::row::{Liveness, ViewRow};
use colored::Colorize;
use serde::Serialize;

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

/// Flat view of a row for machine-readable output.
#[derive(Debug, Clone, Serialize)]
pub struct RowSummary<'a> {
    pub id: i64,
    pub url: &'a str,
    pub name: Option<&'a str>,
    pub status: Liveness,
    pub checked_at: Option<&'a str>,
    pub status_code: Option<u16>,
    pub error: Option<&'a str>,
}

impl<'a> From<&'a ViewRow> for RowSummary<'a> {
    fn from(row: &'a ViewRow) -> Self {
        Self {
            id: row.id(),
            url: row.url(),
            name: row.name(),
            status: row.liveness(),
            checked_at: row.checked_at(),
            status_code: row.status_code(),
            error: row.error(),
        }
    }
}

/// Generate a dashboard table for the terminal
pub fn generate_targets_report(rows: &[ViewRow]) -> String {
    let mut report = String::new();
    report.push_str(RULE);
    report.push_str("\n\n# Summary:\n");
    report.push_str(&format!("  Targets: {}\n", rows.len()));

    let count = |l: Liveness| rows.iter().filter(|r| r.liveness() == l).count();
    report.push_str(&format!(
        "  {} up, {} down, {} unknown\n",
        count(Liveness::Up).to_string().green(),
        count(Liveness::Down).to_string().red(),
        count(Liveness::Unknown).to_string().dimmed()
    ));
    report.push('\n');
    report.push_str(RULE);
    report.push_str("\n\n");

    if rows.is_empty() {
        report.push_str("  No targets yet. Add one with `upwatch add <URL>`.\n");
        return report;
    }

    report.push_str(&format!(
        "  {:>6}  {:<6}  {:<19}  {}\n",
        "ID".bold(),
        "STATUS".bold(),
        "LAST CHECKED".bold(),
        "TARGET".bold()
    ));

    for row in rows {
        let badge = format!("{:<6}", row.liveness().badge());
        let badge = match row.liveness() {
            Liveness::Up => badge.green().bold(),
            Liveness::Down => badge.red().bold(),
            Liveness::Unknown => badge.dimmed(),
        };

        report.push_str(&format!(
            "  {:>6}  {}  {:<19}  {}\n",
            row.id(),
            badge,
            row.last_checked(),
            row.label()
        ));

        let indent = " ".repeat(41);
        if row.name().is_some() {
            report.push_str(&format!("{}{}\n", indent, row.url().dimmed()));
        }
        if let Some(error) = row.error() {
            report.push_str(&format!("{}{}\n", indent, error.red()));
        } else if let Some(code) = row.status_code() {
            report.push_str(&format!("{}{}\n", indent, format!("HTTP {}", code).dimmed()));
        }
    }

    report
}

pub fn generate_json_report(rows: &[ViewRow]) -> Result<String, serde_json::Error> {
    let summaries: Vec<RowSummary> = rows.iter().map(RowSummary::from).collect();
    serde_json::to_string_pretty(&summaries)
}
