//! Markdown report rendering

use crate::aggregate::{weekday_name, ListeningReport};
use crate::error::Result;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::info;

/// File name written inside the output directory
pub const REPORT_FILE_NAME: &str = "report.md";

const TITLE: &str = "# Listening History Report";

/// Render a report as markdown text
pub fn render_markdown(report: &ListeningReport) -> String {
    let mut md = String::new();
    md.push_str(TITLE);
    md.push_str("\n\n");

    if report.is_empty() {
        md.push_str("No data.\n");
        return md;
    }

    md.push_str("## Summary\n");
    let _ = writeln!(md, "- Total minutes: **{}**", group_thousands(report.total_minutes.round() as i64));
    let _ = writeln!(md, "- Days covered: **{}**", report.distinct_days);
    let _ = writeln!(md, "- Average minutes per day: **{:.1}**", report.average_minutes_per_day);

    push_table(
        &mut md,
        "Listening by hour",
        "Hour",
        report.by_hour.iter().map(|(h, m)| (format!("{:02}", h), *m)),
    );
    push_table(
        &mut md,
        "Listening by weekday",
        "Day",
        report.by_weekday.iter().map(|(d, m)| (weekday_name(*d).to_string(), *m)),
    );
    push_table(
        &mut md,
        "Listening by month",
        "Month",
        report.by_month.iter().map(|(month, m)| (month.clone(), *m)),
    );
    push_table(
        &mut md,
        "Top artists",
        "Artist",
        report.top_artists.iter().map(|(a, m)| (escape_cell(a), *m)),
    );

    md
}

/// Write `report.md` into `out_dir`, creating it if needed
pub fn write_report(report: &ListeningReport, out_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(out_dir)?;
    let path = out_dir.join(REPORT_FILE_NAME);
    std::fs::write(&path, render_markdown(report))?;
    info!(path = %path.display(), "Report written");
    Ok(path)
}

fn push_table(md: &mut String, title: &str, label: &str, rows: impl Iterator<Item = (String, f64)>) {
    let _ = write!(md, "\n## {}\n\n| {} | Minutes |\n|---|---:|\n", title, label);
    for (key, minutes) in rows {
        let _ = writeln!(md, "| {} | {:.1} |", key, minutes);
    }
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|")
}

/// Format an integer with `,` thousands separators
pub fn group_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        out.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use chrono::Weekday;
    use tempfile::TempDir;

    fn sample() -> ListeningReport {
        ListeningReport {
            total_minutes: 12_345.6,
            distinct_days: 10,
            average_minutes_per_day: 1_234.56,
            by_hour: vec![(8, 30.0), (22, 12.5)],
            by_weekday: vec![(Weekday::Mon, 40.0), (Weekday::Sun, 2.5)],
            by_month: vec![("2023-05".to_string(), 42.5)],
            top_artists: vec![("AC|DC".to_string(), 20.0), ("B".to_string(), 10.0)],
        }
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(1234567), "1,234,567");
        assert_eq!(group_thousands(-12345), "-12,345");
    }

    #[test]
    fn test_render_summary_and_tables() {
        let md = render_markdown(&sample());
        assert!(md.starts_with(TITLE));
        assert!(md.contains("- Total minutes: **12,346**"));
        assert!(md.contains("- Days covered: **10**"));
        assert!(md.contains("- Average minutes per day: **1234.6**"));
        assert!(md.contains("| 08 | 30.0 |"));
        assert!(md.contains("| Monday | 40.0 |"));
        assert!(md.contains("| 2023-05 | 42.5 |"));
        assert!(md.contains("| AC\\|DC | 20.0 |"));
        assert!(!md.contains("No data."));
    }

    #[test]
    fn test_render_empty() {
        let md = render_markdown(&ListeningReport::from_rows(&[], 15));
        assert_eq!(md, format!("{}\n\nNo data.\n", TITLE));
    }

    #[test]
    fn test_write_report_creates_directory() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("nested/report");
        let path = write_report(&sample(), &out).unwrap();
        assert_eq!(path, out.join(REPORT_FILE_NAME));
        assert!(std::fs::read_to_string(path).unwrap().contains("## Top artists"));
    }
}
