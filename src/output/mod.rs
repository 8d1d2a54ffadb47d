use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;

use crate::cli::OutputFormat;

/// One-shot summarization result
#[derive(Debug, Clone, Serialize)]
pub struct SummaryReport {
    pub video_id: String,
    pub url: String,
    pub model: String,
    pub summary: String,
    pub generated_at: DateTime<Utc>,
}

/// Render the report in the requested format
pub fn format_report(report: &SummaryReport, format: &OutputFormat) -> Result<String> {
    let content = match format {
        OutputFormat::Text => format!(
            "{}\n{}\n\n{}\n",
            report.url,
            "=".repeat(report.url.chars().count()),
            report.summary.trim_end()
        ),
        OutputFormat::Json => serde_json::to_string_pretty(report)?,
    };
    Ok(content)
}

/// Save summary report to file
pub fn save_to_file(report: &SummaryReport, path: &Path, format: &OutputFormat) -> Result<()> {
    let content = format_report(report, format)?;
    fs_err::write(path, content)?;
    Ok(())
}

/// Print summary report to console
pub fn print_to_console(report: &SummaryReport, format: &OutputFormat) -> Result<()> {
    let content = format_report(report, format)?;
    println!("{}", content);
    Ok(())
}
