//! Results table, summary box and the JSON report.

use std::path::PathBuf;

use console::style;
use imgpress_core::{ConversionResult, ConversionSummary, JobStatus, OrchestratorState};
use serde::Serialize;

/// Machine-readable outcome of a batch, printed with `--json`.
#[derive(Debug, Serialize)]
pub struct BatchReport {
    pub files: Vec<FileReport>,
    pub summary: Option<ConversionSummary>,
}

#[derive(Debug, Serialize)]
pub struct FileReport {
    pub input: PathBuf,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ConversionResult>,
}

impl BatchReport {
    pub fn from_state(state: &OrchestratorState) -> Self {
        let files = state
            .jobs
            .iter()
            .map(|job| {
                let (status, error, result) = match job.status() {
                    JobStatus::Completed(r) => ("completed", None, Some(r.clone())),
                    JobStatus::Failed(message) => ("failed", Some(message.clone()), None),
                    JobStatus::Pending => ("skipped", None, None),
                    JobStatus::InProgress(_) => ("in_progress", None, None),
                };
                FileReport {
                    input: job.item.path.clone(),
                    status,
                    error,
                    result,
                }
            })
            .collect();

        Self {
            files,
            summary: state.summary.clone(),
        }
    }
}

/// Print one line per job: name, outcome and size change.
pub fn print_table(state: &OrchestratorState) {
    let width = state
        .jobs
        .iter()
        .map(|j| j.item.display_name.chars().count())
        .max()
        .unwrap_or(0)
        .min(40);

    for job in &state.jobs {
        let name = truncate(&job.item.display_name, width);
        match job.status() {
            JobStatus::Completed(r) => println!(
                "  {name:<width$}  {}  {}",
                style(format!("{:<9}", "done")).green(),
                size_change(r.original_size, r.output_size)
            ),
            JobStatus::Failed(message) => println!(
                "  {name:<width$}  {}  {message}",
                style(format!("{:<9}", "failed")).red()
            ),
            other => println!(
                "  {name:<width$}  {}",
                style(format!("{:<9}", other.label().to_lowercase())).dim()
            ),
        }
    }
}

/// Print the aggregate box after a batch.
pub fn print_summary(summary: &ConversionSummary) {
    let delta = summary.total_size_delta();
    let verb = if summary.is_smaller() {
        style("Saved").green()
    } else {
        style("Grew ").yellow()
    };

    eprintln!();
    eprintln!("  ====================================");
    eprintln!("               Summary");
    eprintln!("  ====================================");
    eprintln!("    Converted:    {:>8}", summary.completed_count);
    if summary.failed_count > 0 {
        eprintln!("    Failed:       {:>8}", summary.failed_count);
    }
    let skipped = summary.skipped_count();
    if skipped > 0 {
        eprintln!("    Skipped:      {:>8}", skipped);
    }
    eprintln!("  ------------------------------------");
    eprintln!("    Before:       {:>10}", format_bytes(summary.total_original_size));
    eprintln!("    After:        {:>10}", format_bytes(summary.total_output_size));
    eprintln!(
        "    {verb}:        {:>10} ({:+.1}%)",
        format_bytes(delta.unsigned_abs()),
        summary.percent_change()
    );
    eprintln!("    Duration:     {:>9.1}s", summary.duration.as_secs_f64());
    eprintln!(
        "    Per file:     {:>9.2}s",
        summary.average_time_per_file().as_secs_f64()
    );
    eprintln!("  ====================================");
}

/// "1.2 MB -> 800.0 KB (-33.3%)"
pub fn size_change(original: u64, output: u64) -> String {
    let percent = if original == 0 {
        0.0
    } else {
        (output as f64 - original as f64) / original as f64 * 100.0
    };
    format!(
        "{} -> {} ({percent:+.1}%)",
        format_bytes(original),
        format_bytes(output)
    )
}

/// Decimal units, matching what file browsers show.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];
    if bytes < 1000 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / 1000.0;
    let mut unit = 0;
    while value >= 1000.0 && unit < UNITS.len() - 1 {
        value /= 1000.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

fn truncate(name: &str, width: usize) -> String {
    if name.chars().count() <= width {
        return name.to_string();
    }
    let kept: String = name.chars().take(width.saturating_sub(1)).collect();
    format!("{kept}…")
}
