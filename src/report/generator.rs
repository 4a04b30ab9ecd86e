use crate::domain::{format_duration, format_time_of_day, TaskStatus, TaskTemplate, TaskTypeCatalog};
use crate::persistence::{atomic_write, report_file, TaskStatusHistory};
use crate::report::stats::{calculate_day_stats, DayStats, StatDelta};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::path::{Path, PathBuf};

/// Format percentage with 1 decimal place
fn format_percent(value: f64) -> String {
    format!("{:.1}%", value)
}

fn format_delta(delta: &StatDelta) -> String {
    if delta.is_zero() {
        return "no change".to_string();
    }
    let parts: Vec<String> = [
        ("STR", delta.strength),
        ("INT", delta.intelligence),
        ("HP", delta.health),
        ("XP", delta.xp),
    ]
    .iter()
    .filter(|(_, amount)| *amount != 0)
    .map(|(label, amount)| format!("{:+} {}", amount, label))
    .collect();
    parts.join(", ")
}

fn outcome_marker(status: Option<TaskStatus>) -> &'static str {
    match status {
        Some(TaskStatus::Completed) => "[x]",
        Some(TaskStatus::Failed) => "[!]",
        Some(_) => "[~]",
        None => "[ ]",
    }
}

/// Render the Markdown report for one day
pub fn render_report(stats: &DayStats) -> String {
    let mut report = String::new();

    report.push_str(&format!("# Daily Report - {} ({})\n\n", stats.date, stats.date.format("%A")));

    report.push_str("## Summary\n\n");
    report.push_str(&format!(
        "- **Planned Tasks:** {} ({} scheduled)\n",
        stats.planned,
        format_duration(stats.planned_time)
    ));
    report.push_str(&format!(
        "- **Completed:** {} | **Failed:** {} | **Skipped:** {} | **Unrecorded:** {}\n",
        stats.completed, stats.failed, stats.skipped, stats.unrecorded
    ));
    report.push_str(&format!(
        "- **Completion Rate:** {}\n",
        format_percent(stats.completion_rate)
    ));
    report.push_str(&format!(
        "- **Time Completed:** {}\n",
        format_duration(stats.completed_time)
    ));
    report.push_str(&format!("- **Stat Change:** {}\n\n", format_delta(&stats.delta)));

    if !stats.by_type.is_empty() {
        report.push_str("## By Task Type\n\n");
        for type_stats in &stats.by_type {
            report.push_str(&format!("### {}\n\n", type_stats.task_type.name()));
            if !type_stats.description.is_empty() {
                report.push_str(&format!("_{}_\n\n", type_stats.description));
            }
            report.push_str(&format!(
                "- **Tasks:** {} (Completed: {}, Failed: {})\n",
                type_stats.planned, type_stats.completed, type_stats.failed
            ));
            report.push_str(&format!(
                "- **Time:** {}\n",
                format_duration(type_stats.planned_time)
            ));
            report.push_str(&format!(
                "- **Stat Change:** {}\n\n",
                format_delta(&type_stats.delta)
            ));
        }
    }

    report.push_str("## Timeline\n\n");
    if stats.outcomes.is_empty() {
        report.push_str("Nothing was planned for this day.\n");
    }
    for outcome in &stats.outcomes {
        report.push_str(&format!(
            "- {} {}-{} **{}** ({})\n",
            outcome_marker(outcome.status),
            format_time_of_day(outcome.start),
            format_time_of_day(outcome.end),
            outcome.name,
            outcome.task_type.name()
        ));
    }

    report
}

/// Generate a report for `date` and write it to `output_path` or the
/// default report file in `data_dir`
pub fn generate_report(
    data_dir: &Path,
    templates: &[TaskTemplate],
    history: &TaskStatusHistory,
    catalog: &TaskTypeCatalog,
    date: NaiveDate,
    output_path: Option<PathBuf>,
) -> Result<PathBuf> {
    let stats = calculate_day_stats(templates, history, catalog, date);
    let report = render_report(&stats);

    let output = output_path.unwrap_or_else(|| report_file(data_dir, date));
    atomic_write(&output, &report)
        .with_context(|| format!("Failed to write report to {}", output.display()))?;

    Ok(output)
}
