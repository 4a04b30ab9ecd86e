//! Day timeline generation and slot conflict checks.
//!
//! A generated day always tiles `[00:00, 24:00)`: real instances in start
//! order with synthesized free-time instances filling every gap of at least
//! `min_gap`. Shorter residual gaps are dropped.

use super::instance::TaskInstance;
use super::template::{day_length, TaskTemplate};
use crate::domain::views::format_time_of_day;
use chrono::{Duration, Weekday};
use thiserror::Error;

/// Why a template cannot be placed on the schedule
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SlotError {
    #[error("a task needs at least one weekday")]
    NoDays,
    #[error("invalid time window {}", window_label(.start, .end))]
    InvalidWindow { start: Duration, end: Duration },
    #[error("overlaps '{other_name}' on {day}")]
    Conflict {
        day: Weekday,
        other_id: String,
        other_name: String,
    },
}

fn window_label(start: &Duration, end: &Duration) -> String {
    format!("{}-{}", format_time_of_day(*start), format_time_of_day(*end))
}

/// Build the ordered, gapless timeline for one weekday
pub fn generate_day(templates: &[TaskTemplate], day: Weekday, min_gap: Duration) -> Vec<TaskInstance> {
    let mut real: Vec<&TaskTemplate> = templates.iter().filter(|t| t.is_active_on(day)).collect();
    // Stable: equal starts keep insertion order
    real.sort_by_key(|t| t.start_time_of_day);

    let end_of_day = day_length();
    let mut timeline = Vec::with_capacity(real.len() * 2 + 1);
    let mut cursor = Duration::zero();

    for template in real {
        if template.start_time_of_day >= end_of_day {
            continue;
        }

        let gap = template.start_time_of_day - cursor;
        if gap >= min_gap && gap > Duration::zero() {
            timeline.push(TaskInstance::new(TaskTemplate::free_time(cursor, gap)));
        }

        timeline.push(TaskInstance::new(template.clone()));
        cursor = std::cmp::max(cursor, template.end_time_of_day());
    }

    let final_gap = end_of_day - cursor;
    if final_gap >= min_gap && final_gap > Duration::zero() {
        timeline.push(TaskInstance::new(TaskTemplate::free_time(cursor, final_gap)));
    }

    timeline
}

/// Find the first template on `day` whose window overlaps `[start, end)`
pub fn find_conflict<'a>(
    templates: &'a [TaskTemplate],
    day: Weekday,
    start: Duration,
    end: Duration,
    exclude_id: Option<&str>,
) -> Option<&'a TaskTemplate> {
    templates.iter().find(|t| {
        t.is_active_on(day) && Some(t.id.as_str()) != exclude_id && t.overlaps(start, end)
    })
}

/// Check whether `[start, end)` is free on `day`, ignoring `exclude_id`
pub fn is_slot_available(
    templates: &[TaskTemplate],
    day: Weekday,
    start: Duration,
    end: Duration,
    exclude_id: Option<&str>,
) -> bool {
    find_conflict(templates, day, start, end, exclude_id).is_none()
}

/// Validate a template and check every recurrence day for conflicts
pub fn check_placement(
    templates: &[TaskTemplate],
    candidate: &TaskTemplate,
    exclude_id: Option<&str>,
) -> Result<(), SlotError> {
    candidate.validate()?;
    for day in &candidate.recurrence_days {
        let conflict = find_conflict(
            templates,
            *day,
            candidate.start_time_of_day,
            candidate.end_time_of_day(),
            exclude_id,
        );
        if let Some(other) = conflict {
            return Err(SlotError::Conflict {
                day: *day,
                other_id: other.id.clone(),
                other_name: other.name.clone(),
            });
        }
    }
    Ok(())
}
