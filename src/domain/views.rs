use super::enums::TaskStatus;
use super::instance::TaskInstance;
use chrono::Duration;

/// Format an offset from midnight as "HH:MM" (end of day renders as "24:00")
pub fn format_time_of_day(offset: Duration) -> String {
    let total_minutes = offset.num_minutes();
    format!("{:02}:{:02}", total_minutes / 60, total_minutes % 60)
}

/// Parse "HH:MM" into an offset from midnight; "24:00" is accepted as end of day
pub fn parse_time_of_day(input: &str) -> Option<Duration> {
    let (hours, minutes) = input.trim().split_once(':')?;
    let hours: i64 = hours.parse().ok()?;
    let minutes: i64 = minutes.parse().ok()?;

    if !(0..60).contains(&minutes) || !(0..=24).contains(&hours) || (hours == 24 && minutes != 0) {
        return None;
    }

    Some(Duration::hours(hours) + Duration::minutes(minutes))
}

/// Format a duration as "Xh Ym" (omits 0 values)
pub fn format_duration(duration: Duration) -> String {
    let total_minutes = duration.num_minutes();
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;

    if hours > 0 && minutes > 0 {
        format!("{}h {}m", hours, minutes)
    } else if hours > 0 {
        format!("{}h", hours)
    } else {
        format!("{}m", minutes)
    }
}

/// Get status badge text
pub fn status_badge(instance: &TaskInstance) -> &'static str {
    if instance.is_free_time() {
        return "· free";
    }

    match instance.status {
        TaskStatus::Pending => "○ PENDING",
        TaskStatus::InProgress => "⏱ IN PROGRESS",
        TaskStatus::AwaitingConfirmation => "? CONFIRM",
        TaskStatus::Completed => "✓ DONE",
        TaskStatus::Failed => "✗ FAILED",
    }
}

/// One printable line for a timeline entry
pub fn timeline_row(instance: &TaskInstance) -> String {
    let window = format!(
        "{}-{}",
        format_time_of_day(instance.start_time_of_day()),
        format_time_of_day(instance.end_time_of_day())
    );

    if instance.is_free_time() {
        format!("{}  {:<15} {}", window, status_badge(instance), instance.template.name)
    } else {
        format!(
            "{}  {:<15} {} [{}] ({})",
            window,
            status_badge(instance),
            instance.template.name,
            instance.template.task_type.to_tag(),
            instance.template.id
        )
    }
}
