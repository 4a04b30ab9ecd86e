use super::enums::TaskType;
use super::timeline::SlotError;
use chrono::{Duration, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Length of the scheduling day
pub fn day_length() -> Duration {
    Duration::hours(24)
}

/// Default cosmetic color for new templates
pub const DEFAULT_COLOR: &str = "#ffffff";

/// Name given to synthesized free-time slots
pub const FREE_TIME_NAME: &str = "Free time";

/// A user-authored recurring task definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskTemplate {
    /// Stable unique ID, assigned at creation
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    /// Cosmetic only
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default)]
    pub is_free_time: bool,
    /// Offset from midnight
    #[serde(rename = "start_time_ticks", with = "ticks")]
    pub start_time_of_day: Duration,
    #[serde(rename = "duration_ticks", with = "ticks")]
    pub duration: Duration,
    /// Weekdays on which this template produces an instance
    pub recurrence_days: Vec<Weekday>,
}

fn default_color() -> String {
    DEFAULT_COLOR.to_string()
}

impl TaskTemplate {
    pub fn new(
        name: String,
        task_type: TaskType,
        recurrence_days: Vec<Weekday>,
        start_time_of_day: Duration,
        duration: Duration,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            task_type,
            color: default_color(),
            is_free_time: false,
            start_time_of_day,
            duration,
            recurrence_days,
        }
    }

    /// Synthetic template backing a free-time slot
    pub fn free_time(start_time_of_day: Duration, duration: Duration) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: FREE_TIME_NAME.to_string(),
            task_type: TaskType::Rest,
            color: default_color(),
            is_free_time: true,
            start_time_of_day,
            duration,
            recurrence_days: Vec::new(),
        }
    }

    pub fn end_time_of_day(&self) -> Duration {
        self.start_time_of_day + self.duration
    }

    /// Check if this template schedules an instance on the given weekday
    pub fn is_active_on(&self, day: Weekday) -> bool {
        !self.is_free_time && self.recurrence_days.contains(&day)
    }

    /// Half-open overlap: touching endpoints do not conflict
    pub fn overlaps(&self, start: Duration, end: Duration) -> bool {
        start < self.end_time_of_day() && end > self.start_time_of_day
    }

    /// Check the window fits inside one day and at least one weekday is set
    pub fn validate(&self) -> Result<(), SlotError> {
        if self.recurrence_days.is_empty() {
            return Err(SlotError::NoDays);
        }
        if self.start_time_of_day < Duration::zero()
            || self.duration <= Duration::zero()
            || self.end_time_of_day() > day_length()
        {
            return Err(SlotError::InvalidWindow {
                start: self.start_time_of_day,
                end: self.end_time_of_day(),
            });
        }
        Ok(())
    }
}

const NANOS_PER_TICK: i64 = 100;

/// Encode a duration as 100ns ticks
pub fn to_ticks(duration: Duration) -> i64 {
    match duration.num_nanoseconds() {
        Some(nanos) => nanos / NANOS_PER_TICK,
        None if duration < Duration::zero() => i64::MIN,
        None => i64::MAX,
    }
}

/// Decode 100ns ticks into a duration
pub fn from_ticks(ticks: i64) -> Duration {
    Duration::nanoseconds(ticks.saturating_mul(NANOS_PER_TICK))
}

mod ticks {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(super::to_ticks(*duration))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let ticks = i64::deserialize(deserializer)?;
        Ok(super::from_ticks(ticks))
    }
}
