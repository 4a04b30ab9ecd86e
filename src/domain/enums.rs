use chrono::Weekday;
use serde::{Deserialize, Serialize};

/// Category of a task; selects its reward/penalty definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskType {
    PhysicalExercise,
    Sleep,
    Rest,
    Eating,
    WorkAndStudy,
    Housework,
    Creative,
    Hygiene,
}

impl TaskType {
    /// Parse type from a CLI tag like "work" or "exercise"
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.to_lowercase().as_str() {
            "exercise" | "physicalexercise" | "physical-exercise" => Some(Self::PhysicalExercise),
            "sleep" => Some(Self::Sleep),
            "rest" => Some(Self::Rest),
            "eating" | "meal" => Some(Self::Eating),
            "work" | "study" | "workandstudy" | "work-and-study" => Some(Self::WorkAndStudy),
            "housework" | "chores" => Some(Self::Housework),
            "creative" | "hobby" => Some(Self::Creative),
            "hygiene" => Some(Self::Hygiene),
            _ => None,
        }
    }

    /// Short tag used by the CLI and the report
    pub fn to_tag(&self) -> &'static str {
        match self {
            Self::PhysicalExercise => "exercise",
            Self::Sleep => "sleep",
            Self::Rest => "rest",
            Self::Eating => "eating",
            Self::WorkAndStudy => "work",
            Self::Housework => "housework",
            Self::Creative => "creative",
            Self::Hygiene => "hygiene",
        }
    }

    /// Get the display name for this type
    pub fn name(&self) -> &'static str {
        match self {
            Self::PhysicalExercise => "Physical exercise",
            Self::Sleep => "Sleep",
            Self::Rest => "Rest / free time",
            Self::Eating => "Meal",
            Self::WorkAndStudy => "Work / study",
            Self::Housework => "Housework / errands",
            Self::Creative => "Creative / hobby",
            Self::Hygiene => "Personal hygiene",
        }
    }

    /// Get all types as a list
    pub fn all() -> &'static [TaskType] {
        &[
            TaskType::PhysicalExercise,
            TaskType::Sleep,
            TaskType::Rest,
            TaskType::Eating,
            TaskType::WorkAndStudy,
            TaskType::Housework,
            TaskType::Creative,
            TaskType::Hygiene,
        ]
    }
}

/// Per-day status of a task instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    Pending,
    InProgress,
    AwaitingConfirmation,
    Completed,
    Failed,
}

impl TaskStatus {
    /// Parse status from a tag like "IN_PROGRESS"
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.to_uppercase().as_str() {
            "PENDING" => Some(Self::Pending),
            "IN_PROGRESS" => Some(Self::InProgress),
            "AWAITING" => Some(Self::AwaitingConfirmation),
            "COMPLETED" => Some(Self::Completed),
            "FAILED" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Convert status to tag
    pub fn to_tag(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::InProgress => "IN_PROGRESS",
            Self::AwaitingConfirmation => "AWAITING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        }
    }

    /// No transition leaves a terminal status
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Check if the task is currently running or waiting for the user
    pub fn is_active(&self) -> bool {
        matches!(self, Self::InProgress | Self::AwaitingConfirmation)
    }
}

/// Player stat affected by a reward or penalty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RewardType {
    Strength,
    Intelligence,
    Health,
    Xp,
}

impl RewardType {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Strength => "Strength",
            Self::Intelligence => "Intelligence",
            Self::Health => "Health",
            Self::Xp => "XP",
        }
    }
}

/// All weekdays, Monday first
pub fn all_weekdays() -> [Weekday; 7] {
    [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
        Weekday::Sat,
        Weekday::Sun,
    ]
}

/// Parse a comma-separated day list like "mon,wed,fri", "weekdays" or "all"
pub fn parse_weekdays(input: &str) -> Option<Vec<Weekday>> {
    let mut days = Vec::new();
    for part in input.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        match part.to_lowercase().as_str() {
            "all" | "daily" => days.extend(all_weekdays()),
            "weekdays" => days.extend(&all_weekdays()[..5]),
            "weekend" => days.extend(&all_weekdays()[5..]),
            other => days.push(other.parse::<Weekday>().ok()?),
        }
    }

    let mut unique = Vec::new();
    for day in days {
        if !unique.contains(&day) {
            unique.push(day);
        }
    }

    if unique.is_empty() {
        None
    } else {
        Some(unique)
    }
}
