use crate::domain::{all_weekdays, TaskTemplate, TaskType};
use chrono::{Duration, Weekday};

fn at(hour: i64, minute: i64) -> Duration {
    Duration::hours(hour) + Duration::minutes(minute)
}

fn weekdays() -> Vec<Weekday> {
    vec![Weekday::Mon, Weekday::Tue, Weekday::Wed, Weekday::Thu, Weekday::Fri]
}

fn block(name: &str, task_type: TaskType, days: Vec<Weekday>, start: Duration, end: Duration) -> TaskTemplate {
    TaskTemplate::new(name.to_string(), task_type, days, start, end - start)
}

/// Starter week for a first run
pub fn default_schedule() -> Vec<TaskTemplate> {
    let every_day = all_weekdays().to_vec();

    vec![
        block("Sleep", TaskType::Sleep, every_day.clone(), at(0, 0), at(7, 0)),
        block("Morning hygiene", TaskType::Hygiene, every_day.clone(), at(7, 0), at(7, 30)),
        block("Breakfast", TaskType::Eating, every_day.clone(), at(7, 30), at(8, 0)),
        block("Work", TaskType::WorkAndStudy, weekdays(), at(9, 0), at(13, 0)),
        block("Lunch", TaskType::Eating, weekdays(), at(13, 0), at(14, 0)),
        block("Work", TaskType::WorkAndStudy, weekdays(), at(14, 0), at(18, 0)),
        block("Dinner", TaskType::Eating, every_day.clone(), at(19, 0), at(19, 45)),
        block("Sleep", TaskType::Sleep, every_day, at(23, 0), at(24, 0)),
    ]
}
