use crate::domain::{RewardPoint, RewardType, TaskStatus, TaskTemplate, TaskType, TaskTypeCatalog};
use crate::persistence::TaskStatusHistory;
use chrono::{Datelike, Duration, NaiveDate};
use std::collections::HashMap;

/// Net stat change implied by a set of outcomes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatDelta {
    pub strength: i32,
    pub intelligence: i32,
    pub health: i32,
    pub xp: i32,
}

impl StatDelta {
    pub fn apply(&mut self, points: &[RewardPoint]) {
        for point in points {
            match point.reward_type {
                RewardType::Strength => self.strength += point.amount,
                RewardType::Intelligence => self.intelligence += point.amount,
                RewardType::Health => self.health += point.amount,
                RewardType::Xp => self.xp += point.amount,
            }
        }
    }

    pub fn is_zero(&self) -> bool {
        *self == StatDelta::default()
    }
}

/// One planned task and how the day went for it
#[derive(Debug, Clone)]
pub struct TaskOutcome {
    pub name: String,
    pub task_type: TaskType,
    pub start: Duration,
    pub end: Duration,
    /// None when nothing was recorded for the task
    pub status: Option<TaskStatus>,
}

/// Per-type statistics
#[derive(Debug, Clone)]
pub struct TypeStats {
    pub task_type: TaskType,
    pub description: &'static str,
    pub planned: usize,
    pub completed: usize,
    pub failed: usize,
    pub planned_time: Duration,
    pub delta: StatDelta,
}

/// Statistics for one calendar date
#[derive(Debug)]
pub struct DayStats {
    pub date: NaiveDate,
    pub planned: usize,
    pub completed: usize,
    pub failed: usize,
    /// Handled without an outcome (tasks that ended before the first run)
    pub skipped: usize,
    pub unrecorded: usize,
    pub planned_time: Duration,
    pub completed_time: Duration,
    /// Completed share of resolved tasks, 0-100
    pub completion_rate: f64,
    pub delta: StatDelta,
    pub by_type: Vec<TypeStats>,
    pub outcomes: Vec<TaskOutcome>,
}

/// Calculate statistics for `date` from the templates active on its
/// weekday and the status history recorded for it
pub fn calculate_day_stats(
    templates: &[TaskTemplate],
    history: &TaskStatusHistory,
    catalog: &TaskTypeCatalog,
    date: NaiveDate,
) -> DayStats {
    let recorded: HashMap<&str, TaskStatus> = history
        .records_for(date)
        .map(|r| (r.template_id.as_str(), r.status))
        .collect();

    let mut planned: Vec<&TaskTemplate> = templates
        .iter()
        .filter(|t| t.is_active_on(date.weekday()))
        .collect();
    planned.sort_by_key(|t| t.start_time_of_day);

    let mut stats = DayStats {
        date,
        planned: planned.len(),
        completed: 0,
        failed: 0,
        skipped: 0,
        unrecorded: 0,
        planned_time: Duration::zero(),
        completed_time: Duration::zero(),
        completion_rate: 0.0,
        delta: StatDelta::default(),
        by_type: Vec::new(),
        outcomes: Vec::with_capacity(planned.len()),
    };
    let mut by_type: HashMap<TaskType, TypeStats> = HashMap::new();

    for template in planned {
        let status = recorded.get(template.id.as_str()).copied();
        let definition = catalog.definition(template.task_type);
        let entry = by_type.entry(template.task_type).or_insert(TypeStats {
            task_type: template.task_type,
            description: definition.map_or("", |d| d.description),
            planned: 0,
            completed: 0,
            failed: 0,
            planned_time: Duration::zero(),
            delta: StatDelta::default(),
        });
        entry.planned += 1;
        entry.planned_time = entry.planned_time + template.duration;
        stats.planned_time = stats.planned_time + template.duration;

        match status {
            Some(TaskStatus::Completed) => {
                stats.completed += 1;
                stats.completed_time = stats.completed_time + template.duration;
                entry.completed += 1;
                if let Some(definition) = definition {
                    entry.delta.apply(&definition.completion_rewards);
                    stats.delta.apply(&definition.completion_rewards);
                }
            }
            Some(TaskStatus::Failed) => {
                stats.failed += 1;
                entry.failed += 1;
                if let Some(definition) = definition {
                    entry.delta.apply(&definition.failure_penalties);
                    stats.delta.apply(&definition.failure_penalties);
                }
            }
            Some(_) => stats.skipped += 1,
            None => stats.unrecorded += 1,
        }

        stats.outcomes.push(TaskOutcome {
            name: template.name.clone(),
            task_type: template.task_type,
            start: template.start_time_of_day,
            end: template.end_time_of_day(),
            status,
        });
    }

    let resolved = stats.completed + stats.failed;
    if resolved > 0 {
        stats.completion_rate = stats.completed as f64 / resolved as f64 * 100.0;
    }

    stats.by_type = TaskType::all()
        .iter()
        .filter_map(|task_type| by_type.remove(task_type))
        .collect();

    stats
}
