use crate::domain::TaskStatus;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A task that reached a handled state on a calendar date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStatusRecord {
    pub template_id: String,
    pub date: NaiveDate,
    pub status: TaskStatus,
}

/// Persisted per-date task outcomes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStatusHistory {
    #[serde(default)]
    pub records: Vec<TaskStatusRecord>,
}

impl TaskStatusHistory {
    pub fn records_for(&self, date: NaiveDate) -> impl Iterator<Item = &TaskStatusRecord> {
        self.records.iter().filter(move |r| r.date == date)
    }

    /// Replace every record for `date` with `records`
    pub fn replace_day(&mut self, date: NaiveDate, records: Vec<TaskStatusRecord>) {
        self.records.retain(|r| r.date != date);
        self.records.extend(records);
    }

    /// Drop records older than `cutoff`; returns how many were removed
    pub fn prune_before(&mut self, cutoff: NaiveDate) -> usize {
        let before = self.records.len();
        self.records.retain(|r| r.date >= cutoff);
        before - self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
