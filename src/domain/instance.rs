use super::enums::TaskStatus;
use super::template::TaskTemplate;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use uuid::Uuid;

/// A per-day materialization of a template (or a free-time slot)
#[derive(Debug, Clone)]
pub struct TaskInstance {
    /// Fresh on every regeneration, never persisted
    pub id: Uuid,
    pub template: TaskTemplate,
    pub status: TaskStatus,
    /// Set once the terminal reward/penalty has been applied for this day
    pub action_handled: bool,
}

impl TaskInstance {
    pub fn new(template: TaskTemplate) -> Self {
        Self {
            id: Uuid::new_v4(),
            template,
            status: TaskStatus::Pending,
            action_handled: false,
        }
    }

    pub fn is_free_time(&self) -> bool {
        self.template.is_free_time
    }

    pub fn template_id(&self) -> &str {
        &self.template.id
    }

    pub fn start_time_of_day(&self) -> Duration {
        self.template.start_time_of_day
    }

    pub fn end_time_of_day(&self) -> Duration {
        self.template.end_time_of_day()
    }

    /// Date-anchored [start, end) window
    pub fn window_on(&self, date: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
        let midnight = date.and_time(chrono::NaiveTime::MIN);
        (
            midnight + self.start_time_of_day(),
            midnight + self.end_time_of_day(),
        )
    }

    /// Restore status from history or a runtime snapshot without side effects
    pub fn apply_loaded_status(&mut self, status: TaskStatus, action_handled: bool) {
        self.status = status;
        self.action_handled = action_handled;
    }

    pub fn mark_action_handled(&mut self) {
        self.action_handled = true;
    }

    /// Pending -> InProgress
    pub fn start(&mut self) -> bool {
        self.transition(TaskStatus::Pending, TaskStatus::InProgress)
    }

    /// InProgress -> AwaitingConfirmation
    pub fn await_confirmation(&mut self) -> bool {
        self.transition(TaskStatus::InProgress, TaskStatus::AwaitingConfirmation)
    }

    /// InProgress | AwaitingConfirmation -> Completed
    pub fn complete(&mut self) -> bool {
        if self.is_free_time() || !self.status.is_active() {
            return false;
        }
        self.status = TaskStatus::Completed;
        true
    }

    /// Any non-terminal status -> Failed
    pub fn fail(&mut self) -> bool {
        if self.is_free_time() || self.status.is_terminal() {
            return false;
        }
        self.status = TaskStatus::Failed;
        true
    }

    fn transition(&mut self, from: TaskStatus, to: TaskStatus) -> bool {
        if self.is_free_time() || self.status != from {
            return false;
        }
        self.status = to;
        true
    }
}
