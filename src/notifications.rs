//! Task reminders
//! Desktop delivery currently only implements macOS notifications

use chrono::NaiveDateTime;
use std::cell::RefCell;
use std::rc::Rc;
#[cfg(target_os = "macos")]
use std::process::Command;
use tracing::info;
use uuid::Uuid;

/// A reminder that a task instance is about to start
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reminder {
    pub instance_id: Uuid,
    pub title: String,
    pub fire_at: NaiveDateTime,
}

/// Schedules and cancels task reminders
pub trait NotificationPort {
    fn schedule(&mut self, reminder: Reminder, now: NaiveDateTime);
    fn cancel(&mut self, instance_id: Uuid);
    fn cancel_all(&mut self);
    /// Deliver reminders that are due; called from the tick
    fn poll_due(&mut self, _now: NaiveDateTime) {}
}

impl<T: NotificationPort> NotificationPort for Rc<RefCell<T>> {
    fn schedule(&mut self, reminder: Reminder, now: NaiveDateTime) {
        self.borrow_mut().schedule(reminder, now);
    }

    fn cancel(&mut self, instance_id: Uuid) {
        self.borrow_mut().cancel(instance_id);
    }

    fn cancel_all(&mut self) {
        self.borrow_mut().cancel_all();
    }

    fn poll_due(&mut self, now: NaiveDateTime) {
        self.borrow_mut().poll_due(now);
    }
}

/// In-memory reminder queue delivered as desktop notifications
#[derive(Debug, Default)]
pub struct ReminderQueue {
    pending: Vec<Reminder>,
    desktop: bool,
}

impl ReminderQueue {
    pub fn new(desktop: bool) -> Self {
        Self {
            pending: Vec::new(),
            desktop,
        }
    }

    #[cfg(test)]
    pub fn pending(&self) -> &[Reminder] {
        &self.pending
    }

    /// Remove and return reminders due at `now`
    fn take_due(&mut self, now: NaiveDateTime) -> Vec<Reminder> {
        let (due, rest): (Vec<_>, Vec<_>) = self.pending.drain(..).partition(|r| r.fire_at <= now);
        self.pending = rest;
        due
    }
}

impl NotificationPort for ReminderQueue {
    fn schedule(&mut self, reminder: Reminder, now: NaiveDateTime) {
        if reminder.fire_at < now {
            return;
        }
        self.pending.retain(|r| r.instance_id != reminder.instance_id);
        self.pending.push(reminder);
    }

    fn cancel(&mut self, instance_id: Uuid) {
        self.pending.retain(|r| r.instance_id != instance_id);
    }

    fn cancel_all(&mut self) {
        self.pending.clear();
    }

    fn poll_due(&mut self, now: NaiveDateTime) {
        for reminder in self.take_due(now) {
            info!(task = %reminder.title, "task starting");
            if self.desktop {
                notify_task_starting(&reminder.title);
            }
        }
    }
}

/// Send a notification when a task is about to start
pub fn notify_task_starting(task_title: &str) {
    #[cfg(target_os = "macos")]
    {
        let script = format!(
            r#"display notification "Your task '{}' is about to start." with title "Weekline - Upcoming Task""#,
            task_title.replace('"', "\\\"")
        );

        let _ = Command::new("osascript")
            .arg("-e")
            .arg(&script)
            .output();
    }

    #[cfg(not(target_os = "macos"))]
    {
        // No-op on other platforms
        let _ = task_title;
    }
}
