//! Weekly task scheduler.
//!
//! Owns the template store, the weekly instance cache and the status
//! history. Driven by an external pump calling [`Scheduler::tick`]; every
//! wall-clock comparison goes through the injected [`Clock`]. Mutations
//! are only possible through `&mut self`, so there is a single writer.

mod defaults;

pub use defaults::default_schedule;

use crate::config::AppConfig;
use crate::domain::{
    all_weekdays, check_placement, generate_day, is_slot_available, SlotError, TaskInstance,
    TaskStatus, TaskTemplate, TaskTypeCatalog,
};
use crate::events::{EventBus, SchedulerEvent, SubscriptionId};
use crate::notifications::{NotificationPort, Reminder};
use crate::persistence::{
    decode_templates, SaveStore, SaveStoreExt, TaskStatusHistory, TaskStatusRecord, TemplatesBlob,
    STATUS_SAVE_KEY, TEMPLATES_SAVE_KEY,
};
use crate::player::RewardSink;
use crate::ticker::Clock;
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use std::collections::HashMap;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Collaborators handed to the scheduler at construction
pub struct SchedulerDeps {
    pub store: Box<dyn SaveStore>,
    pub rewards: Box<dyn RewardSink>,
    pub notifier: Box<dyn NotificationPort>,
    pub clock: Box<dyn Clock>,
    pub catalog: TaskTypeCatalog,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Completed,
    Failed,
}

/// Today's runtime status for one template, carried across regeneration
struct RuntimeState {
    template_id: String,
    status: TaskStatus,
    action_handled: bool,
}

pub struct Scheduler {
    store: Box<dyn SaveStore>,
    rewards: Box<dyn RewardSink>,
    notifier: Box<dyn NotificationPort>,
    clock: Box<dyn Clock>,
    catalog: TaskTypeCatalog,
    config: AppConfig,
    templates: Vec<TaskTemplate>,
    weekly: HashMap<Weekday, Vec<TaskInstance>>,
    history: TaskStatusHistory,
    /// Calendar date the weekly cache was generated for
    last_day_generated: Option<NaiveDate>,
    events: EventBus,
}

impl Scheduler {
    pub fn new(deps: SchedulerDeps, config: AppConfig) -> Self {
        Self {
            store: deps.store,
            rewards: deps.rewards,
            notifier: deps.notifier,
            clock: deps.clock,
            catalog: deps.catalog,
            config,
            templates: Vec::new(),
            weekly: HashMap::new(),
            history: TaskStatusHistory::default(),
            last_day_generated: None,
            events: EventBus::new(),
        }
    }

    /// Load saved state and build the week. Returns true for a new user.
    pub fn initialize(&mut self) -> bool {
        let is_new_user = self.load_data();
        let now = self.clock.now();

        self.regenerate_all(now.date());
        self.apply_saved_statuses();
        if is_new_user {
            self.forgive_past_tasks(now);
        }
        self.schedule_all_notifications(now);

        info!(
            templates = self.templates.len(),
            date = %now.date(),
            new_user = is_new_user,
            "scheduler initialized"
        );
        is_new_user
    }

    /// Persist templates and today's history
    pub fn shutdown(&mut self) {
        self.save_templates();
        self.save_history();
        debug!("scheduler state saved");
    }

    pub fn subscribe(&mut self, callback: impl FnMut(&SchedulerEvent) + 'static) -> SubscriptionId {
        self.events.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    pub fn templates(&self) -> &[TaskTemplate] {
        &self.templates
    }

    pub fn catalog(&self) -> &TaskTypeCatalog {
        &self.catalog
    }

    pub fn history(&self) -> &TaskStatusHistory {
        &self.history
    }

    /// The calendar date the cache currently represents
    pub fn today(&self) -> NaiveDate {
        self.last_day_generated
            .unwrap_or_else(|| self.clock.now().date())
    }

    /// Validate a template against the current store
    pub fn check_template(&self, template: &TaskTemplate, exclude_id: Option<&str>) -> Result<(), SlotError> {
        check_placement(&self.templates, template, exclude_id)
    }

    pub fn is_slot_available(
        &self,
        day: Weekday,
        start: Duration,
        end: Duration,
        exclude_id: Option<&str>,
    ) -> bool {
        is_slot_available(&self.templates, day, start, end, exclude_id)
    }

    pub fn add_task(&mut self, template: TaskTemplate) -> bool {
        if let Err(e) = self.check_template(&template, None) {
            warn!(name = %template.name, error = %e, "rejected new task");
            return false;
        }
        if self.templates.iter().any(|t| t.id == template.id) {
            warn!(id = %template.id, "rejected new task with duplicate id");
            return false;
        }

        info!(id = %template.id, name = %template.name, "task added");
        self.templates.push(template);
        self.after_template_change();
        true
    }

    pub fn update_task(&mut self, template: TaskTemplate) -> bool {
        let Some(index) = self.templates.iter().position(|t| t.id == template.id) else {
            warn!(id = %template.id, "update for unknown task");
            return false;
        };
        if let Err(e) = self.check_template(&template, Some(&template.id)) {
            warn!(name = %template.name, error = %e, "rejected task update");
            return false;
        }

        info!(id = %template.id, name = %template.name, "task updated");
        self.templates[index] = template;
        self.after_template_change();
        true
    }

    /// Remove a template; returns false if the id is unknown
    pub fn remove_task(&mut self, template_id: &str) -> bool {
        let Some(index) = self.templates.iter().position(|t| t.id == template_id) else {
            return false;
        };

        let instance_ids: Vec<Uuid> = self
            .weekly
            .values()
            .flatten()
            .filter(|t| t.template_id() == template_id)
            .map(|t| t.id)
            .collect();
        for id in instance_ids {
            self.notifier.cancel(id);
        }

        let removed = self.templates.remove(index);
        info!(id = %removed.id, name = %removed.name, "task removed");
        self.after_template_change();
        true
    }

    /// Cached timeline for a weekday; empty if not generated
    pub fn tasks_for_day(&self, day: Weekday) -> &[TaskInstance] {
        self.weekly.get(&day).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn instance(&self, instance_id: Uuid) -> Option<&TaskInstance> {
        self.weekly.values().flatten().find(|t| t.id == instance_id)
    }

    /// Today's instance of a template
    pub fn find_today_instance(&self, template_id: &str) -> Option<&TaskInstance> {
        self.tasks_for_day(self.today().weekday())
            .iter()
            .find(|t| !t.is_free_time() && t.template_id() == template_id)
    }

    /// The active task today, otherwise the earliest upcoming pending one
    /// within the next seven days
    pub fn current_or_next_task(&self) -> Option<&TaskInstance> {
        let date = self.today();
        let today = self.tasks_for_day(date.weekday());

        if let Some(active) = today
            .iter()
            .find(|t| !t.is_free_time() && t.status.is_active())
        {
            return Some(active);
        }

        let now_offset = self.clock.now().time().signed_duration_since(NaiveTime::MIN);
        (0..7).find_map(|offset| {
            let day = (date + Duration::days(offset)).weekday();
            self.tasks_for_day(day).iter().find(|t| {
                !t.is_free_time()
                    && t.status == TaskStatus::Pending
                    && (offset > 0 || t.start_time_of_day() > now_offset)
            })
        })
    }

    /// Confirm an active task for today; rewards apply once
    pub fn complete_task(&mut self, instance_id: Uuid) -> bool {
        self.resolve(instance_id, Outcome::Completed)
    }

    /// Fail a non-terminal task for today; penalties apply once
    pub fn fail_task(&mut self, instance_id: Uuid) -> bool {
        self.resolve(instance_id, Outcome::Failed)
    }

    /// Periodic tracking: roll over the week on a new date, then advance
    /// today's instances against the clock
    pub fn tick(&mut self) {
        let now = self.clock.now();

        // Settle the outgoing day first; hold the rollover while one of its
        // tasks is still inside its grace period
        if self.last_day_generated.is_some_and(|d| d < now.date()) {
            self.evaluate_today(now);
            if self.has_tasks_in_grace(now) {
                self.notifier.poll_due(now);
                return;
            }
        }

        if self.last_day_generated != Some(now.date()) {
            info!(date = %now.date(), "new day, regenerating week");
            self.save_history();
            self.regenerate_all(now.date());
            self.apply_saved_statuses();
            self.schedule_all_notifications(now);
            self.events.emit(&SchedulerEvent::TaskListUpdated);
        }

        self.evaluate_today(now);
        self.notifier.poll_due(now);
    }

    fn evaluate_today(&mut self, now: NaiveDateTime) {
        let date = self.today();
        let grace = self.config.grace_period();
        let mut expired = Vec::new();

        let Some(list) = self.weekly.get_mut(&date.weekday()) else {
            return;
        };

        for instance in list
            .iter_mut()
            .filter(|t| !t.is_free_time() && !t.action_handled)
        {
            let (start, end) = instance.window_on(date);
            if now >= end + grace {
                if !instance.status.is_terminal() {
                    expired.push(instance.id);
                }
                continue;
            }

            // A late tick can pass several boundaries at once
            if now >= start && instance.start() {
                debug!(task = %instance.template.name, "task started");
                self.events.emit(&state_changed(instance));
            }
            if now >= end && instance.await_confirmation() {
                debug!(task = %instance.template.name, "task awaiting confirmation");
                self.events.emit(&state_changed(instance));
            }
        }

        for id in expired {
            self.resolve(id, Outcome::Failed);
        }
    }

    /// Unhandled tasks of the cached day whose grace has not run out
    fn has_tasks_in_grace(&self, now: NaiveDateTime) -> bool {
        let date = self.today();
        let grace = self.config.grace_period();
        self.tasks_for_day(date.weekday()).iter().any(|t| {
            !t.is_free_time()
                && !t.action_handled
                && !t.status.is_terminal()
                && now < t.window_on(date).1 + grace
        })
    }

    fn resolve(&mut self, instance_id: Uuid, outcome: Outcome) -> bool {
        let weekday = self.today().weekday();
        let Some(instance) = self
            .weekly
            .get_mut(&weekday)
            .and_then(|list| list.iter_mut().find(|t| t.id == instance_id))
        else {
            return false;
        };
        if instance.is_free_time() || instance.action_handled {
            return false;
        }

        let changed = match outcome {
            Outcome::Completed => instance.complete(),
            Outcome::Failed => instance.fail(),
        };
        if !changed {
            return false;
        }
        instance.mark_action_handled();
        let event = state_changed(instance);
        let task_type = instance.template.task_type;
        info!(task = %instance.template.name, status = instance.status.to_tag(), "task resolved");

        self.notifier.cancel(instance_id);
        if let Some(definition) = self.catalog.definition(task_type) {
            let points = match outcome {
                Outcome::Completed => &definition.completion_rewards,
                Outcome::Failed => &definition.failure_penalties,
            };
            for point in points {
                self.rewards.add_stat(point.reward_type, point.amount);
            }
        } else {
            warn!(task_type = task_type.name(), "no reward definition");
        }

        self.events.emit(&event);
        self.save_history();
        true
    }

    fn after_template_change(&mut self) {
        self.regenerate_with_state_preservation();
        let now = self.clock.now();
        self.schedule_all_notifications(now);
        self.save_templates();
        self.events.emit(&SchedulerEvent::TaskListUpdated);
    }

    fn regenerate_all(&mut self, date: NaiveDate) {
        let min_gap = self.config.min_gap();
        self.weekly = all_weekdays()
            .into_iter()
            .map(|day| (day, generate_day(&self.templates, day, min_gap)))
            .collect();
        self.last_day_generated = Some(date);
    }

    fn regenerate_with_state_preservation(&mut self) {
        let date = self.today();
        let snapshot: Vec<RuntimeState> = self
            .tasks_for_day(date.weekday())
            .iter()
            .filter(|t| !t.is_free_time())
            .map(|t| RuntimeState {
                template_id: t.template_id().to_string(),
                status: t.status,
                action_handled: t.action_handled,
            })
            .collect();

        self.regenerate_all(date);
        self.apply_saved_statuses();

        if let Some(list) = self.weekly.get_mut(&date.weekday()) {
            for state in snapshot {
                if let Some(instance) = list.iter_mut().find(|t| t.template_id() == state.template_id) {
                    instance.apply_loaded_status(state.status, state.action_handled);
                }
            }
        }
    }

    /// Restore today's handled statuses from history
    fn apply_saved_statuses(&mut self) {
        let date = self.today();
        let Some(list) = self.weekly.get_mut(&date.weekday()) else {
            return;
        };
        for record in self.history.records_for(date) {
            if let Some(instance) = list
                .iter_mut()
                .find(|t| !t.is_free_time() && t.template_id() == record.template_id)
            {
                instance.apply_loaded_status(record.status, true);
            }
        }
    }

    /// A first run should not penalize tasks that ended before it started
    fn forgive_past_tasks(&mut self, now: NaiveDateTime) {
        let date = self.today();
        let now_offset = now.time().signed_duration_since(NaiveTime::MIN);
        let mut forgiven = 0;

        if let Some(list) = self.weekly.get_mut(&date.weekday()) {
            for instance in list
                .iter_mut()
                .filter(|t| !t.is_free_time() && t.end_time_of_day() < now_offset)
            {
                instance.mark_action_handled();
                forgiven += 1;
            }
        }

        if forgiven > 0 {
            info!(count = forgiven, "skipped tasks that ended before first run");
            self.save_history();
        }
    }

    fn schedule_all_notifications(&mut self, now: NaiveDateTime) {
        self.notifier.cancel_all();
        let date = self.today();

        for offset in 0..7 {
            let day_date = date + Duration::days(offset);
            let Some(list) = self.weekly.get(&day_date.weekday()) else {
                continue;
            };
            for instance in list
                .iter()
                .filter(|t| !t.is_free_time() && t.status == TaskStatus::Pending)
            {
                let reminder = Reminder {
                    instance_id: instance.id,
                    title: instance.template.name.clone(),
                    fire_at: instance.window_on(day_date).0,
                };
                self.notifier.schedule(reminder, now);
            }
        }
    }

    /// Returns true when no templates were stored
    fn load_data(&mut self) -> bool {
        self.history = match self.store.load(STATUS_SAVE_KEY, TaskStatusHistory::default()) {
            Ok(history) => history,
            Err(e) => {
                warn!(error = %e, "failed to load status history, starting empty");
                TaskStatusHistory::default()
            }
        };

        let raw = match self.store.load_string(TEMPLATES_SAVE_KEY) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "failed to read task templates");
                None
            }
        };
        let loaded = match raw.as_deref().map(decode_templates) {
            Some(Ok(templates)) => templates,
            Some(Err(e)) => {
                warn!(error = %e, "failed to decode task templates, starting empty");
                Vec::new()
            }
            None => Vec::new(),
        };
        self.templates = accept_loaded(loaded);

        if !self.templates.is_empty() {
            return false;
        }
        if self.config.seed_default_schedule {
            self.templates = default_schedule();
            info!(count = self.templates.len(), "seeded default schedule");
            self.save_templates();
        }
        true
    }

    fn save_templates(&mut self) {
        let blob = TemplatesBlob {
            task_templates: &self.templates,
        };
        if let Err(e) = self.store.save(TEMPLATES_SAVE_KEY, &blob) {
            warn!(error = %e, "failed to save task templates");
        }
    }

    /// Rewrite today's handled records and persist the history.
    ///
    /// Records of stored templates that were moved off today are kept, so
    /// moving one back restores its handled state.
    fn save_history(&mut self) {
        let Some(date) = self.last_day_generated else {
            return;
        };
        let today = self.tasks_for_day(date.weekday());
        let mut records: Vec<TaskStatusRecord> = self
            .history
            .records_for(date)
            .filter(|r| {
                self.templates.iter().any(|t| t.id == r.template_id)
                    && !today
                        .iter()
                        .any(|t| !t.is_free_time() && t.template_id() == r.template_id)
            })
            .cloned()
            .collect();
        records.extend(
            today
                .iter()
                .filter(|t| !t.is_free_time() && t.action_handled)
                .map(|t| TaskStatusRecord {
                    template_id: t.template_id().to_string(),
                    date,
                    status: t.status,
                }),
        );

        self.history.replace_day(date, records);
        let pruned = self
            .history
            .prune_before(date - Duration::days(self.config.history_retention_days));
        if pruned > 0 {
            debug!(pruned, "pruned old status history");
        }

        if let Err(e) = self.store.save(STATUS_SAVE_KEY, &self.history) {
            warn!(error = %e, "failed to save status history");
        }
    }
}

fn state_changed(instance: &TaskInstance) -> SchedulerEvent {
    SchedulerEvent::TaskStateChanged {
        instance_id: instance.id,
        template_id: instance.template_id().to_string(),
        status: instance.status,
    }
}

/// Drop stored templates that are invalid, duplicated or overlapping
fn accept_loaded(loaded: Vec<TaskTemplate>) -> Vec<TaskTemplate> {
    let mut accepted: Vec<TaskTemplate> = Vec::with_capacity(loaded.len());
    for template in loaded {
        if accepted.iter().any(|t| t.id == template.id) {
            warn!(id = %template.id, "dropping stored task with duplicate id");
            continue;
        }
        match check_placement(&accepted, &template, None) {
            Ok(()) => accepted.push(template),
            Err(e) => warn!(id = %template.id, name = %template.name, error = %e, "dropping stored task"),
        }
    }
    accepted
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("templates", &self.templates.len())
            .field("last_day_generated", &self.last_day_generated)
            .field("events", &self.events)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{RewardType, TaskType};
    use crate::notifications::ReminderQueue;
    use crate::persistence::MemoryStore;
    use crate::ticker::FixedClock;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// 2024-01-08 is a Monday
    fn monday_at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 8)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn minutes(m: i64) -> Duration {
        Duration::minutes(m)
    }

    fn work(name: &str, days: Vec<Weekday>, start_min: i64, len_min: i64) -> TaskTemplate {
        TaskTemplate::new(
            name.to_string(),
            TaskType::WorkAndStudy,
            days,
            minutes(start_min),
            minutes(len_min),
        )
    }

    #[derive(Default)]
    struct RecordingSink {
        changes: Vec<(RewardType, i32)>,
    }

    impl RewardSink for RecordingSink {
        fn add_stat(&mut self, reward_type: RewardType, amount: i32) {
            self.changes.push((reward_type, amount));
        }
    }

    struct Harness {
        scheduler: Scheduler,
        store: MemoryStore,
        clock: FixedClock,
        sink: Rc<RefCell<RecordingSink>>,
        reminders: Rc<RefCell<ReminderQueue>>,
        events: Rc<RefCell<Vec<SchedulerEvent>>>,
    }

    fn config() -> AppConfig {
        AppConfig {
            seed_default_schedule: false,
            ..AppConfig::default()
        }
    }

    fn harness_with(store: MemoryStore, now: NaiveDateTime, config: AppConfig) -> Harness {
        let clock = FixedClock::new(now);
        let sink = Rc::new(RefCell::new(RecordingSink::default()));
        let reminders = Rc::new(RefCell::new(ReminderQueue::new(false)));
        let deps = SchedulerDeps {
            store: Box::new(store.clone()),
            rewards: Box::new(Rc::clone(&sink)),
            notifier: Box::new(Rc::clone(&reminders)),
            clock: Box::new(clock.clone()),
            catalog: TaskTypeCatalog::default(),
        };
        let mut scheduler = Scheduler::new(deps, config);
        let events = Rc::new(RefCell::new(Vec::new()));
        let seen = Rc::clone(&events);
        scheduler.subscribe(move |event| seen.borrow_mut().push(event.clone()));

        Harness {
            scheduler,
            store,
            clock,
            sink,
            reminders,
            events,
        }
    }

    /// Existing user whose store already holds `templates`
    fn returning_user(templates: &[TaskTemplate], now: NaiveDateTime) -> Harness {
        let mut store = MemoryStore::new();
        store
            .save(TEMPLATES_SAVE_KEY, &TemplatesBlob { task_templates: templates })
            .unwrap();
        let mut h = harness_with(store, now, config());
        assert!(!h.scheduler.initialize());
        h
    }

    fn count_list_updates(events: &[SchedulerEvent]) -> usize {
        events
            .iter()
            .filter(|e| matches!(e, SchedulerEvent::TaskListUpdated))
            .count()
    }

    fn today_status(h: &Harness, template_id: &str) -> (TaskStatus, bool) {
        let instance = h.scheduler.find_today_instance(template_id).unwrap();
        (instance.status, instance.action_handled)
    }

    #[test]
    fn test_single_template_tiles_monday() {
        let template = work("Standup", vec![Weekday::Mon], 9 * 60, 60);
        let h = returning_user(&[template], monday_at(6, 0));

        let monday = h.scheduler.tasks_for_day(Weekday::Mon);
        let spans: Vec<_> = monday
            .iter()
            .map(|t| (t.start_time_of_day().num_minutes(), t.end_time_of_day().num_minutes(), t.is_free_time()))
            .collect();
        assert_eq!(spans, vec![(0, 540, true), (540, 600, false), (600, 1440, true)]);

        let tuesday = h.scheduler.tasks_for_day(Weekday::Tue);
        assert_eq!(tuesday.len(), 1);
        assert!(tuesday[0].is_free_time());
    }

    #[test]
    fn test_tasks_for_day_empty_before_initialize() {
        let h = harness_with(MemoryStore::new(), monday_at(6, 0), config());
        assert!(h.scheduler.tasks_for_day(Weekday::Mon).is_empty());
    }

    #[test]
    fn test_tick_past_grace_fails_and_penalizes_once() {
        let template = work("Deep work", vec![Weekday::Mon], 9 * 60, 60);
        let id = template.id.clone();
        let mut h = returning_user(&[template], monday_at(10, 31));

        h.scheduler.tick();
        assert_eq!(today_status(&h, &id), (TaskStatus::Failed, true));
        assert_eq!(h.sink.borrow().changes, vec![(RewardType::Intelligence, -1)]);

        h.clock.advance(minutes(5));
        h.scheduler.tick();
        assert_eq!(h.sink.borrow().changes.len(), 1);
    }

    #[test]
    fn test_tick_within_grace_awaits_then_completes() {
        let template = work("Deep work", vec![Weekday::Mon], 9 * 60, 60);
        let id = template.id.clone();
        let mut h = returning_user(&[template], monday_at(10, 10));

        h.scheduler.tick();
        assert_eq!(today_status(&h, &id).0, TaskStatus::AwaitingConfirmation);

        let instance_id = h.scheduler.find_today_instance(&id).unwrap().id;
        assert!(h.scheduler.complete_task(instance_id));
        assert_eq!(today_status(&h, &id), (TaskStatus::Completed, true));
        assert_eq!(h.sink.borrow().changes, vec![(RewardType::Intelligence, 1)]);
    }

    #[test]
    fn test_complete_twice_rewards_once() {
        let template = work("Deep work", vec![Weekday::Mon], 9 * 60, 60);
        let id = template.id.clone();
        let mut h = returning_user(&[template], monday_at(9, 15));

        h.scheduler.tick();
        let instance_id = h.scheduler.find_today_instance(&id).unwrap().id;
        assert!(h.scheduler.complete_task(instance_id));
        assert!(!h.scheduler.complete_task(instance_id));
        assert!(!h.scheduler.fail_task(instance_id));
        assert_eq!(h.sink.borrow().changes.len(), 1);
    }

    #[test]
    fn test_state_machine_walks_through_day() {
        let template = work("Deep work", vec![Weekday::Mon], 9 * 60, 60);
        let id = template.id.clone();
        let mut h = returning_user(&[template], monday_at(8, 59));

        h.scheduler.tick();
        assert_eq!(today_status(&h, &id).0, TaskStatus::Pending);

        h.clock.set(monday_at(9, 0));
        h.scheduler.tick();
        assert_eq!(today_status(&h, &id).0, TaskStatus::InProgress);

        h.clock.set(monday_at(10, 0));
        h.scheduler.tick();
        assert_eq!(today_status(&h, &id).0, TaskStatus::AwaitingConfirmation);

        h.clock.set(monday_at(10, 30));
        h.scheduler.tick();
        assert_eq!(today_status(&h, &id), (TaskStatus::Failed, true));

        let changes: Vec<TaskStatus> = h
            .events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                SchedulerEvent::TaskStateChanged { status, .. } => Some(*status),
                SchedulerEvent::TaskListUpdated => None,
            })
            .collect();
        assert_eq!(
            changes,
            vec![TaskStatus::InProgress, TaskStatus::AwaitingConfirmation, TaskStatus::Failed]
        );
    }

    #[test]
    fn test_complete_rejected_while_pending() {
        let template = work("Deep work", vec![Weekday::Mon], 9 * 60, 60);
        let id = template.id.clone();
        let mut h = returning_user(&[template], monday_at(8, 0));

        h.scheduler.tick();
        let instance_id = h.scheduler.find_today_instance(&id).unwrap().id;
        assert!(!h.scheduler.complete_task(instance_id));

        assert!(h.scheduler.fail_task(instance_id));
        assert_eq!(today_status(&h, &id), (TaskStatus::Failed, true));
        assert_eq!(h.sink.borrow().changes, vec![(RewardType::Intelligence, -1)]);
    }

    #[test]
    fn test_actions_ignore_free_time_and_other_days() {
        let template = work("Deep work", vec![Weekday::Mon, Weekday::Tue], 9 * 60, 60);
        let mut h = returning_user(&[template], monday_at(9, 30));
        h.scheduler.tick();

        let free_id = h.scheduler.tasks_for_day(Weekday::Mon)[0].id;
        assert!(!h.scheduler.fail_task(free_id));

        let tuesday_id = h
            .scheduler
            .tasks_for_day(Weekday::Tue)
            .iter()
            .find(|t| !t.is_free_time())
            .unwrap()
            .id;
        assert!(!h.scheduler.fail_task(tuesday_id));
        assert!(!h.scheduler.fail_task(Uuid::new_v4()));
        assert!(h.sink.borrow().changes.is_empty());
    }

    #[test]
    fn test_overlapping_add_is_rejected() {
        let existing = work("Deep work", vec![Weekday::Mon], 9 * 60, 60);
        let mut h = returning_user(&[existing], monday_at(6, 0));
        let stored_before = h.store.load_string(TEMPLATES_SAVE_KEY).unwrap();
        h.events.borrow_mut().clear();

        let overlapping = work("Meeting", vec![Weekday::Wed, Weekday::Mon], 9 * 60 + 30, 60);
        assert!(!h.scheduler.add_task(overlapping.clone()));
        assert!(matches!(
            h.scheduler.check_template(&overlapping, None),
            Err(SlotError::Conflict { day: Weekday::Mon, .. })
        ));

        assert_eq!(h.scheduler.templates().len(), 1);
        assert_eq!(h.store.load_string(TEMPLATES_SAVE_KEY).unwrap(), stored_before);
        assert!(h.events.borrow().is_empty());
    }

    #[test]
    fn test_touching_windows_are_accepted() {
        let existing = work("Deep work", vec![Weekday::Mon], 9 * 60, 60);
        let mut h = returning_user(&[existing], monday_at(6, 0));

        assert!(h.scheduler.add_task(work("Review", vec![Weekday::Mon], 10 * 60, 30)));
        assert_eq!(h.scheduler.templates().len(), 2);
        assert_eq!(count_list_updates(&h.events.borrow()), 1);
        assert!(h.scheduler.is_slot_available(Weekday::Mon, minutes(8 * 60), minutes(9 * 60), None));
        assert!(!h.scheduler.is_slot_available(Weekday::Mon, minutes(10 * 60), minutes(11 * 60), None));
    }

    #[test]
    fn test_invalid_templates_are_rejected() {
        let mut h = harness_with(MemoryStore::new(), monday_at(6, 0), config());
        h.scheduler.initialize();
        assert!(!h.scheduler.add_task(work("Nowhere", Vec::new(), 60, 30)));
        assert!(!h.scheduler.add_task(work("Past midnight", vec![Weekday::Mon], 23 * 60, 120)));
        assert!(!h.scheduler.add_task(work("Empty", vec![Weekday::Mon], 60, 0)));
        assert!(h.scheduler.templates().is_empty());
    }

    #[test]
    fn test_regeneration_preserves_in_flight_state() {
        let focus = work("Focus", vec![Weekday::Mon], 9 * 60, 60);
        let done = work("Early run", vec![Weekday::Mon], 7 * 60, 30);
        let focus_id = focus.id.clone();
        let done_id = done.id.clone();
        let mut h = returning_user(&[focus, done], monday_at(7, 10));

        h.scheduler.tick();
        let run_instance = h.scheduler.find_today_instance(&done_id).unwrap().id;
        assert!(h.scheduler.complete_task(run_instance));

        h.clock.set(monday_at(9, 30));
        h.scheduler.tick();
        assert_eq!(today_status(&h, &focus_id), (TaskStatus::InProgress, false));

        assert!(h.scheduler.add_task(work("Afternoon", vec![Weekday::Mon], 14 * 60, 60)));
        assert_eq!(today_status(&h, &focus_id), (TaskStatus::InProgress, false));
        assert_eq!(today_status(&h, &done_id), (TaskStatus::Completed, true));
        assert_eq!(h.sink.borrow().changes.len(), 1);
    }

    #[test]
    fn test_update_replaces_by_id() {
        let template = work("Focus", vec![Weekday::Mon], 9 * 60, 60);
        let neighbour = work("Gym", vec![Weekday::Mon], 11 * 60, 60);
        let mut h = returning_user(&[template.clone(), neighbour], monday_at(6, 0));

        let mut moved = template.clone();
        moved.start_time_of_day = minutes(9 * 60 + 30);
        assert!(h.scheduler.update_task(moved));
        assert_eq!(h.scheduler.templates()[0].start_time_of_day, minutes(9 * 60 + 30));

        let mut clash = template.clone();
        clash.start_time_of_day = minutes(10 * 60 + 30);
        assert!(!h.scheduler.update_task(clash));

        let unknown = work("Ghost", vec![Weekday::Sun], 60, 30);
        assert!(!h.scheduler.update_task(unknown));
        assert_eq!(h.scheduler.templates().len(), 2);
    }

    #[test]
    fn test_remove_task_cancels_reminders() {
        let keep = work("Focus", vec![Weekday::Mon], 9 * 60, 60);
        let gym = work("Gym", all_weekdays().to_vec(), 18 * 60, 60);
        let drop_id = gym.id.clone();
        let mut h = returning_user(&[keep, gym], monday_at(6, 0));
        // Focus today plus Gym on every day of the coming week
        assert_eq!(h.reminders.borrow().pending().len(), 8);

        assert!(h.scheduler.remove_task(&drop_id));
        assert!(!h.scheduler.remove_task(&drop_id));
        assert_eq!(h.scheduler.templates().len(), 1);
        assert!(h.scheduler.find_today_instance(&drop_id).is_none());
        let pending = h.reminders.borrow();
        assert_eq!(pending.pending().len(), 1);
        assert_eq!(pending.pending()[0].title, "Focus");
    }

    #[test]
    fn test_reminders_fire_on_their_own_date() {
        let gym = work("Gym", vec![Weekday::Wed], 18 * 60, 60);
        let h = returning_user(&[gym], monday_at(6, 0));

        let pending = h.reminders.borrow();
        assert_eq!(pending.pending().len(), 1);
        assert_eq!(
            pending.pending()[0].fire_at,
            NaiveDate::from_ymd_opt(2024, 1, 10).unwrap().and_hms_opt(18, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_restart_restores_today_without_reapplying_rewards() {
        let template = work("Deep work", vec![Weekday::Mon], 9 * 60, 60);
        let id = template.id.clone();
        let mut h = returning_user(&[template], monday_at(9, 30));
        h.scheduler.tick();
        let instance_id = h.scheduler.find_today_instance(&id).unwrap().id;
        assert!(h.scheduler.complete_task(instance_id));
        h.scheduler.shutdown();

        let mut restarted = harness_with(h.store.clone(), monday_at(11, 0), config());
        assert!(!restarted.scheduler.initialize());
        restarted.scheduler.tick();
        assert_eq!(today_status(&restarted, &id), (TaskStatus::Completed, true));
        assert!(restarted.sink.borrow().changes.is_empty());
    }

    #[test]
    fn test_saved_templates_round_trip() {
        let mut template = work("Odd timing", vec![Weekday::Fri, Weekday::Mon], 0, 1);
        template.start_time_of_day = Duration::nanoseconds(123_456_700);
        template.duration = Duration::nanoseconds(5_400_000_000_100);
        template.color = "#00ff00".to_string();
        let mut h = returning_user(&[template.clone()], monday_at(6, 0));
        h.scheduler.shutdown();

        let mut restarted = harness_with(h.store.clone(), monday_at(6, 0), config());
        restarted.scheduler.initialize();
        assert_eq!(restarted.scheduler.templates(), &[template]);
    }

    #[test]
    fn test_day_rollover_regenerates_week() {
        let template = work("Deep work", all_weekdays().to_vec(), 9 * 60, 60);
        let id = template.id.clone();
        let mut h = returning_user(&[template], monday_at(9, 30));
        h.scheduler.tick();
        let instance_id = h.scheduler.find_today_instance(&id).unwrap().id;
        assert!(h.scheduler.complete_task(instance_id));
        h.events.borrow_mut().clear();

        h.clock.set(monday_at(6, 0) + Duration::days(1));
        h.scheduler.tick();

        assert_eq!(h.scheduler.today(), NaiveDate::from_ymd_opt(2024, 1, 9).unwrap());
        assert_eq!(today_status(&h, &id), (TaskStatus::Pending, false));
        assert_eq!(count_list_updates(&h.events.borrow()), 1);

        let monday = NaiveDate::from_ymd_opt(2024, 1, 8).unwrap();
        let records: Vec<_> = h.scheduler.history().records_for(monday).collect();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, TaskStatus::Completed);
    }

    #[test]
    fn test_moving_task_off_today_and_back_keeps_it_handled() {
        let template = work("Deep work", vec![Weekday::Mon], 9 * 60, 60);
        let id = template.id.clone();
        let mut h = returning_user(&[template.clone()], monday_at(9, 30));
        h.scheduler.tick();
        let instance_id = h.scheduler.find_today_instance(&id).unwrap().id;
        assert!(h.scheduler.complete_task(instance_id));

        let mut away = template.clone();
        away.recurrence_days = vec![Weekday::Tue];
        assert!(h.scheduler.update_task(away));
        assert!(h.scheduler.find_today_instance(&id).is_none());
        h.scheduler.shutdown();

        assert!(h.scheduler.update_task(template));
        h.scheduler.tick();
        assert_eq!(today_status(&h, &id), (TaskStatus::Completed, true));

        let instance_id = h.scheduler.find_today_instance(&id).unwrap().id;
        assert!(!h.scheduler.complete_task(instance_id));
        assert_eq!(h.sink.borrow().changes, vec![(RewardType::Intelligence, 1)]);
    }

    #[test]
    fn test_removed_task_drops_its_history_record() {
        let template = work("Deep work", vec![Weekday::Mon], 9 * 60, 60);
        let id = template.id.clone();
        let mut h = returning_user(&[template], monday_at(9, 30));
        h.scheduler.tick();
        let instance_id = h.scheduler.find_today_instance(&id).unwrap().id;
        assert!(h.scheduler.complete_task(instance_id));

        assert!(h.scheduler.remove_task(&id));
        h.scheduler.shutdown();
        assert!(h.scheduler.history().is_empty());
    }

    fn night_sleep() -> TaskTemplate {
        TaskTemplate::new(
            "Sleep".to_string(),
            TaskType::Sleep,
            all_weekdays().to_vec(),
            Duration::hours(23),
            Duration::hours(1),
        )
    }

    #[test]
    fn test_task_ending_at_midnight_fails_after_grace() {
        let sleep = night_sleep();
        let id = sleep.id.clone();
        let mut h = returning_user(&[sleep], monday_at(23, 30));
        h.scheduler.tick();
        assert_eq!(today_status(&h, &id), (TaskStatus::InProgress, false));

        // Still inside the grace period: the day is held open
        h.clock.set(monday_at(0, 10) + Duration::days(1));
        h.scheduler.tick();
        let monday = NaiveDate::from_ymd_opt(2024, 1, 8).unwrap();
        assert_eq!(h.scheduler.today(), monday);
        assert_eq!(today_status(&h, &id), (TaskStatus::AwaitingConfirmation, false));
        assert!(h.sink.borrow().changes.is_empty());

        h.clock.set(monday_at(0, 31) + Duration::days(1));
        h.scheduler.tick();
        assert_eq!(
            h.sink.borrow().changes,
            vec![(RewardType::Health, -1), (RewardType::Strength, -1)]
        );
        let records: Vec<_> = h.scheduler.history().records_for(monday).collect();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, TaskStatus::Failed);

        assert_eq!(h.scheduler.today(), NaiveDate::from_ymd_opt(2024, 1, 9).unwrap());
        assert_eq!(today_status(&h, &id), (TaskStatus::Pending, false));
    }

    #[test]
    fn test_task_ending_at_midnight_confirmed_in_grace() {
        let sleep = night_sleep();
        let id = sleep.id.clone();
        let mut h = returning_user(&[sleep], monday_at(23, 30));
        h.scheduler.tick();

        h.clock.set(monday_at(0, 10) + Duration::days(1));
        h.scheduler.tick();
        let instance_id = h.scheduler.find_today_instance(&id).unwrap().id;
        assert!(h.scheduler.complete_task(instance_id));
        assert_eq!(h.sink.borrow().changes, vec![(RewardType::Health, 2)]);

        h.clock.set(monday_at(0, 15) + Duration::days(1));
        h.scheduler.tick();
        assert_eq!(h.scheduler.today(), NaiveDate::from_ymd_opt(2024, 1, 9).unwrap());
        assert_eq!(h.sink.borrow().changes.len(), 1);
    }

    #[test]
    fn test_history_is_pruned_by_retention() {
        let template = work("Deep work", all_weekdays().to_vec(), 9 * 60, 60);
        let id = template.id.clone();
        let retention = AppConfig {
            history_retention_days: 2,
            ..config()
        };
        let mut store = MemoryStore::new();
        store
            .save(TEMPLATES_SAVE_KEY, &TemplatesBlob { task_templates: &[template] })
            .unwrap();
        let mut h = harness_with(store, monday_at(9, 30), retention);
        h.scheduler.initialize();

        for day in 0..4 {
            h.clock.set(monday_at(9, 30) + Duration::days(day));
            h.scheduler.tick();
            let instance_id = h.scheduler.find_today_instance(&id).unwrap().id;
            assert!(h.scheduler.complete_task(instance_id));
        }

        let dates: Vec<NaiveDate> = h.scheduler.history().records.iter().map(|r| r.date).collect();
        let first_kept = NaiveDate::from_ymd_opt(2024, 1, 9).unwrap();
        assert!(dates.iter().all(|d| *d >= first_kept), "{dates:?}");
        assert_eq!(dates.len(), 3);
    }

    #[test]
    fn test_new_user_gets_default_week_and_past_tasks_forgiven() {
        let seeded = AppConfig::default();
        let mut h = harness_with(MemoryStore::new(), monday_at(8, 15), seeded);
        assert!(h.scheduler.initialize());
        assert_eq!(h.scheduler.templates().len(), default_schedule().len());

        h.scheduler.tick();
        let monday = h.scheduler.tasks_for_day(Weekday::Mon);
        let ended: Vec<_> = monday
            .iter()
            .filter(|t| !t.is_free_time() && t.end_time_of_day() <= minutes(8 * 60))
            .collect();
        assert_eq!(ended.len(), 3);
        assert!(ended
            .iter()
            .all(|t| t.status == TaskStatus::Pending && t.action_handled));
        assert!(h.sink.borrow().changes.is_empty());

        // Seeded templates were persisted, so the next run is a returning user
        let mut again = harness_with(h.store.clone(), monday_at(8, 20), AppConfig::default());
        assert!(!again.scheduler.initialize());
        again.scheduler.tick();
        assert!(again.sink.borrow().changes.is_empty());
    }

    #[test]
    fn test_new_user_without_seeding_starts_empty() {
        let mut h = harness_with(MemoryStore::new(), monday_at(8, 0), config());
        assert!(h.scheduler.initialize());
        assert!(h.scheduler.templates().is_empty());
        assert_eq!(h.scheduler.tasks_for_day(Weekday::Mon).len(), 1);
    }

    #[test]
    fn test_corrupt_templates_fall_back_to_empty() {
        let mut store = MemoryStore::new();
        store.save_string(TEMPLATES_SAVE_KEY, "{not json").unwrap();
        store.save_string(STATUS_SAVE_KEY, "42").unwrap();

        let mut h = harness_with(store, monday_at(8, 0), config());
        assert!(h.scheduler.initialize());
        assert!(h.scheduler.templates().is_empty());
        assert!(h.scheduler.history().is_empty());
    }

    #[test]
    fn test_overlapping_stored_templates_are_dropped() {
        let first = work("Focus", vec![Weekday::Mon], 9 * 60, 60);
        let clash = work("Clash", vec![Weekday::Mon], 9 * 60 + 30, 60);
        let h = returning_user(&[first.clone(), clash], monday_at(6, 0));
        assert_eq!(h.scheduler.templates(), &[first]);
    }

    #[test]
    fn test_current_or_next_task() {
        let morning = work("Morning", vec![Weekday::Mon], 9 * 60, 60);
        let evening = work("Evening", vec![Weekday::Mon], 18 * 60, 60);
        let wednesday = work("Wednesday", vec![Weekday::Wed], 8 * 60, 60);
        let mut h = returning_user(&[morning, evening, wednesday], monday_at(9, 30));

        h.scheduler.tick();
        assert_eq!(h.scheduler.current_or_next_task().unwrap().template.name, "Morning");

        h.clock.set(monday_at(10, 15));
        h.scheduler.tick();
        // Morning is awaiting confirmation, so it is still the current task
        assert_eq!(h.scheduler.current_or_next_task().unwrap().template.name, "Morning");

        let morning_id = h.scheduler.current_or_next_task().unwrap().id;
        assert!(h.scheduler.complete_task(morning_id));
        assert_eq!(h.scheduler.current_or_next_task().unwrap().template.name, "Evening");

        h.clock.set(monday_at(18, 30));
        h.scheduler.tick();
        let evening_id = h.scheduler.current_or_next_task().unwrap().id;
        assert!(h.scheduler.complete_task(evening_id));
        assert_eq!(h.scheduler.current_or_next_task().unwrap().template.name, "Wednesday");
    }

    #[test]
    fn test_current_or_next_task_none_without_templates() {
        let mut h = harness_with(MemoryStore::new(), monday_at(9, 0), config());
        h.scheduler.initialize();
        assert!(h.scheduler.current_or_next_task().is_none());
    }
}
