use chrono::{Local, NaiveDateTime};

/// Default tick interval in milliseconds
pub const DEFAULT_TICK_MS: u64 = 1000;

/// Source of local wall-clock time
pub trait Clock {
    fn now(&self) -> NaiveDateTime;
}

/// Reads the system's local time
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Manually driven clock; clones share the same time
#[cfg(test)]
#[derive(Debug, Clone)]
pub struct FixedClock(std::rc::Rc<std::cell::Cell<NaiveDateTime>>);

#[cfg(test)]
impl FixedClock {
    pub fn new(now: NaiveDateTime) -> Self {
        Self(std::rc::Rc::new(std::cell::Cell::new(now)))
    }

    pub fn set(&self, now: NaiveDateTime) {
        self.0.set(now);
    }

    pub fn advance(&self, by: chrono::Duration) {
        self.0.set(self.0.get() + by);
    }
}

#[cfg(test)]
impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0.get()
    }
}
