use chrono::{Local, NaiveDateTime};

use crate::utils::validation::parse_date;

/// Source of the current local wall-clock time.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LocalClock;

impl Clock for LocalClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Always reports the same instant. Used by tests and replay tooling.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

/// Renders a stored `YYYY-MM-DD` date as `DD.MM.YYYY`, falling back to the raw value.
pub fn format_date(date: &str) -> String {
    match parse_date(date) {
        Ok(d) => d.format("%d.%m.%Y").to_string(),
        Err(_) => date.to_string(),
    }
}
