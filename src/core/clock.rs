// src/core/clock.rs

use chrono::{Local, NaiveDateTime};
use std::fmt::Debug;
use std::sync::Mutex;
use std::sync::PoisonError;

use crate::constants::BACKUP_STAMP_FORMAT;

/// ISO-8601 local time without offset, as stored in history entries.
pub const ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Source of wall-clock time for history stamps and backup names.
pub trait Clock: Send + Sync + Debug {
    fn now(&self) -> NaiveDateTime;

    /// `YYYY-MM-DDTHH:MM:SS`.
    fn iso_timestamp(&self) -> String {
        self.now().format(ISO_FORMAT).to_string()
    }

    /// `YYYYMMDD_HHMMSS`, lexicographically sortable.
    fn backup_stamp(&self) -> String {
        self.now().format(BACKUP_STAMP_FORMAT).to_string()
    }
}

/// Local system time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<NaiveDateTime>,
}

impl FixedClock {
    pub fn new(now: NaiveDateTime) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: NaiveDateTime) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = now;
    }

    pub fn advance(&self, seconds: i64) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += chrono::Duration::seconds(seconds);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Turns a `YYYYMMDD_HHMMSS` stamp into `YYYY-MM-DD HH:MM:SS`, or `None` if it
/// is not a valid stamp.
pub fn display_stamp(stamp: &str) -> Option<String> {
    NaiveDateTime::parse_from_str(stamp, BACKUP_STAMP_FORMAT)
        .ok()
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
}
