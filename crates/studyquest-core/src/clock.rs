//! Calendar-day source.
//!
//! Streak logic compares calendar days, never elapsed hours. "Today" is an
//! injected dependency so that the trusted server-side calendar is the only
//! time authority -- client-supplied wall-clock time never reaches the
//! streak rules.

use chrono::NaiveDate;

/// Supplies the current calendar day to coordinator operations.
pub trait TodaySource: Send + Sync {
    /// The current calendar day, or `None` when no trusted day is
    /// available.
    fn today(&self) -> Option<NaiveDate>;
}

/// Server-local UTC calendar day.
pub struct SystemToday;

impl TodaySource for SystemToday {
    fn today(&self) -> Option<NaiveDate> {
        Some(chrono::Utc::now().date_naive())
    }
}

/// Fixed calendar day, for tests and replay tooling.
pub struct FixedToday(pub NaiveDate);

impl TodaySource for FixedToday {
    fn today(&self) -> Option<NaiveDate> {
        Some(self.0)
    }
}
