use chrono::{DateTime, Timelike};
use chrono_tz::Tz;

pub type ReminderId = String;

/// Wall-clock instant in the bot's reference timezone, truncated to whole
/// seconds so it survives the storage format unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ReminderTime(DateTime<Tz>);

impl ReminderTime {
    pub fn new(inner: DateTime<Tz>) -> Self {
        let normalized = inner.with_nanosecond(0).unwrap_or(inner);
        Self(normalized)
    }

    pub fn time(&self) -> &DateTime<Tz> {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub id: ReminderId,
    pub user_id: String,
    pub channel: String,
    pub content: String,
    pub created_at: ReminderTime,
    pub remind_at: ReminderTime,
}

impl Record {
    pub fn is_due(&self, now: &DateTime<Tz>) -> bool {
        self.remind_at.time() <= now
    }
}
