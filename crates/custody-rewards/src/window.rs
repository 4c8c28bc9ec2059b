use chrono::{DateTime, NaiveDate, Utc};
use custody_types::Amount;
use serde::{Deserialize, Serialize};

/// Amount issued during one UTC calendar day.
///
/// All methods are pure: callers compute the current window, compare it to
/// the limit and store the updated window inside their own critical section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyWindow {
    day: NaiveDate,
    issued: Amount,
}

impl DailyWindow {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            day: now.date_naive(),
            issued: 0,
        }
    }

    pub fn day(&self) -> NaiveDate {
        self.day
    }

    /// The window in force at `now`. A window from an earlier day rolls over
    /// to an empty one.
    pub fn roll(self, now: DateTime<Utc>) -> Self {
        let today = now.date_naive();
        if today == self.day {
            self
        } else {
            Self {
                day: today,
                issued: 0,
            }
        }
    }

    pub fn issued_at(&self, now: DateTime<Utc>) -> Amount {
        self.roll(now).issued
    }

    pub fn headroom(&self, now: DateTime<Utc>, limit: Amount) -> Amount {
        limit.saturating_sub(self.issued_at(now))
    }

    /// The window after issuing `amount` at `now`, or the remaining headroom
    /// if `amount` does not fit under `limit`.
    pub fn admit(&self, now: DateTime<Utc>, amount: Amount, limit: Amount) -> Result<Self, Amount> {
        let current = self.roll(now);
        match current.issued.checked_add(amount) {
            Some(total) if total <= limit => Ok(Self {
                day: current.day,
                issued: total,
            }),
            _ => Err(limit.saturating_sub(current.issued)),
        }
    }
}
