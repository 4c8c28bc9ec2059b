use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SwitchError;
use crate::identity::{ComponentId, Principal};

/// Who engaged a pause, when, and until when.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PauseEngagement {
    pub by: Principal,
    pub since: DateTime<Utc>,
    /// `None` means the pause holds until explicitly released.
    pub until: Option<DateTime<Utc>>,
}

impl PauseEngagement {
    pub fn in_force(&self, now: DateTime<Utc>) -> bool {
        self.until.map_or(true, |until| now < until)
    }
}

/// Pause state cell embedded in every pausable component.
///
/// Each principal holds at most one engagement and can only release its own,
/// so a bounded pause from one authority never cuts short an open-ended pause
/// from another. The switch is engaged while any engagement is in force; a
/// bounded one lapses on its own once `now >= until`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PauseSwitch {
    engagements: Vec<PauseEngagement>,
}

impl PauseSwitch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Engage on behalf of `by`, replacing only `by`'s previous engagement.
    pub fn engage(&mut self, by: Principal, now: DateTime<Utc>, until: Option<DateTime<Utc>>) {
        self.engagements.retain(|e| e.by != by);
        self.engagements.push(PauseEngagement {
            by,
            since: now,
            until,
        });
    }

    /// Release `by`'s engagement. Returns whether it was in force at `now`.
    pub fn release(&mut self, by: &Principal, now: DateTime<Utc>) -> bool {
        match self.engagements.iter().position(|e| &e.by == by) {
            Some(index) => self.engagements.remove(index).in_force(now),
            None => false,
        }
    }

    pub fn is_engaged(&self, now: DateTime<Utc>) -> bool {
        self.engagements.iter().any(|e| e.in_force(now))
    }

    pub fn is_engaged_by(&self, by: &Principal, now: DateTime<Utc>) -> bool {
        self.engagements.iter().any(|e| &e.by == by && e.in_force(now))
    }

    /// The longest-lasting engagement still in force at `now`.
    pub fn engagement(&self, now: DateTime<Utc>) -> Option<&PauseEngagement> {
        self.engagements
            .iter()
            .filter(|e| e.in_force(now))
            .max_by_key(|e| (e.until.is_none(), e.until))
    }
}

/// A component whose operations can be frozen by the emergency controller.
///
/// Implementations check that `caller` holds the pauser role before flipping
/// the switch.
pub trait Pausable: Send + Sync {
    fn component_id(&self) -> ComponentId;

    fn pause(&self, caller: &Principal, until: Option<DateTime<Utc>>) -> Result<(), SwitchError>;

    fn unpause(&self, caller: &Principal) -> Result<(), SwitchError>;

    fn is_paused(&self) -> bool;
}
