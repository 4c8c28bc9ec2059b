use chrono::{DateTime, Duration, Utc};
use custody_types::{Amount, Principal};
use serde::{Deserialize, Serialize};

/// A named, reusable reward definition.
///
/// `fixed_amount == 0` marks a custom-amount template: it cannot be claimed
/// and exists only to label backend-issued custom rewards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardTemplate {
    pub id: String,

    pub fixed_amount: Amount,

    #[serde(default = "default_true")]
    pub active: bool,

    /// Per-template cap on the amount issued per UTC day
    #[serde(default)]
    pub daily_limit: Option<Amount>,

    #[serde(default)]
    pub requires_whitelist: bool,

    /// 0 = unlimited, 1 = one-time
    #[serde(default)]
    pub max_claims_per_principal: u32,

    /// Minimum time between two claims by the same principal, in seconds
    #[serde(default)]
    pub cooldown_secs: Option<u64>,
}

fn default_true() -> bool {
    true
}

impl RewardTemplate {
    /// An active, unrestricted template paying `fixed_amount` per claim.
    pub fn new(id: impl Into<String>, fixed_amount: Amount) -> Self {
        Self {
            id: id.into(),
            fixed_amount,
            active: true,
            daily_limit: None,
            requires_whitelist: false,
            max_claims_per_principal: 0,
            cooldown_secs: None,
        }
    }

    pub fn one_time(mut self) -> Self {
        self.max_claims_per_principal = 1;
        self
    }

    pub fn whitelisted(mut self) -> Self {
        self.requires_whitelist = true;
        self
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown_secs = Some(cooldown.num_seconds().max(0) as u64);
        self
    }

    pub fn with_daily_limit(mut self, limit: Amount) -> Self {
        self.daily_limit = Some(limit);
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    pub fn is_custom(&self) -> bool {
        self.fixed_amount == 0
    }

    /// `None` when there is no cooldown or it does not fit a `Duration`.
    pub fn cooldown(&self) -> Option<Duration> {
        self.cooldown_secs
            .and_then(|s| i64::try_from(s).ok())
            .and_then(Duration::try_seconds)
    }

    /// Whether the configured cooldown can be represented at all.
    pub fn has_valid_cooldown(&self) -> bool {
        self.cooldown_secs.is_none() || self.cooldown().is_some()
    }

    /// Earliest time a principal who last claimed at `last` may claim again.
    /// Saturates at the maximum representable time.
    pub fn available_after(&self, last: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.cooldown_secs?;
        Some(
            self.cooldown()
                .and_then(|cooldown| last.checked_add_signed(cooldown))
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        )
    }
}

/// Per (principal, template) claim history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimRecord {
    pub claims: u32,
    pub first_claimed_at: DateTime<Utc>,
    pub last_claimed_at: DateTime<Utc>,
}

impl ClaimRecord {
    pub fn first(at: DateTime<Utc>) -> Self {
        Self {
            claims: 1,
            first_claimed_at: at,
            last_claimed_at: at,
        }
    }

    pub fn record(&mut self, at: DateTime<Utc>) {
        self.claims = self.claims.saturating_add(1);
        self.last_claimed_at = at;
    }
}

/// Answer to "could this principal claim this template right now?".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Eligibility {
    pub eligible: bool,
    pub amount: Amount,
    pub reason: Option<String>,
}

impl Eligibility {
    pub fn eligible(amount: Amount) -> Self {
        Self {
            eligible: true,
            amount,
            reason: None,
        }
    }

    pub fn ineligible(reason: impl Into<String>) -> Self {
        Self {
            eligible: false,
            amount: 0,
            reason: Some(reason.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RewardSource {
    Template { template: String },
    Custom { reason: String, issued_by: Principal },
    Referral { referee: Principal },
}

/// Record of one successful issuance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardReceipt {
    pub source: RewardSource,
    pub recipient: Principal,
    pub amount: Amount,
    pub issued_at: DateTime<Utc>,
    /// Global amount issued on the current UTC day, including this one
    pub issued_today: Amount,
}
