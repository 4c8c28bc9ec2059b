use chrono::{DateTime, Duration, Utc};

use crate::error::QuorumError;

/// Parameters of one quorum instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QuorumPolicy {
    pub threshold: usize,
    pub execution_delay: Duration,
    pub expiry: Duration,
}

impl QuorumPolicy {
    pub fn new(threshold: usize, execution_delay: Duration, expiry: Duration) -> Result<Self, QuorumError> {
        if threshold == 0 {
            return Err(QuorumError::InvalidPolicy("threshold must be at least 1".into()));
        }
        if execution_delay < Duration::zero() {
            return Err(QuorumError::InvalidPolicy("negative execution delay".into()));
        }
        if expiry <= execution_delay {
            return Err(QuorumError::InvalidPolicy(format!(
                "expiry ({}s) must exceed execution delay ({}s)",
                expiry.num_seconds(),
                execution_delay.num_seconds()
            )));
        }
        Ok(Self {
            threshold,
            execution_delay,
            expiry,
        })
    }

    /// Policy without an execution delay: actions fire on quorum.
    pub fn immediate(threshold: usize, expiry: Duration) -> Result<Self, QuorumError> {
        Self::new(threshold, Duration::zero(), expiry)
    }

    pub fn ready_at(&self, created_at: DateTime<Utc>) -> DateTime<Utc> {
        created_at + self.execution_delay
    }

    pub fn expires_at(&self, created_at: DateTime<Utc>) -> DateTime<Utc> {
        created_at + self.expiry
    }

    /// Half-open execution window: `delay ≤ elapsed < expiry`.
    pub fn in_window(&self, created_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now >= self.ready_at(created_at) && now < self.expires_at(created_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_threshold_and_inverted_window() {
        assert!(QuorumPolicy::new(0, Duration::hours(1), Duration::days(7)).is_err());
        assert!(QuorumPolicy::new(1, Duration::days(7), Duration::hours(1)).is_err());
        assert!(QuorumPolicy::new(1, Duration::hours(1), Duration::hours(1)).is_err());
    }

    #[test]
    fn window_is_half_open() {
        let policy = QuorumPolicy::new(2, Duration::hours(1), Duration::days(7)).unwrap();
        let t0 = Utc::now();
        assert!(!policy.in_window(t0, t0 + Duration::minutes(59)));
        assert!(policy.in_window(t0, t0 + Duration::hours(1)));
        assert!(policy.in_window(t0, t0 + Duration::days(7) - Duration::seconds(1)));
        assert!(!policy.in_window(t0, t0 + Duration::days(7)));
    }
}
