use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Treasury configuration. Durations are in seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreasuryConfig {
    /// Component id under which the treasury registers and emits events
    #[serde(default = "default_component_id")]
    pub component_id: String,

    /// Minimum age of a transaction before it may execute
    #[serde(default = "default_execution_delay")]
    pub execution_delay_secs: u64,

    /// Age at which an unexecuted transaction expires
    #[serde(default = "default_expiry")]
    pub expiry_secs: u64,

    #[serde(default = "default_max_signers")]
    pub max_signers: usize,

    /// Resource ceiling for a single dispatched call
    #[serde(default = "default_max_gas_limit")]
    pub max_gas_limit: u64,

    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,

    #[serde(default = "default_max_page_size")]
    pub max_page_size: usize,

    /// Largest share of the balance one emergency withdrawal may move,
    /// in basis points
    #[serde(default = "default_emergency_max_share_bps")]
    pub emergency_max_share_bps: u32,
}

impl Default for TreasuryConfig {
    fn default() -> Self {
        Self {
            component_id: default_component_id(),
            execution_delay_secs: default_execution_delay(),
            expiry_secs: default_expiry(),
            max_signers: default_max_signers(),
            max_gas_limit: default_max_gas_limit(),
            max_batch_size: default_max_batch_size(),
            max_page_size: default_max_page_size(),
            emergency_max_share_bps: default_emergency_max_share_bps(),
        }
    }
}

impl TreasuryConfig {
    pub fn execution_delay(&self) -> Duration {
        Duration::seconds(self.execution_delay_secs as i64)
    }

    pub fn expiry(&self) -> Duration {
        Duration::seconds(self.expiry_secs as i64)
    }
}

// Default value helpers
fn default_component_id() -> String {
    "multisig-treasury".to_string()
}

fn default_execution_delay() -> u64 {
    60 * 60
}

fn default_expiry() -> u64 {
    7 * 24 * 60 * 60
}

fn default_max_signers() -> usize {
    20
}

fn default_max_gas_limit() -> u64 {
    5_000_000
}

fn default_max_batch_size() -> usize {
    100
}

fn default_max_page_size() -> usize {
    100
}

fn default_emergency_max_share_bps() -> u32 {
    5_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TreasuryConfig::default();
        assert_eq!(config.execution_delay(), Duration::hours(1));
        assert_eq!(config.expiry(), Duration::days(7));
        assert_eq!(config.max_signers, 20);
        assert_eq!(config.max_gas_limit, 5_000_000);
        assert_eq!(config.emergency_max_share_bps, 5_000);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: TreasuryConfig =
            serde_json::from_str(r#"{"execution_delay_secs": 60}"#).unwrap();
        assert_eq!(config.execution_delay(), Duration::minutes(1));
        assert_eq!(config.max_page_size, 100);
    }
}
