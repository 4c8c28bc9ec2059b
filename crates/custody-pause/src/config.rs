use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Emergency pause controller configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PauseConfig {
    #[serde(default = "default_component_id")]
    pub component_id: String,

    /// Guardian confirmations needed to activate a request
    #[serde(default = "default_required_confirmations")]
    pub required_confirmations: usize,

    /// Lifetime of a pause, counted from the request that activated it
    #[serde(default = "default_max_pause_duration")]
    pub max_pause_duration_secs: u64,

    /// Guardians that must exist when the controller is constructed
    #[serde(default = "default_min_guardians")]
    pub min_guardians: usize,
}

impl Default for PauseConfig {
    fn default() -> Self {
        Self {
            component_id: default_component_id(),
            required_confirmations: default_required_confirmations(),
            max_pause_duration_secs: default_max_pause_duration(),
            min_guardians: default_min_guardians(),
        }
    }
}

impl PauseConfig {
    pub fn max_pause_duration(&self) -> Duration {
        Duration::seconds(self.max_pause_duration_secs as i64)
    }
}

// Default value helpers
fn default_component_id() -> String {
    "emergency-pause".to_string()
}

fn default_required_confirmations() -> usize {
    2
}

fn default_max_pause_duration() -> u64 {
    72 * 3600
}

fn default_min_guardians() -> usize {
    3
}
