use chrono::Duration;
use custody_types::{Amount, Principal};
use serde::{Deserialize, Serialize};

use crate::template::RewardTemplate;

/// Reward engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardConfig {
    #[serde(default = "default_component_id")]
    pub component_id: String,

    /// Cap on everything issued per UTC day, across templates, custom
    /// rewards and referral bonuses
    #[serde(default = "default_daily_global_limit")]
    pub daily_global_limit: Amount,

    #[serde(default = "default_max_custom_reward")]
    pub max_custom_reward: Amount,

    /// Paid to the referrer when a referee registers a referral
    #[serde(default = "default_referral_bonus")]
    pub referral_bonus: Amount,

    /// The only principal allowed to sweep the distributor balance
    #[serde(default)]
    pub treasury: Option<Principal>,

    #[serde(default = "default_templates")]
    pub templates: Vec<RewardTemplate>,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            component_id: default_component_id(),
            daily_global_limit: default_daily_global_limit(),
            max_custom_reward: default_max_custom_reward(),
            referral_bonus: default_referral_bonus(),
            treasury: None,
            templates: default_templates(),
        }
    }
}

// Default value helpers
fn default_component_id() -> String {
    "reward-distributor".to_string()
}

fn default_daily_global_limit() -> Amount {
    500_000
}

fn default_max_custom_reward() -> Amount {
    1_000
}

fn default_referral_bonus() -> Amount {
    20
}

/// The stock template catalogue.
pub fn default_templates() -> Vec<RewardTemplate> {
    vec![
        RewardTemplate::new("welcome_bonus", 10).one_time(),
        RewardTemplate::new("founder_bonus", 100).one_time().whitelisted(),
        RewardTemplate::new("dao_participation", 5).with_cooldown(Duration::days(30)),
        RewardTemplate::new("attraction_tier_1", 10).one_time(),
        RewardTemplate::new("attraction_tier_2", 20).one_time(),
        RewardTemplate::new("attraction_tier_3", 40).one_time(),
        RewardTemplate::new("attraction_tier_4", 50).one_time(),
        RewardTemplate::new("first_nft_mint", 25).one_time(),
        RewardTemplate::new("custom_reward", 0),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RewardConfig::default();
        assert_eq!(config.daily_global_limit, 500_000);
        assert_eq!(config.max_custom_reward, 1_000);
        assert_eq!(config.referral_bonus, 20);
        assert_eq!(config.templates.len(), 9);

        let welcome = config
            .templates
            .iter()
            .find(|t| t.id == "welcome_bonus")
            .unwrap();
        assert_eq!(welcome.fixed_amount, 10);
        assert_eq!(welcome.max_claims_per_principal, 1);
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config: RewardConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, RewardConfig::default());
    }
}
