//! Configuration for the custody core

use custody_pause::PauseConfig;
use custody_rewards::RewardConfig;
use custody_treasury::TreasuryConfig;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Root configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustodyConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub treasury: TreasuryConfig,

    #[serde(default)]
    pub rewards: RewardConfig,

    #[serde(default)]
    pub pause: PauseConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level, used when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,

    /// Include timestamps
    #[serde(default = "default_true")]
    pub timestamps: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
            timestamps: true,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

impl CustodyConfig {
    /// Load configuration: defaults, then the file at `path` if present,
    /// then `CUSTODY_` environment variables. Nested keys are separated by
    /// a double underscore, e.g. `CUSTODY_PAUSE__REQUIRED_CONFIRMATIONS=3`.
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&CustodyConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("CUSTODY")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: CustodyConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Cross-field checks the individual components cannot make alone.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.treasury.execution_delay_secs >= self.treasury.expiry_secs {
            return Err(ConfigError::Invalid(format!(
                "treasury execution delay {}s must be shorter than expiry {}s",
                self.treasury.execution_delay_secs, self.treasury.expiry_secs
            )));
        }
        if self.pause.required_confirmations == 0 {
            return Err(ConfigError::Invalid(
                "pause.required_confirmations must be at least 1".into(),
            ));
        }
        if self.pause.required_confirmations > self.pause.min_guardians {
            return Err(ConfigError::Invalid(format!(
                "pause.required_confirmations {} exceeds pause.min_guardians {}",
                self.pause.required_confirmations, self.pause.min_guardians
            )));
        }
        if self.rewards.max_custom_reward > self.rewards.daily_global_limit {
            return Err(ConfigError::Invalid(format!(
                "rewards.max_custom_reward {} exceeds rewards.daily_global_limit {}",
                self.rewards.max_custom_reward, self.rewards.daily_global_limit
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = CustodyConfig::default();
        assert_eq!(config.logging.level, "info");
        assert!(config.logging.timestamps);
        assert_eq!(config.treasury.execution_delay_secs, 3600);
        assert_eq!(config.pause.required_confirmations, 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_file_and_environment() {
        let path = std::env::temp_dir().join(format!("custody-config-{}.toml", std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "[logging]\njson = true\n\n[rewards]\nreferral_bonus = 35\n").unwrap();
        drop(file);

        std::env::set_var("CUSTODY_TREASURY__MAX_SIGNERS", "12");
        let loaded = CustodyConfig::load(path.to_str());
        std::env::remove_var("CUSTODY_TREASURY__MAX_SIGNERS");
        std::fs::remove_file(&path).unwrap();

        let config = loaded.unwrap();
        assert!(config.logging.json);
        assert_eq!(config.rewards.referral_bonus, 35);
        assert_eq!(config.rewards.templates.len(), 9);
        assert_eq!(config.treasury.max_signers, 12);
        assert_eq!(config.treasury.expiry_secs, 604_800);
    }

    #[test]
    fn test_validate_rejects_inverted_window() {
        let mut config = CustodyConfig::default();
        config.treasury.execution_delay_secs = config.treasury.expiry_secs;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = CustodyConfig::default();
        config.pause.required_confirmations = 4;
        assert!(config.validate().is_err());
    }
}
