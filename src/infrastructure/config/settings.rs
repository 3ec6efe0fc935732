//! Application configuration loading and validation.
//!
//! Provides the main [`Config`] struct that aggregates all settings.
//! Configuration is loaded from a TOML file with environment variable
//! overrides for sensitive values like `WALLET_PRIVATE_KEY`.
//!
//! # Example
//!
//! ```no_run
//! use paygate::infrastructure::config::settings::Config;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("config.toml")?;
//!     config.init_logging();
//!     Ok(())
//! }
//! ```

use std::fs;
use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;

use super::chain::ChainConfig;
use super::llm::LlmConfig;
use super::logging::{LoggingConfig, LOG_FORMATS};
use super::wallet::WalletConfig;
use crate::application::config::{AllowanceConfig, DepositConfig, MonitorConfig, QueryConfig};
use crate::domain::amount::MAX_DECIMALS;
use crate::error::{ConfigError, Result};

/// Main application configuration.
///
/// Every section is optional; an empty file yields the defaults. Load from a
/// TOML file using [`Config::load`] or parse directly with
/// [`Config::parse_toml`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Logging and tracing configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// RPC endpoint and contract addresses.
    #[serde(default)]
    pub chain: ChainConfig,

    /// Wallet configuration for signing writes.
    ///
    /// Private key is loaded from `WALLET_PRIVATE_KEY` environment variable.
    #[serde(default)]
    pub wallet: WalletConfig,

    /// Generation endpoint and models.
    #[serde(default)]
    pub llm: LlmConfig,

    /// Receipt polling and stuck detection.
    #[serde(default)]
    pub monitor: MonitorConfig,

    /// Allowance settling after approvals.
    #[serde(default)]
    pub allowance: AllowanceConfig,

    /// Deposit quoting.
    #[serde(default)]
    pub deposit: DepositConfig,

    /// Query submission.
    #[serde(default)]
    pub query: QueryConfig,
}

fn read_keystore_password() -> Result<String> {
    if let Ok(password) = std::env::var("PAYGATE_KEYSTORE_PASSWORD") {
        return Ok(password);
    }
    if let Ok(path) = std::env::var("PAYGATE_KEYSTORE_PASSWORD_FILE") {
        let contents = fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        let password = contents.trim().to_string();
        if password.is_empty() {
            return Err(ConfigError::MissingField {
                field: "PAYGATE_KEYSTORE_PASSWORD_FILE",
            }
            .into());
        }
        return Ok(password);
    }

    Err(ConfigError::MissingField {
        field: "PAYGATE_KEYSTORE_PASSWORD",
    }
    .into())
}

#[cfg(feature = "evm")]
fn decrypt_keystore_private_key(path: &str, password: &str) -> Result<String> {
    use alloy_signer_local::PrivateKeySigner;

    let signer = PrivateKeySigner::decrypt_keystore(path, password).map_err(|e| {
        ConfigError::InvalidValue {
            field: "keystore_path",
            reason: e.to_string(),
        }
    })?;
    Ok(format!("{:x}", signer.to_bytes()))
}

#[cfg(not(feature = "evm"))]
fn decrypt_keystore_private_key(_path: &str, _password: &str) -> Result<String> {
    Err(ConfigError::InvalidValue {
        field: "keystore_path",
        reason: "keystore support requires the evm feature".to_string(),
    }
    .into())
}

fn invalid(field: &'static str, reason: &str) -> crate::error::Error {
    ConfigError::InvalidValue {
        field,
        reason: reason.to_string(),
    }
    .into()
}

impl Config {
    /// Parse configuration from TOML content.
    ///
    /// Loads the private key from the `WALLET_PRIVATE_KEY` environment variable
    /// or decrypts it from a keystore file if `keystore_path` is configured.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The TOML content is malformed
    /// - Validation fails (e.g., a zero poll interval)
    /// - Keystore decryption fails when using keystore authentication
    #[allow(clippy::result_large_err)]
    pub fn parse_toml(content: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;

        // Load private key from environment variable (never from config file for security)
        config.wallet.private_key = std::env::var("WALLET_PRIVATE_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty());
        if config.wallet.private_key.is_none() {
            if let Some(ref keystore_path) = config.wallet.keystore_path {
                let password = read_keystore_password()?;
                config.wallet.private_key =
                    Some(decrypt_keystore_private_key(keystore_path, &password)?);
            }
        }

        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read
    /// - The TOML content is malformed
    /// - Validation fails
    #[allow(clippy::result_large_err)]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::parse_toml(&content)
    }

    /// Validate configuration values.
    ///
    /// Checks that all required fields are present and values are within
    /// acceptable ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] or [`ConfigError::MissingField`]
    /// for the first offending setting.
    #[allow(clippy::result_large_err)]
    pub fn validate(&self) -> Result<()> {
        if !LOG_FORMATS.contains(&self.logging.format.as_str()) {
            return Err(invalid("format", "must be 'pretty' or 'json'"));
        }

        self.chain.rpc_url()?;
        self.chain.contracts()?;
        if self.chain.chain_id == 0 {
            return Err(invalid("chain_id", "must be greater than 0"));
        }

        if self.llm.base_url.trim().is_empty() {
            return Err(ConfigError::MissingField { field: "base_url" }.into());
        }
        if self.llm.api_key_env.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "api_key_env",
            }
            .into());
        }
        if !self.llm.models.is_empty() && !self.llm.models.contains(&self.llm.default_model) {
            return Err(invalid("default_model", "must be listed in models"));
        }

        let monitor = &self.monitor;
        if monitor.poll_initial_ms == 0 {
            return Err(invalid("poll_initial_ms", "must be greater than 0"));
        }
        if monitor.poll_max_ms < monitor.poll_initial_ms {
            return Err(invalid("poll_max_ms", "must be >= poll_initial_ms"));
        }
        if monitor.poll_multiplier < 1.0 {
            return Err(invalid("poll_multiplier", "must be >= 1.0"));
        }
        if !(0.0..=1.0).contains(&monitor.jitter) {
            return Err(invalid("jitter", "must be between 0 and 1"));
        }
        if monitor.stuck_ceiling_secs == 0 {
            return Err(invalid("stuck_ceiling_secs", "must be greater than 0"));
        }

        let allowance = &self.allowance;
        if allowance.settle_initial_ms == 0 {
            return Err(invalid("settle_initial_ms", "must be greater than 0"));
        }
        if allowance.settle_max_ms < allowance.settle_initial_ms {
            return Err(invalid("settle_max_ms", "must be >= settle_initial_ms"));
        }
        if allowance.settle_attempts == 0 {
            return Err(invalid("settle_attempts", "must be greater than 0"));
        }

        let deposit = &self.deposit;
        if deposit.min_deposit < Decimal::ZERO {
            return Err(invalid("min_deposit", "must be 0 or greater"));
        }
        if deposit.fallback_rate <= Decimal::ZERO {
            return Err(invalid("fallback_rate", "must be greater than 0"));
        }
        if deposit.price_scale > MAX_DECIMALS {
            return Err(invalid("price_scale", "must be at most 36"));
        }

        if self.query.gas_limit == 0 {
            return Err(invalid("gas_limit", "must be greater than 0"));
        }
        if self.query.retained_completions == 0 {
            return Err(invalid("retained_completions", "must be greater than 0"));
        }

        Ok(())
    }

    /// Initialize logging with the configured settings.
    pub fn init_logging(&self) {
        self.logging.init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config: Config = toml::from_str("").unwrap();
        config.validate().unwrap();
        assert_eq!(config.chain.chain_id, 8453);
        assert_eq!(config.llm.default_model, "mistral-31-24b");
        assert_eq!(config.query.gas_limit, 500_000);
    }

    #[test]
    fn sections_override_defaults() {
        let config: Config = toml::from_str(
            r#"
            [logging]
            level = "debug"
            format = "json"

            [monitor]
            stuck_ceiling_secs = 30

            [deposit]
            min_deposit = "0.05"
            "#,
        )
        .unwrap();
        config.validate().unwrap();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.monitor.stuck_ceiling_secs, 30);
        assert_eq!(config.monitor.poll_initial_ms, 500);
        assert_eq!(config.deposit.min_deposit.to_string(), "0.05");
    }

    fn rejects(toml_text: &str, field: &str) {
        let config: Config = toml::from_str(toml_text).unwrap();
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains(field), "expected {field} in: {err}");
    }

    #[test]
    fn validation_rejects_bad_values() {
        rejects("[logging]\nformat = \"xml\"", "format");
        rejects("[chain]\nchain_id = 0", "chain_id");
        rejects("[chain]\ntoken = \"0xnope\"", "token");
        rejects("[monitor]\npoll_initial_ms = 0", "poll_initial_ms");
        rejects("[monitor]\npoll_max_ms = 100", "poll_max_ms");
        rejects("[monitor]\njitter = 1.5", "jitter");
        rejects("[allowance]\nsettle_attempts = 0", "settle_attempts");
        rejects("[deposit]\nfallback_rate = \"0\"", "fallback_rate");
        rejects("[query]\ngas_limit = 0", "gas_limit");
        rejects("[query]\nretained_completions = 0", "retained_completions");
        rejects("[llm]\ndefault_model = \"gpt-9\"", "default_model");
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = Config::parse_toml("[chain\nrpc_url = 1").unwrap_err();
        assert!(err.to_string().contains("failed to parse config"), "{err}");
    }
}
