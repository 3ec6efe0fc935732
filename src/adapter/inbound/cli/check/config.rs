use std::path::Path;

use crate::adapter::inbound::cli::{output, runtime};
use crate::error::Result;
use crate::infrastructure::config::Config;

/// Facts about a configuration worth surfacing before running commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigReport {
    pub chain_id: u64,
    pub rpc_url: String,
    pub default_model: String,
    pub models: Vec<String>,
    pub wallet_configured: bool,
    pub api_key_env: String,
    pub api_key_present: bool,
}

impl ConfigReport {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            chain_id: config.chain.chain_id,
            rpc_url: config.chain.rpc_url.clone(),
            default_model: config.llm.default_model.clone(),
            models: config.llm.models.clone(),
            wallet_configured: config.wallet.has_signer(),
            api_key_env: config.llm.api_key_env.clone(),
            api_key_present: config.llm.api_key().is_some(),
        }
    }
}

/// Validate the configuration file without touching the network.
pub fn execute_config<P: AsRef<Path>>(config_path: P) -> Result<()> {
    let path = config_path.as_ref();
    let config = runtime::load_config(path)?;
    config.validate()?;
    let report = ConfigReport::from_config(&config);

    output::section("Configuration Check");
    output::field("Config", path.display());
    if path.exists() {
        output::success("Configuration file is valid");
    } else {
        output::warning("Configuration file not found, using defaults");
    }

    output::section("Summary");
    output::field("Chain ID", report.chain_id);
    output::field("RPC", &report.rpc_url);
    output::field("Model", &report.default_model);
    output::field("Models", report.models.join(", "));

    if report.wallet_configured {
        output::success("Wallet credentials detected");
    } else {
        output::warning("Wallet credentials not configured (set WALLET_PRIVATE_KEY to pay)");
    }

    if report.api_key_present {
        output::success("Generation API key detected");
    } else {
        output::warning(&format!(
            "Generation API key missing (set {} to generate)",
            report.api_key_env
        ));
    }

    output::success("Configuration check complete");

    Ok(())
}
