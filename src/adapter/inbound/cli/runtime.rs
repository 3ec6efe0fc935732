//! Configuration loading and gate wiring for CLI handlers.

use std::path::Path;
use std::sync::Arc;

use alloy_primitives::Address;
use async_trait::async_trait;
use tracing::debug;

use super::command::SpenderChoice;
use crate::domain::generation::GenerationResult;
use crate::domain::quote::GenerationRequest;
use crate::error::{ConfigError, Result};
use crate::infrastructure::bootstrap::{build_generator, build_ledger};
use crate::infrastructure::config::Config;
use crate::infrastructure::Gate;
use crate::port::Generator;

/// Load the configuration at `path`.
///
/// A missing file yields the defaults so read-only commands work without
/// setup; environment secrets still apply.
pub fn load_config(path: &Path) -> Result<Config> {
    if path.exists() {
        Config::load(path)
    } else {
        debug!(path = %path.display(), "Config file not found, using defaults");
        Config::parse_toml("")
    }
}

/// Which services a command needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Needs {
    /// Ledger reads and writes only.
    Ledger,
    /// Ledger plus the generation endpoint.
    Generation,
}

/// Wire the gate without connecting an account.
pub fn build_gate(config: &Config, needs: Needs) -> Result<Gate> {
    let ledger = build_ledger(config)?;
    let generator: Arc<dyn Generator> = match needs {
        Needs::Generation => build_generator(config)?,
        Needs::Ledger => Arc::new(NoGenerator),
    };
    Ok(Gate::assemble(ledger, generator, config))
}

/// Wire the gate and connect the configured signer.
pub async fn open_gate(config: &Config, needs: Needs) -> Result<Gate> {
    let gate = build_gate(config, needs)?;
    gate.connect().await?;
    Ok(gate)
}

/// Address of the chosen spender contract.
pub fn spender_address(gate: &Gate, choice: SpenderChoice) -> Result<Address> {
    let contracts = gate.context.metadata()?.contracts;
    Ok(match choice {
        SpenderChoice::Query => contracts.query_tool,
        SpenderChoice::Deposit => contracts.deposit_manager,
    })
}

/// Stand-in for commands that never generate.
struct NoGenerator;

#[async_trait]
impl Generator for NoGenerator {
    fn name(&self) -> &'static str {
        "none"
    }

    async fn generate(
        &self,
        _request: &GenerationRequest,
        _account: Address,
    ) -> Result<GenerationResult> {
        Err(ConfigError::InvalidValue {
            field: "llm",
            reason: "generation is not available for this command".to_string(),
        }
        .into())
    }
}
