//! Composition root: wires adapters and services into a [`Gate`].

use std::sync::Arc;

use tracing::info;

use crate::adapter::outbound::generation::LlmGenerator;
use crate::adapter::outbound::llm::OpenAi;
use crate::application::{
    AllowanceGate, BalanceTracker, ConversionEstimator, DepositOrchestrator, GateContext,
    PaidGeneration, QuerySubmitter, TransactionMonitor,
};
use crate::error::{ConfigError, Result};
use crate::infrastructure::config::Config;
use crate::port::{Generator, Llm, TokenLedger};

/// Every gate service over one ledger and one generator.
///
/// Services share the same context and monitor so a confirmation seen by one
/// is visible to all of them.
pub struct Gate {
    pub context: Arc<GateContext>,
    pub monitor: Arc<TransactionMonitor>,
    pub balance: Arc<BalanceTracker>,
    pub estimator: Arc<ConversionEstimator>,
    pub deposits: Arc<DepositOrchestrator>,
    pub allowance: AllowanceGate,
    pub queries: Arc<QuerySubmitter>,
    pub session: Arc<PaidGeneration>,
}

impl Gate {
    /// Assemble the services. Does not touch the ledger.
    #[must_use]
    pub fn assemble(
        ledger: Arc<dyn TokenLedger>,
        generator: Arc<dyn Generator>,
        config: &Config,
    ) -> Self {
        let context = Arc::new(GateContext::new(Arc::clone(&ledger)));
        let monitor = Arc::new(TransactionMonitor::new(ledger, config.monitor.clone()));
        let balance = Arc::new(BalanceTracker::new(Arc::clone(&context)));
        let estimator = Arc::new(ConversionEstimator::new(
            Arc::clone(&context),
            config.deposit.fallback_rate,
            config.deposit.price_scale,
        ));
        let deposits = Arc::new(DepositOrchestrator::new(
            Arc::clone(&context),
            Arc::clone(&monitor),
            Arc::clone(&estimator),
            Arc::clone(&balance),
            config.deposit.clone(),
        ));
        let allowance = AllowanceGate::new(
            Arc::clone(&context),
            Arc::clone(&monitor),
            config.allowance.clone(),
        );
        let queries = Arc::new(QuerySubmitter::new(
            Arc::clone(&context),
            Arc::clone(&monitor),
            generator,
            config.query.clone(),
        ));
        let session = Arc::new(PaidGeneration::new(
            Arc::clone(&context),
            allowance.clone(),
            Arc::clone(&queries),
            Arc::clone(&balance),
            config.allowance.clone(),
        ));

        Self {
            context,
            monitor,
            balance,
            estimator,
            deposits,
            allowance,
            queries,
            session,
        }
    }

    /// Connect the signer and load contract metadata.
    ///
    /// # Errors
    ///
    /// Fails without a signer or when metadata cannot be read.
    pub async fn connect(&self) -> Result<()> {
        let account = self.context.connect().await?;
        info!(account = %account, "Gate connected");
        Ok(())
    }
}

/// Build the JSON-RPC ledger from configuration.
///
/// Without a configured key the ledger is read-only. The chain id of
/// signed transactions is filled from the node.
///
/// # Errors
///
/// Returns a configuration error for a bad URL, address or private key.
#[cfg(feature = "evm")]
pub fn build_ledger(config: &Config) -> Result<Arc<dyn TokenLedger>> {
    use std::str::FromStr;

    use alloy_signer_local::PrivateKeySigner;

    use crate::adapter::outbound::evm::EvmLedger;

    let signer = match config.wallet.private_key.as_deref() {
        Some(key) if !key.trim().is_empty() => Some(
            PrivateKeySigner::from_str(key.trim()).map_err(|e| ConfigError::InvalidValue {
                field: "WALLET_PRIVATE_KEY",
                reason: e.to_string(),
            })?,
        ),
        _ => None,
    };

    Ok(Arc::new(EvmLedger::new(
        config.chain.rpc_url()?,
        signer,
        config.chain.contracts()?,
    )))
}

#[cfg(not(feature = "evm"))]
pub fn build_ledger(_config: &Config) -> Result<Arc<dyn TokenLedger>> {
    Err(ConfigError::InvalidValue {
        field: "chain",
        reason: "ledger access requires the evm feature".to_string(),
    }
    .into())
}

/// Build the completion client and generator from configuration.
///
/// # Errors
///
/// Returns a configuration error when the API key variable is unset.
pub fn build_generator(config: &Config) -> Result<Arc<dyn Generator>> {
    let api_key = config.llm.api_key().ok_or_else(|| ConfigError::InvalidValue {
        field: "api_key_env",
        reason: format!("environment variable {} is not set", config.llm.api_key_env),
    })?;
    let llm: Arc<dyn Llm> = Arc::new(OpenAi::new(
        api_key,
        config.llm.base_url.clone(),
        config.llm.default_model.clone(),
    ));
    info!(provider = llm.name(), base_url = %config.llm.base_url, "Generation client ready");
    Ok(Arc::new(LlmGenerator::new(
        llm,
        config.llm.evaluation_model.clone(),
        config.llm.models.clone(),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::config::LlmConfig;
    use crate::testkit::generator::RecordingGenerator;
    use crate::testkit::ledger::ScriptedLedger;
    use crate::testkit::{account, tokens};

    #[tokio::test]
    async fn assembled_gate_connects_and_reads_balance() {
        let ledger = Arc::new(ScriptedLedger::new().with_balance(account(), tokens(7)));
        let gate = Gate::assemble(
            ledger,
            Arc::new(RecordingGenerator::new()),
            &Config::default(),
        );
        gate.connect().await.unwrap();

        let balance = gate
            .balance
            .refresh(crate::application::RefreshTrigger::Manual)
            .await;
        assert_eq!(balance.display(), "7");
    }

    #[test]
    fn generator_requires_api_key() {
        let config = Config {
            llm: LlmConfig {
                api_key_env: "PAYGATE_TEST_UNSET_KEY".into(),
                ..LlmConfig::default()
            },
            ..Config::default()
        };
        std::env::remove_var("PAYGATE_TEST_UNSET_KEY");
        let err = build_generator(&config).err().unwrap().to_string();
        assert!(err.contains("PAYGATE_TEST_UNSET_KEY"), "{err}");
    }
}
