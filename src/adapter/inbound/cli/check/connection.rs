use crate::adapter::inbound::cli::output;
use crate::adapter::inbound::cli::runtime::{self, Needs};
use crate::error::Result;
use crate::infrastructure::config::Config;

/// Connect to the configured RPC endpoint and read contract metadata.
pub async fn execute_connection(config: &Config) -> Result<()> {

    output::section("Connection Check");
    output::field("RPC", &config.chain.rpc_url);
    output::field("Chain ID", config.chain.chain_id);

    let gate = runtime::build_gate(config, Needs::Ledger)?;
    let pb = output::spinner("Reading contract metadata...");
    let metadata = match gate.context.load_metadata().await {
        Ok(metadata) => metadata,
        Err(e) => {
            output::spinner_fail(&pb, "Ledger connection failed");
            return Err(e);
        }
    };
    output::spinner_success(&pb, "Ledger connected");

    output::field("Token", metadata.contracts.token);
    output::field("Decimals", metadata.decimals);
    match gate.context.ledger().signer() {
        Some(account) => output::field("Account", account),
        None => output::warning("No signer configured, writes are unavailable"),
    }

    let rate = gate.estimator.refresh_rate().await;
    if rate.is_fallback() {
        output::warning("Price oracle unavailable, deposits use the fallback rate");
    } else {
        output::field("Rate", format!("{} tokens per unit", rate.tokens_per_base()));
    }

    output::success("Connection checks passed");

    Ok(())
}
