//! `balance` and `allowance` commands.

use super::command::AllowanceArgs;
use super::output::{self, Record};
use super::runtime::{self, Needs};
use crate::application::RefreshTrigger;
use crate::error::Result;
use crate::infrastructure::config::Config;

/// Show the token balance of the connected account.
pub async fn execute_balance(config: &Config) -> Result<()> {
    let gate = runtime::open_gate(config, Needs::Ledger).await?;
    let account = gate.context.account()?;

    let pb = output::spinner("Reading balance...");
    let balance = gate.balance.refresh(RefreshTrigger::Manual).await;
    output::spinner_success(&pb, "Balance read");

    output::emit(&Record::Balance {
        account,
        balance: balance.display(),
        raw: balance.raw(),
    });
    output::section("Balance");
    output::field("Account", account);
    output::field("Balance", output::tokens(balance.display()));
    Ok(())
}

/// Show the allowance granted by the connected account to a gate contract.
pub async fn execute_allowance(config: &Config, args: &AllowanceArgs) -> Result<()> {
    let gate = runtime::open_gate(config, Needs::Ledger).await?;
    let account = gate.context.account()?;
    let spender = runtime::spender_address(&gate, args.spender)?;

    let allowance = gate
        .allowance
        .refresh(account, spender, RefreshTrigger::Manual)
        .await;

    output::emit(&Record::Allowance {
        owner: account,
        spender,
        allowance: allowance.display(),
    });
    output::section("Allowance");
    output::field("Owner", account);
    output::field("Spender", spender);
    output::field("Allowance", output::tokens(allowance.display()));
    if allowance.is_zero() {
        output::hint("grant one with `paygate approve <amount>`");
    }
    Ok(())
}
