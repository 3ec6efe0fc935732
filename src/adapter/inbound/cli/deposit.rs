//! `quote deposit` and `deposit` commands.

use dialoguer::{theme::ColorfulTheme, Confirm};
use rust_decimal::Decimal;

use super::command::DepositArgs;
use super::output::{self, Record};
use super::runtime::{self, Needs};
use crate::application::DepositQuote;
use crate::error::Result;
use crate::infrastructure::config::Config;

fn show_quote(quote: &DepositQuote) {
    output::emit(&Record::DepositQuote(quote));
    output::field("Deposit", quote.base);
    output::field("Estimate", output::tokens(quote.estimate.display()));
    let rate = format!("{} tokens per unit", quote.rate.tokens_per_base());
    if quote.rate.is_fallback() {
        output::field("Rate", format!("{rate} {}", output::muted("(fallback)")));
    } else {
        output::field("Rate", rate);
    }
    if quote.below_minimum {
        output::warning("amount is below the recommended minimum deposit");
    }
}

/// Estimate the tokens minted for `amount`.
pub async fn execute_quote(config: &Config, amount: Decimal) -> Result<()> {
    let gate = runtime::open_gate(config, Needs::Ledger).await?;

    gate.estimator.refresh_rate().await;
    output::section("Deposit Quote");
    show_quote(&gate.deposits.quote(amount));
    output::hint("the minted amount is set by the contract at confirmation");
    Ok(())
}

/// Deposit base currency and wait for the minted tokens.
pub async fn execute_deposit(config: &Config, args: &DepositArgs) -> Result<()> {
    let gate = runtime::open_gate(config, Needs::Ledger).await?;

    gate.estimator.refresh_rate().await;
    output::section("Deposit");
    show_quote(&gate.deposits.quote(args.amount));

    if !args.yes && output::is_interactive() {
        let proceed = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt("Submit deposit?")
            .default(false)
            .interact()?;
        if !proceed {
            output::warning("Deposit cancelled");
            return Ok(());
        }
    }

    let pb = output::spinner("Submitting deposit...");
    let pending = match gate.deposits.deposit(args.amount).await {
        Ok(pending) => pending,
        Err(e) => {
            output::spinner_fail(&pb, "Deposit not submitted");
            return Err(e.into());
        }
    };
    pb.set_message(format!("Waiting for {}...", pending.hash));

    match gate.deposits.await_deposit(&pending).await {
        Ok(balance) => {
            output::spinner_success(&pb, "Deposit confirmed");
            output::emit(&Record::Deposit {
                tx: pending.hash,
                balance: balance.display(),
            });
            output::field("Transaction", pending.hash);
            output::field("Balance", output::tokens(balance.display()));
            Ok(())
        }
        Err(e) => {
            output::spinner_fail(&pb, "Deposit did not confirm");
            output::field("Transaction", pending.hash);
            Err(e.into())
        }
    }
}
