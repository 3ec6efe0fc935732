//! `quote generate`, `approve`, `generate` and `reconcile` commands.

use std::time::Duration;

use alloy_primitives::TxHash;
use dialoguer::{theme::ColorfulTheme, Confirm};
use tracing::debug;

use super::command::{ApproveArgs, GenerateArgs, ReconcileArgs, RequestArgs};
use super::output::{self, Record};
use super::runtime::{self, Needs};
use crate::application::{SessionOutcome, TransactionMonitor};
use crate::domain::generation::GenerationResult;
use crate::domain::quote::QueryCostQuote;
use crate::domain::transaction::{ReceiptStatus, TxKind};
use crate::error::{GateError, Result};
use crate::infrastructure::config::Config;
use crate::infrastructure::Gate;

const RECONCILE_INTERVAL: Duration = Duration::from_secs(5);

fn confirm(prompt: &str, yes: bool) -> Result<bool> {
    if yes || !output::is_interactive() {
        return Ok(true);
    }
    Ok(Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .default(true)
        .interact()?)
}

fn show_result(tx: TxHash, result: &GenerationResult) {
    output::emit(&Record::Generation { tx, result });
    output::lines(&result.content);
    output::section("Evaluation");
    output::field("Humor", &result.evaluation.humor_level);
    output::field("Appropriateness", &result.evaluation.appropriateness);
    output::field("Originality", &result.evaluation.originality);
    output::field("Feedback", &result.evaluation.feedback);
    output::field("Model", output::muted(&result.model));
    output::field("Transaction", output::muted(tx));
}

/// Price a request without touching the ledger.
pub fn execute_quote(config: &Config, args: &RequestArgs) -> Result<()> {
    let request = args.to_request(&config.llm.default_model);
    request.validate()?;
    let cost = QueryCostQuote::for_request(&request);

    output::emit(&Record::GenerationQuote {
        request: &request,
        cost: cost.tokens(),
    });
    output::section("Generation Quote");
    output::field("Topic", &request.topic);
    output::field("Kind", request.kind);
    output::field("Creativity", request.creativity);
    output::field("Cost", output::tokens(cost));
    Ok(())
}

/// Grant a spender allowance and wait until it is visible.
pub async fn execute_approve(config: &Config, args: &ApproveArgs) -> Result<()> {
    let gate = runtime::open_gate(config, Needs::Ledger).await?;
    let spender = runtime::spender_address(&gate, args.spender)?;

    output::section("Approve");
    output::field("Spender", spender);
    output::field("Amount", args.amount);
    if !confirm("Submit approval?", args.yes)? {
        output::warning("Approval cancelled");
        return Ok(());
    }

    let pb = output::spinner("Submitting approval...");
    let pending = match gate.allowance.approve(spender, args.amount).await {
        Ok(pending) => pending,
        Err(e) => {
            output::spinner_fail(&pb, "Approval not submitted");
            return Err(e.into());
        }
    };
    pb.set_message(format!("Waiting for {}...", pending.hash));
    if let Err(e) = gate.allowance.await_approval(spender, &pending).await {
        output::spinner_fail(&pb, "Approval did not confirm");
        output::field("Transaction", pending.hash);
        return Err(e.into());
    }
    output::spinner_success(&pb, "Approval confirmed");

    let account = gate.context.account()?;
    let allowance = gate.allowance.current_allowance(account, spender);
    output::emit(&Record::Approval {
        tx: pending.hash,
        spender,
        allowance: allowance.display(),
    });
    output::field("Transaction", pending.hash);
    output::field("Allowance", output::tokens(allowance.display()));
    Ok(())
}

/// Pay for and run one generation.
pub async fn execute_generate(config: &Config, args: &GenerateArgs) -> Result<()> {
    let request = args.request.to_request(&config.llm.default_model);
    request.validate()?;
    let cost = QueryCostQuote::for_request(&request);

    let gate = runtime::open_gate(config, Needs::Generation).await?;
    let balance = gate.balance.get_balance();

    output::section("Generate");
    output::field("Topic", &request.topic);
    output::field("Model", &request.model);
    output::field("Cost", format!("{cost} tokens"));
    output::field("Balance", balance.display());
    if !confirm("Pay and generate?", args.yes)? {
        output::warning("Generation cancelled");
        return Ok(());
    }

    let pb = output::spinner("Paying for generation...");
    match gate.session.run(request).await {
        SessionOutcome::Generated { tx, result } => {
            output::spinner_success(&pb, "Generation complete");
            show_result(tx, &result);
            output::field("Balance", gate.balance.get_balance().display());
            Ok(())
        }
        SessionOutcome::Cancelled => {
            output::spinner_fail(&pb, "Cancelled in wallet, nothing was spent");
            Ok(())
        }
        SessionOutcome::TimedOut {
            kind: TxKind::Query,
            tx,
        } => {
            output::spinner_fail(&pb, "Payment not confirmed yet");
            output::field("Transaction", tx);
            reconcile_until(&gate, tx, Duration::from_secs(args.reconcile_secs)).await
        }
        SessionOutcome::TimedOut { kind, tx } => {
            output::spinner_fail(&pb, "Approval not confirmed yet, nothing was spent");
            output::field("Transaction", tx);
            output::emit(&Record::Pending { tx, kind });
            output::hint("run `generate` again once it lands");
            Ok(())
        }
        SessionOutcome::Failed(e) => {
            output::spinner_fail(&pb, "Generation failed");
            Err(e.into())
        }
    }
}

/// Keep checking a timed-out query until it lands or `budget` runs out.
async fn reconcile_until(gate: &Gate, tx: TxHash, budget: Duration) -> Result<()> {
    let deadline = tokio::time::Instant::now() + budget;
    let pb = output::spinner("Waiting for the payment to land...");
    loop {
        match gate.queries.reconcile(tx).await {
            Ok(Some(result)) => {
                output::spinner_success(&pb, "Payment landed");
                show_result(tx, &result);
                return Ok(());
            }
            Ok(None) => debug!(tx = %tx, "Query still pending"),
            Err(GateError::NetworkError { .. }) => debug!(tx = %tx, "Receipt read failed, retrying"),
            Err(e) => {
                output::spinner_fail(&pb, "Payment did not land");
                return Err(e.into());
            }
        }
        if tokio::time::Instant::now() + RECONCILE_INTERVAL > deadline {
            break;
        }
        tokio::time::sleep(RECONCILE_INTERVAL).await;
    }

    output::spinner_fail(&pb, "Still pending");
    output::emit(&Record::Pending {
        tx,
        kind: TxKind::Query,
    });
    output::hint(&format!("check it later with `paygate reconcile {tx}`"));
    Ok(())
}

/// Report the on-chain status of a query transaction.
pub async fn execute_reconcile(config: &Config, args: &ReconcileArgs) -> Result<()> {
    let gate = runtime::open_gate(config, Needs::Ledger).await?;

    let status = gate
        .context
        .ledger()
        .receipt(args.tx)
        .await
        .map_err(|e| TransactionMonitor::classify(&e))?;

    let label = match status {
        Some(ReceiptStatus::Success) => "landed",
        Some(ReceiptStatus::Reverted) => "reverted",
        None => "pending",
    };
    output::emit(&Record::Reconcile {
        tx: args.tx,
        status: label,
    });
    output::section("Reconcile");
    output::field("Transaction", args.tx);
    match status {
        Some(ReceiptStatus::Success) => {
            output::success("Payment landed");
            output::hint("the payment is settled; rerun `generate` in this session to collect content");
        }
        Some(ReceiptStatus::Reverted) => output::warning("Payment reverted, nothing was spent"),
        None => output::warning("Payment not mined yet"),
    }
    Ok(())
}
