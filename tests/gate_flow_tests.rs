//! End-to-end gate flows over the scripted ledger.

mod support;

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use paygate::application::{RefreshTrigger, SessionOutcome};
use paygate::domain::{FlowState, Notice, QueryCostQuote, ReceiptStatus, TxKind};
use paygate::error::GateError;
use paygate::port::LedgerError;
use paygate::testkit::{account, long_request, query_tool, request, tokens};
use rust_decimal_macros::dec;

// -------------------------------------------------------------------------
// Deposits
// -------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn deposit_estimate_then_minted_balance() {
    let gate = support::gate::gate(support::gate::mining_ledger()).await;
    assert!(gate.balance.refresh(RefreshTrigger::Manual).await.is_zero());

    gate.estimator.refresh_rate().await;
    let quote = gate.deposits.quote(dec!(0.02));
    assert_eq!(quote.estimate.display(), "36");
    assert!(!quote.below_minimum);

    let pending = gate.deposits.deposit(dec!(0.02)).await.unwrap();
    let balance = gate.deposits.await_deposit(&pending).await.unwrap();

    assert!(!balance.is_zero());
    assert_eq!(gate.balance.get_balance(), balance);
    assert_eq!(gate.ledger.deposit_dispatches(), 1);
}

// -------------------------------------------------------------------------
// Allowance
// -------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn approval_makes_insufficient_allowance_sufficient() {
    let gate = support::gate::gate(
        support::gate::mining_ledger().with_allowance(account(), query_tool(), tokens(3)),
    )
    .await;
    gate.allowance
        .refresh(account(), query_tool(), RefreshTrigger::Manual)
        .await;
    assert!(!gate.allowance.has_sufficient_allowance(dec!(5)));

    let pending = gate.allowance.approve(query_tool(), dec!(5)).await.unwrap();
    gate.allowance
        .await_approval(query_tool(), &pending)
        .await
        .unwrap();

    assert!(gate.allowance.has_sufficient_allowance(dec!(5)));
}

// -------------------------------------------------------------------------
// Paid generation
// -------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn session_approves_pays_and_generates_once() {
    let gate = support::gate::gate(
        support::gate::mining_ledger().with_balance(account(), tokens(20)),
    )
    .await;

    let outcome = gate.session.run(long_request()).await;
    let SessionOutcome::Generated { tx, result } = outcome else {
        panic!("expected a generation, got {outcome:?}");
    };

    assert_eq!(gate.ledger.approve_dispatches(), 1);
    assert_eq!(gate.ledger.query_dispatches(), 1);
    assert_eq!(gate.generator.calls(), 1);
    assert_eq!(Some(result.content), gate.generator.last_content());
    assert_eq!(gate.session.state(), FlowState::Authorized { tx });

    // the query spent the long-request cost
    let cost = QueryCostQuote::for_request(&long_request()).tokens();
    assert_eq!(gate.ledger.last_query().map(|(raw, _)| raw), Some(tokens(cost)));
    assert_eq!(gate.balance.get_balance().raw(), tokens(20 - cost));
}

#[tokio::test(start_paused = true)]
async fn session_skips_approval_when_allowance_covers_cost() {
    let gate = support::gate::gate(
        support::gate::funded_ledger(10)
            .with_auto_mine(Duration::from_secs(1), ReceiptStatus::Success),
    )
    .await;

    let outcome = gate.session.run(request()).await;

    assert!(matches!(outcome, SessionOutcome::Generated { .. }));
    assert_eq!(gate.ledger.approve_dispatches(), 0);
    assert_eq!(gate.ledger.query_dispatches(), 1);
}

#[tokio::test]
async fn wallet_rejection_returns_to_idle_and_allows_retry() {
    let gate = support::gate::gate(support::gate::funded_ledger(10)).await;
    gate.ledger
        .fail_next_write(LedgerError::UserRejected("User rejected the request".into()));

    let outcome = gate.session.run(request()).await;

    assert_eq!(outcome, SessionOutcome::Cancelled);
    assert_eq!(
        gate.session.state(),
        FlowState::Idle {
            notice: Some(Notice::Cancelled)
        }
    );
    assert_eq!(gate.generator.calls(), 0);
    assert!(!gate.queries.is_in_flight(&account()));

    // nothing left over blocks the next submission
    let cost = QueryCostQuote::for_request(&request());
    assert!(gate.queries.submit_query(cost, request()).await.is_ok());
    assert_eq!(gate.ledger.query_dispatches(), 2);
}

#[tokio::test(start_paused = true)]
async fn stuck_query_times_out_then_late_confirmation_generates_once() {
    let gate = support::gate::gate(support::gate::funded_ledger(10)).await;

    let outcome = gate.session.run(request()).await;
    let SessionOutcome::TimedOut {
        kind: TxKind::Query,
        tx,
    } = outcome
    else {
        panic!("expected a query timeout, got {outcome:?}");
    };
    assert_eq!(
        gate.session.state(),
        FlowState::Idle {
            notice: Some(Notice::TimedOut {
                kind: TxKind::Query,
                tx
            })
        }
    );
    assert_eq!(gate.generator.calls(), 0);
    assert!(!gate.queries.is_in_flight(&account()));

    // the ledger mines it late
    gate.ledger.mine(tx, ReceiptStatus::Success);
    let result = gate.queries.reconcile(tx).await.unwrap();
    assert!(result.is_some());
    assert_eq!(gate.generator.calls(), 1);

    // a further signal for the handled hash does not generate again
    gate.queries.on_confirmed(tx).await.unwrap();
    gate.queries.reconcile(tx).await.unwrap();
    assert_eq!(gate.generator.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn late_signal_after_normal_confirmation_is_ignored() {
    let gate = support::gate::gate(
        support::gate::funded_ledger(10)
            .with_auto_mine(Duration::from_secs(1), ReceiptStatus::Success),
    )
    .await;

    let SessionOutcome::Generated { tx, .. } = gate.session.run(request()).await else {
        panic!("expected a generation");
    };
    gate.queries.on_confirmed(tx).await.unwrap();
    assert!(gate.queries.reconcile(tx).await.unwrap().is_some());

    assert_eq!(gate.generator.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn reverted_query_fails_without_generation() {
    let gate = support::gate::gate(
        support::gate::funded_ledger(10)
            .with_auto_mine(Duration::from_secs(1), ReceiptStatus::Reverted),
    )
    .await;

    let outcome = gate.session.run(request()).await;

    assert!(matches!(
        outcome,
        SessionOutcome::Failed(GateError::TransactionReverted { .. })
    ));
    assert_eq!(gate.generator.calls(), 0);
    assert!(!gate.queries.is_in_flight(&account()));
}

// -------------------------------------------------------------------------
// Concurrency
// -------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn concurrent_submissions_dispatch_at_most_once() {
    let gate = support::gate::gate(
        support::gate::funded_ledger(50).with_write_delay(Duration::from_millis(200)),
    )
    .await;
    let queries = Arc::clone(&gate.queries);
    let cost = QueryCostQuote::for_request(&request());

    let results = join_all((0..8).map(|_| {
        let queries = Arc::clone(&queries);
        async move { queries.submit_query(cost, request()).await }
    }))
    .await;

    let accepted = results.iter().filter(|r| r.is_ok()).count();
    let rejected = results
        .iter()
        .filter(|r| matches!(r, Err(GateError::AlreadyInProgress)))
        .count();
    assert_eq!(accepted, 1);
    assert_eq!(rejected, 7);
    assert_eq!(gate.ledger.query_dispatches(), 1);
}

#[tokio::test]
async fn duplicate_confirmation_signals_generate_once() {
    let gate = support::gate::gate(support::gate::funded_ledger(10)).await;
    let cost = QueryCostQuote::for_request(&request());
    let pending = gate.queries.submit_query(cost, request()).await.unwrap();

    let results = join_all((0..5).map(|_| gate.queries.on_confirmed(pending.hash))).await;

    assert!(results.iter().all(Result::is_ok));
    assert_eq!(gate.generator.calls(), 1);
}

#[tokio::test]
async fn invalid_request_is_rejected_before_payment() {
    let gate = support::gate::gate(support::gate::funded_ledger(10)).await;
    let cost = QueryCostQuote::for_request(&request());
    let mut bad = request();
    bad.topic = String::new();

    let err = gate.queries.submit_query(cost, bad).await.unwrap_err();

    assert!(matches!(err, GateError::InvalidRequest { .. }));
    assert_eq!(gate.ledger.query_dispatches(), 0);
}
