use std::time::Duration;

use paygate::domain::ReceiptStatus;
use paygate::testkit::gate::TestGate;
use paygate::testkit::generator::RecordingGenerator;
use paygate::testkit::ledger::ScriptedLedger;
use paygate::testkit::{account, query_tool, tokens};

/// Every write mines one second after dispatch.
pub fn mining_ledger() -> ScriptedLedger {
    ScriptedLedger::new().with_auto_mine(Duration::from_secs(1), ReceiptStatus::Success)
}

/// A ledger where the account already covers `allowance` whole tokens.
pub fn funded_ledger(allowance: u64) -> ScriptedLedger {
    ScriptedLedger::new()
        .with_balance(account(), tokens(100))
        .with_allowance(account(), query_tool(), tokens(allowance))
}

pub async fn gate(ledger: ScriptedLedger) -> TestGate {
    TestGate::connect(ledger, RecordingGenerator::new()).await
}
