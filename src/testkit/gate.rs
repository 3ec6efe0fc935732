//! A fully wired gate over the scripted ledger and recording generator.

use std::sync::Arc;

use crate::infrastructure::config::Config;
use crate::infrastructure::Gate;

use super::generator::RecordingGenerator;
use super::ledger::ScriptedLedger;

/// Gate services plus handles on the doubles behind them.
pub struct TestGate {
    pub gate: Gate,
    pub ledger: Arc<ScriptedLedger>,
    pub generator: Arc<RecordingGenerator>,
}

impl TestGate {
    /// Wire and connect a gate with default settings.
    ///
    /// # Panics
    ///
    /// Panics if the scripted ledger cannot be connected.
    pub async fn connect(ledger: ScriptedLedger, generator: RecordingGenerator) -> Self {
        Self::connect_with(ledger, generator, &Config::default()).await
    }

    /// Wire and connect a gate with `config`.
    ///
    /// # Panics
    ///
    /// Panics if the scripted ledger cannot be connected.
    pub async fn connect_with(
        ledger: ScriptedLedger,
        generator: RecordingGenerator,
        config: &Config,
    ) -> Self {
        let ledger = Arc::new(ledger);
        let generator = Arc::new(generator);
        let gate = Gate::assemble(
            Arc::clone(&ledger) as Arc<dyn crate::port::TokenLedger>,
            Arc::clone(&generator) as Arc<dyn crate::port::Generator>,
            config,
        );
        gate.connect().await.expect("scripted ledger connects");
        Self {
            gate,
            ledger,
            generator,
        }
    }
}

impl std::ops::Deref for TestGate {
    type Target = Gate;

    fn deref(&self) -> &Gate {
        &self.gate
    }
}
