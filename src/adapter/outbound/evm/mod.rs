//! EVM ledger adapter over JSON-RPC.
//!
//! Implements [`TokenLedger`](crate::port::TokenLedger) with alloy contract
//! bindings. Compiled with the `evm` feature.

mod contracts;
mod ledger;

pub use ledger::EvmLedger;
