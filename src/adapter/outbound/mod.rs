//! Outbound adapters (driven side).

#[cfg(feature = "evm")]
pub mod evm;
pub mod generation;
pub mod llm;
