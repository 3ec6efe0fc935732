//! Paygate - token-allowance gated, pay-per-use AI generation.
//!
//! Every generation is paid for on an EVM ledger: the account approves the
//! query contract for the request's token cost, the query transaction is
//! mined, and only then is content generated, exactly once per payment.
//! Accounts top up by depositing base currency, which the deposit manager
//! converts to tokens at its oracle rate.
//!
//! # Architecture
//!
//! - [`domain`] - Amounts, rates, pricing, transactions and the flow state machine
//! - [`port`] - Traits for the ledger, the generator and the LLM endpoint
//! - [`application`] - Gate services: allowance, balance, deposits, queries, sessions
//! - [`adapter`] - CLI plus the EVM ledger and OpenAI-compatible generator
//! - [`infrastructure`] - Configuration and service wiring
//!
//! # Features
//!
//! - `evm` (default) - JSON-RPC ledger backed by alloy
//! - `testkit` - Scripted ledger and recording generator for tests
//!
//! # Example
//!
//! ```
//! use paygate::domain::{GenerationRequest, QueryCostQuote, RequestKind};
//!
//! let request = GenerationRequest::new("penguins", "mistral-31-24b").with_kind(RequestKind::Long);
//! assert_eq!(QueryCostQuote::for_request(&request).tokens(), 6);
//! ```

pub mod adapter;
pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod port;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
