//! Shared test utilities available to both unit and integration tests.
//!
//! Enabled via `#[cfg(test)]` (unit tests) or the `testkit` feature
//! (integration tests).
//!
//! # Modules
//!
//! - [`ledger`] - `ScriptedLedger`, an in-memory [`TokenLedger`](crate::port::TokenLedger)
//!   with controllable receipts, failures and dispatch counters.
//! - [`generator`] - `RecordingGenerator`, a [`Generator`](crate::port::Generator)
//!   that counts calls.
//! - [`gate`] - a fully wired gate over the two doubles.

pub mod gate;
pub mod generator;
pub mod ledger;

use alloy_primitives::{Address, U256};

use crate::domain::amount::pow10;
use crate::domain::quote::{GenerationRequest, RequestKind};
use crate::port::ContractSet;

/// The signer of the scripted ledger.
#[must_use]
pub fn account() -> Address {
    Address::repeat_byte(0xaa)
}

#[must_use]
pub fn token() -> Address {
    Address::repeat_byte(0x01)
}

#[must_use]
pub fn deposit_manager() -> Address {
    Address::repeat_byte(0x02)
}

#[must_use]
pub fn query_tool() -> Address {
    Address::repeat_byte(0x03)
}

#[must_use]
pub fn contracts() -> ContractSet {
    ContractSet {
        token: token(),
        deposit_manager: deposit_manager(),
        query_tool: query_tool(),
    }
}

/// `n` whole tokens in raw units at 18 decimals.
#[must_use]
pub fn tokens(n: u64) -> U256 {
    U256::from(n) * pow10(18)
}

/// A short request at creativity 0.7, which costs 4 tokens.
#[must_use]
pub fn request() -> GenerationRequest {
    GenerationRequest::new("penguins", "test-model")
        .with_kind(RequestKind::Short)
        .with_creativity(0.7)
}

/// A long request at creativity 0.1, which costs 5 tokens.
#[must_use]
pub fn long_request() -> GenerationRequest {
    GenerationRequest::new("tax season", "test-model")
        .with_kind(RequestKind::Long)
        .with_creativity(0.1)
}
