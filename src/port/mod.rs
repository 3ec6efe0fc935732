//! Trait definitions (hexagonal ports). Depend only on domain.
//!
//! ```text
//!                    ┌─────────────────────────┐
//!                    │      Application        │
//!     ┌──────────────┤  Domain + Port          ├──────────────┐
//!     │              └─────────────────────────┘              │
//!     ▼                         ▼                             ▼
//! ┌─────────┐            ┌─────────────┐              ┌───────────┐
//! │ Ledger  │            │  Generator  │              │    LLM    │
//! │ Adapter │            │   Adapter   │              │  Adapter  │
//! └─────────┘            └─────────────┘              └───────────┘
//! ```
//!
//! # Available Ports
//!
//! - [`TokenLedger`] - balance, allowance, price reads and metered writes
//! - [`Generator`] - paid content generation
//! - [`Llm`] - chat completion used by the generation adapter

pub mod outbound;

pub use outbound::generation::Generator;
pub use outbound::ledger::{ContractSet, LedgerError, LedgerResult, TokenLedger};
pub use outbound::llm::{CompletionRequest, Llm};
