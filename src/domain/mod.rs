//! Ledger-agnostic domain logic: amounts, rates, transactions, requests and
//! the paid-generation flow.

pub mod amount;
pub mod error;
pub mod flow;
pub mod generation;
pub mod quote;
pub mod rate;
pub mod transaction;

pub use amount::TokenAmount;
pub use flow::{FlowEvent, FlowState, Notice};
pub use generation::{Evaluation, GenerationResult};
pub use quote::{GenerationRequest, QueryCostQuote, RequestKind};
pub use rate::{ConversionRate, RateSource};
pub use transaction::{FailureKind, PendingTransaction, ReceiptStatus, TxKind, TxOutcome, TxStatus};
