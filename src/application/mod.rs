//! Application services (use cases).
//!
//! These services orchestrate domain logic and drive the ledger and
//! generation ports to implement the paid-generation flow.

pub mod allowance;
pub mod balance;
pub mod config;
pub mod context;
pub mod conversion;
pub mod deposit;
pub mod flight;
pub mod monitor;
pub mod query;
pub mod session;

pub use allowance::AllowanceGate;
pub use balance::BalanceTracker;
pub use context::{GateContext, LedgerMetadata};
pub use conversion::ConversionEstimator;
pub use deposit::{DepositOrchestrator, DepositQuote};
pub use flight::RefreshTrigger;
pub use monitor::TransactionMonitor;
pub use query::QuerySubmitter;
pub use session::{PaidGeneration, SessionOutcome};
