//! Infrastructure configuration modules.

pub mod chain;
pub mod llm;
pub mod logging;
pub mod settings;
pub mod wallet;

pub use chain::ChainConfig;
pub use llm::LlmConfig;
pub use logging::LoggingConfig;
pub use settings::Config;
pub use wallet::WalletConfig;
