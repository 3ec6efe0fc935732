//! Generation adapters.
//!
//! Implement [`Generator`](crate::port::Generator) over a completion model.

mod llm;

pub use llm::LlmGenerator;
