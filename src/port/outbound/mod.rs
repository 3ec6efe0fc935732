//! Outbound ports (driven side): interfaces implemented by outbound adapters.
//!
//! These contracts describe the token ledger, the generation collaborator
//! and the completion model behind it.

pub mod generation;
pub mod ledger;
pub mod llm;
