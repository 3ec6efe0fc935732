//! LLM adapter modules.
//!
//! Provides implementations of the [`Llm`](crate::port::outbound::llm::Llm) trait
//! for OpenAI-compatible chat completion endpoints.

pub mod client;
pub mod openai;

pub use openai::OpenAi;
