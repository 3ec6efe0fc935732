//! CLI module graph.

pub mod account;
pub mod check;
pub mod command;
pub mod deposit;
pub mod diagnostic;
pub mod generate;
pub mod output;
pub mod paths;
pub mod runtime;
