//! Terminal and JSON-lines output for the gate commands.
//!
//! Human output uses colored symbols and braille spinners. With `--json`
//! every line is an object `{"type": ..., "payload": ...}`: progress lines
//! carry a message, and each command ends with one typed [`Record`] holding
//! its result.

use std::fmt::Display;

use alloy_primitives::{Address, TxHash, U256};
use owo_colors::OwoColorize;
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::json;

use crate::application::DepositQuote;
use crate::domain::generation::GenerationResult;
use crate::domain::quote::GenerationRequest;
use crate::domain::transaction::TxKind;

/// Output settings taken from the global flags.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputConfig {
    pub json: bool,
    pub quiet: bool,
    /// 0 = normal, 1+ = increasingly verbose.
    pub verbose: u8,
}

impl OutputConfig {
    #[must_use]
    pub const fn new(json: bool, quiet: bool, verbose: u8) -> Self {
        Self {
            json,
            quiet,
            verbose,
        }
    }
}

/// Result of a command in `--json` mode.
#[derive(Debug, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum Record<'a> {
    Balance {
        account: Address,
        balance: String,
        raw: U256,
    },
    Allowance {
        owner: Address,
        spender: Address,
        allowance: String,
    },
    DepositQuote(&'a DepositQuote),
    Deposit {
        tx: TxHash,
        balance: String,
    },
    GenerationQuote {
        request: &'a GenerationRequest,
        cost: u64,
    },
    Approval {
        tx: TxHash,
        spender: Address,
        allowance: String,
    },
    Generation {
        tx: TxHash,
        result: &'a GenerationResult,
    },
    /// A transaction that outlived the wait and may still land.
    Pending {
        tx: TxHash,
        kind: TxKind,
    },
    Reconcile {
        tx: TxHash,
        status: &'static str,
    },
    Error {
        message: &'a str,
    },
}

static OUTPUT: RwLock<OutputConfig> = parking_lot::const_rwlock(OutputConfig::new(false, false, 0));

fn settings() -> OutputConfig {
    *OUTPUT.read()
}

fn suppressed(config: OutputConfig) -> bool {
    !config.json && config.quiet
}

fn json_line(kind: &str, payload: serde_json::Value) {
    println!("{}", json!({ "type": kind, "payload": payload }));
}

/// Apply the global flags.
pub fn configure(config: OutputConfig) {
    *OUTPUT.write() = config;
}

#[must_use]
pub fn is_json() -> bool {
    settings().json
}

/// Whether confirmation prompts may be shown.
#[must_use]
pub fn is_interactive() -> bool {
    let config = settings();
    !config.json && !config.quiet
}

/// Print the result record of a command (JSON mode only).
pub fn emit(record: &Record<'_>) {
    if !is_json() {
        return;
    }
    match serde_json::to_string(record) {
        Ok(line) => println!("{line}"),
        Err(e) => tracing::warn!(error = %e, "Unserializable output record"),
    }
}

pub fn field(label: &str, value: impl Display) {
    let config = settings();
    let value = value.to_string();
    if config.json {
        json_line("field", json!({ "label": label, "value": value }));
        return;
    }
    if suppressed(config) {
        return;
    }
    println!("  {:<12} {}", label.dimmed(), value);
}

pub fn success(message: &str) {
    let config = settings();
    if config.json {
        json_line("success", json!({ "message": message }));
        return;
    }
    if suppressed(config) {
        return;
    }
    println!("  {} {}", "✓".green(), message);
}

/// Shown even in quiet mode.
pub fn warning(message: &str) {
    if is_json() {
        json_line("warning", json!({ "message": message }));
        return;
    }
    println!("  {} {}", "⚠".yellow(), message);
}

/// Print an error to stderr.
pub fn error(message: &str) {
    if is_json() {
        match serde_json::to_string(&Record::Error { message }) {
            Ok(line) => eprintln!("{line}"),
            Err(_) => eprintln!("{message}"),
        }
        return;
    }
    eprintln!("  {} {}", "×".red(), message);
}

pub fn section(title: &str) {
    let config = settings();
    if config.json {
        json_line("section", json!({ "title": title }));
        return;
    }
    if suppressed(config) {
        return;
    }
    println!();
    println!("{}", title.bold());
}

pub fn hint(message: &str) {
    let config = settings();
    if config.json {
        json_line("hint", json!({ "message": message }));
        return;
    }
    if suppressed(config) {
        return;
    }
    println!("  {}: {}", "hint".cyan().dimmed(), message.dimmed());
}

/// Print generated content.
///
/// Quiet mode prints it bare instead of suppressing it, since it is what
/// was paid for.
pub fn lines(content: &str) {
    let config = settings();
    if config.json {
        return;
    }
    if config.quiet {
        println!("{content}");
        return;
    }
    println!();
    for line in content.lines() {
        println!("  {line}");
    }
}

const BRAILLE_SPINNER: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Start a spinner for a ledger wait. Hidden in JSON or quiet mode.
pub fn spinner(message: &str) -> indicatif::ProgressBar {
    let config = settings();
    if config.json || config.quiet {
        let pb = indicatif::ProgressBar::hidden();
        pb.set_message(message.to_string());
        return pb;
    }

    let pb = indicatif::ProgressBar::new_spinner();
    if let Ok(style) = indicatif::ProgressStyle::default_spinner()
        .tick_strings(BRAILLE_SPINNER)
        .template("  {spinner:.cyan} {msg}")
    {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(80));
    pb
}

pub fn spinner_success(pb: &indicatif::ProgressBar, message: &str) {
    let config = settings();
    if config.json || config.quiet {
        pb.finish_and_clear();
        return;
    }
    pb.finish_with_message(format!("{} {}", "✓".green(), message));
}

/// Failures stay visible in quiet mode.
pub fn spinner_fail(pb: &indicatif::ProgressBar, message: &str) {
    if is_json() {
        pb.finish_and_clear();
        json_line("warning", json!({ "message": message }));
        return;
    }
    pb.finish_with_message(format!("{} {}", "×".red(), message));
}

/// A token amount, highlighted for the terminal.
pub fn tokens(display: impl Display) -> String {
    let value = format!("{display} tokens");
    if is_json() {
        return value;
    }
    format!("{}", value.cyan())
}

pub fn muted(value: impl Display) -> String {
    let value = value.to_string();
    if is_json() {
        return value;
    }
    format!("{}", value.dimmed())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::quote::RequestKind;

    #[test]
    fn records_are_tagged_with_snake_case_type() {
        let request = GenerationRequest::new("penguins", "mistral-31-24b").with_kind(RequestKind::Long);
        let line = serde_json::to_value(Record::GenerationQuote {
            request: &request,
            cost: 6,
        })
        .unwrap();

        assert_eq!(line["type"], "generation_quote");
        assert_eq!(line["payload"]["cost"], 6);
        assert_eq!(line["payload"]["request"]["topic"], "penguins");
    }

    #[test]
    fn pending_record_names_the_transaction_kind() {
        let line = serde_json::to_value(Record::Pending {
            tx: TxHash::repeat_byte(1),
            kind: TxKind::Approval,
        })
        .unwrap();

        assert_eq!(line["type"], "pending");
        assert_eq!(line["payload"]["kind"], "approval");
    }
}
