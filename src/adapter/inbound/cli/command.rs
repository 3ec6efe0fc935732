//! Command-line interface definitions.
//!
//! Defines the CLI structure for the paygate binary using `clap`. Each
//! subcommand drives one gate operation against the configured ledger.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;

use super::paths;
use crate::domain::quote::{GenerationRequest, RequestKind};

/// Token-allowance gated, pay-per-use AI generation
#[derive(Parser, Debug)]
#[command(name = "paygate")]
#[command(version)]
#[command(about)]
pub struct Cli {
    /// Color output mode [auto, always, never]
    #[arg(
        long,
        global = true,
        default_value = "auto",
        hide_possible_values = true
    )]
    pub color: ColorChoice,

    /// JSON output for scripting
    #[arg(long, global = true)]
    pub json: bool,

    /// Decrease output verbosity
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Increase output verbosity
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Path to the configuration file
    #[arg(short, long, global = true, default_value_os_t = paths::default_config())]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

/// Color output mode for terminal rendering.
#[derive(Clone, Debug, Default, clap::ValueEnum)]
pub enum ColorChoice {
    /// Detect automatically
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the token balance of the connected account
    Balance,

    /// Show the allowance granted to a gate contract
    Allowance(AllowanceArgs),

    /// Estimate a deposit or the cost of a generation
    #[command(subcommand)]
    Quote(QuoteCommand),

    /// Deposit base currency for tokens
    Deposit(DepositArgs),

    /// Grant a gate contract an allowance
    Approve(ApproveArgs),

    /// Pay for and run a generation
    Generate(GenerateArgs),

    /// Look up a query transaction that timed out locally
    Reconcile(ReconcileArgs),

    /// Run diagnostic checks
    #[command(subcommand)]
    Check(CheckCommand),
}

/// Subcommands for `paygate quote`.
#[derive(Subcommand, Debug)]
pub enum QuoteCommand {
    /// Tokens minted for a deposit at the current rate
    Deposit(AmountArg),
    /// Token cost of a generation request
    Generate(RequestArgs),
}

/// Subcommands for `paygate check`.
#[derive(Subcommand, Debug)]
pub enum CheckCommand {
    /// Validate the configuration file syntax and semantics.
    Config,
    /// Read contract metadata from the configured RPC endpoint.
    Connection,
}

/// Which gate contract an allowance applies to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum SpenderChoice {
    /// The query contract charging per generation
    #[default]
    Query,
    /// The deposit manager
    Deposit,
}

#[derive(Args, Debug)]
pub struct AllowanceArgs {
    /// Spender contract
    #[arg(long, value_enum, default_value_t = SpenderChoice::Query)]
    pub spender: SpenderChoice,
}

#[derive(Args, Debug)]
pub struct AmountArg {
    /// Amount in human units (e.g. 0.05)
    pub amount: Decimal,
}

#[derive(Args, Debug)]
pub struct DepositArgs {
    /// Base currency to deposit (e.g. 0.01)
    pub amount: Decimal,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Args, Debug)]
pub struct ApproveArgs {
    /// Tokens to approve
    pub amount: Decimal,

    /// Spender contract
    #[arg(long, value_enum, default_value_t = SpenderChoice::Query)]
    pub spender: SpenderChoice,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

/// Parameters of a generation request.
#[derive(Args, Debug, Clone)]
pub struct RequestArgs {
    /// Subject of the joke
    #[arg(long)]
    pub topic: String,

    /// Tone, e.g. witty, dry, absurd
    #[arg(long, default_value = "witty")]
    pub tone: String,

    /// Length class [one-liner, short, long]
    #[arg(long, default_value = "short")]
    pub kind: RequestKind,

    /// Creativity (sampling temperature) between 0.1 and 1.0
    #[arg(long, default_value_t = 0.7)]
    pub creativity: f64,

    /// Model identifier; defaults to the configured model
    #[arg(long)]
    pub model: Option<String>,
}

impl RequestArgs {
    /// Build the request, falling back to `default_model`.
    #[must_use]
    pub fn to_request(&self, default_model: &str) -> GenerationRequest {
        GenerationRequest::new(
            self.topic.clone(),
            self.model.clone().unwrap_or_else(|| default_model.to_string()),
        )
        .with_tone(self.tone.clone())
        .with_kind(self.kind)
        .with_creativity(self.creativity)
    }
}

#[derive(Args, Debug)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub request: RequestArgs,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Seconds to keep checking a query that timed out locally
    #[arg(long, default_value_t = 60)]
    pub reconcile_secs: u64,
}

#[derive(Args, Debug)]
pub struct ReconcileArgs {
    /// Transaction hash of the query
    pub tx: alloy_primitives::TxHash,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use rust_decimal_macros::dec;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_name() {
        let cmd = Cli::command();
        assert_eq!(cmd.get_name(), "paygate");
        assert!(cmd.get_version().is_some());
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["paygate", "balance", "--json", "-vv"]).unwrap();
        assert!(matches!(cli.command, Commands::Balance));
        assert!(cli.json);
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_parse_config_path() {
        let cli = Cli::try_parse_from(["paygate", "-c", "/tmp/x.toml", "check", "config"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("/tmp/x.toml"));
        assert!(matches!(cli.command, Commands::Check(CheckCommand::Config)));
    }

    #[test]
    fn test_parse_deposit_amount() {
        let cli = Cli::try_parse_from(["paygate", "deposit", "0.05", "--yes"]).unwrap();
        let Commands::Deposit(args) = cli.command else {
            panic!("expected deposit");
        };
        assert_eq!(args.amount, dec!(0.05));
        assert!(args.yes);
    }

    #[test]
    fn test_parse_approve_spender() {
        let cli = Cli::try_parse_from(["paygate", "approve", "10", "--spender", "deposit"]).unwrap();
        let Commands::Approve(args) = cli.command else {
            panic!("expected approve");
        };
        assert_eq!(args.spender, SpenderChoice::Deposit);
    }

    #[test]
    fn test_parse_generate_request() {
        let cli = Cli::try_parse_from([
            "paygate",
            "generate",
            "--topic",
            "penguins",
            "--kind",
            "one-liner",
            "--creativity",
            "0.3",
        ])
        .unwrap();
        let Commands::Generate(args) = cli.command else {
            panic!("expected generate");
        };
        let request = args.request.to_request("mistral-31-24b");
        assert_eq!(request.kind, RequestKind::OneLiner);
        assert_eq!(request.model, "mistral-31-24b");
        assert_eq!(request.tone, "witty");
        assert_eq!(args.reconcile_secs, 60);
    }

    #[test]
    fn test_parse_rejects_unknown_kind() {
        let result =
            Cli::try_parse_from(["paygate", "quote", "generate", "--topic", "x", "--kind", "epic"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_reconcile_hash() {
        let hash = format!("0x{}", "ab".repeat(32));
        let cli = Cli::try_parse_from(["paygate", "reconcile", &hash]).unwrap();
        let Commands::Reconcile(args) = cli.command else {
            panic!("expected reconcile");
        };
        assert_eq!(args.tx, alloy_primitives::TxHash::repeat_byte(0xab));
    }
}
