use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use paygate::adapter::inbound::cli::command::{
    CheckCommand, Cli, ColorChoice, Commands, QuoteCommand,
};
use paygate::adapter::inbound::cli::diagnostic::ConfigDiagnostic;
use paygate::adapter::inbound::cli::output::{self, OutputConfig};
use paygate::adapter::inbound::cli::{account, check, deposit, generate, runtime};
use paygate::error::{Error, Result};
use paygate::infrastructure::config::LoggingConfig;
use tracing::{debug, error};

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {}
    }
    output::configure(OutputConfig::new(cli.json, cli.quiet, cli.verbose));

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report(&e, &cli.config);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> Result<()> {
    if let Commands::Check(CheckCommand::Config) = cli.command {
        log_level(cli, LoggingConfig::default()).init();
        return check::config::execute_config(&cli.config);
    }

    let config = runtime::load_config(&cli.config)?;
    log_level(cli, config.logging.clone()).init();
    debug!(config = %cli.config.display(), "Configuration loaded");

    match &cli.command {
        Commands::Balance => account::execute_balance(&config).await,
        Commands::Allowance(args) => account::execute_allowance(&config, args).await,
        Commands::Quote(QuoteCommand::Deposit(arg)) => {
            deposit::execute_quote(&config, arg.amount).await
        }
        Commands::Quote(QuoteCommand::Generate(args)) => generate::execute_quote(&config, args),
        Commands::Deposit(args) => deposit::execute_deposit(&config, args).await,
        Commands::Approve(args) => generate::execute_approve(&config, args).await,
        Commands::Generate(args) => generate::execute_generate(&config, args).await,
        Commands::Reconcile(args) => generate::execute_reconcile(&config, args).await,
        Commands::Check(CheckCommand::Connection) => {
            check::connection::execute_connection(&config).await
        }
        Commands::Check(CheckCommand::Config) => check::config::execute_config(&cli.config),
    }
}

/// Verbosity flags override the configured level.
fn log_level(cli: &Cli, logging: LoggingConfig) -> LoggingConfig {
    match (cli.quiet, cli.verbose) {
        (true, _) => logging.with_level("error"),
        (false, 0) => logging,
        (false, 1) => logging.with_level("debug"),
        (false, _) => logging.with_level("trace"),
    }
}

/// Print `err`, pointing into the config file when it is the culprit.
fn report(err: &Error, config_path: &Path) {
    if let Error::Config(_) = err {
        let src = std::fs::read_to_string(config_path).unwrap_or_default();
        if let Some(diagnostic) = ConfigDiagnostic::from_error(err, &src) {
            if output::is_json() {
                output::error(&diagnostic.message);
            } else {
                eprintln!("{:?}", miette::Report::new(diagnostic));
            }
            return;
        }
    }
    error!(error = %err, "Command failed");
    output::error(&err.to_string());
}
