use clap::Parser;
use colored::{control::set_override, Colorize};
use is_terminal::IsTerminal;
use tracing_subscriber::EnvFilter;

use steam_harvest::cli::args::{Cli, Commands, CompletionsArgs};
use steam_harvest::cli::commands;
use steam_harvest::config::Config;
use steam_harvest::error::HarvestError;

fn main() {
    // Respect NO_COLOR environment variable (https://no-color.org/)
    // Also disable colors when stdout is not a terminal (for piping)
    if std::env::var("NO_COLOR").is_ok() || !std::io::stdout().is_terminal() {
        set_override(false);
    }

    match run() {
        Ok(0) => {}
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            std::process::exit(e.exit_code());
        }
    }
}

/// Logs go to stderr so JSON output on stdout stays parseable
fn init_logging(cli: &Cli) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("steam_harvest={}", cli.log_filter())));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run() -> Result<i32, HarvestError> {
    let cli = Cli::parse();

    // Handle completions command early (no config needed)
    if let Commands::Completions(CompletionsArgs { shell }) = &cli.command {
        Cli::print_completions(*shell);
        return Ok(0);
    }

    init_logging(&cli);

    let mut config = Config::load()?;
    let format = cli.output_format(&config)?;
    let token = cli.token.as_deref();
    let data_dir = cli.data_dir.as_deref();

    let (output, code) = match &cli.command {
        Commands::Collect(args) => {
            let (output, outcome) = commands::collect(&config, token, data_dir, args, format)?;
            (output, outcome.exit_code())
        }
        Commands::Status => (commands::status(&config, data_dir, format)?, 0),
        Commands::Ledger(args) => (commands::ledger(&config, data_dir, args, format)?, 0),
        Commands::Export(args) => (commands::export(&config, data_dir, args, format)?, 0),
        Commands::Config(args) => (commands::config(&mut config, args, format)?, 0),
        Commands::Completions(_) => unreachable!(), // Handled above
    };

    if !output.is_empty() {
        println!("{output}");
    }

    Ok(code)
}
