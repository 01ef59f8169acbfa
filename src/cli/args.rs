use std::path::PathBuf;

use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{HarvestError, Result};
use crate::model::Category;

/// Incremental collector for the Steam app catalog, player counts and reviews
#[derive(Parser)]
#[command(name = "steam-harvest")]
#[command(version, propagate_version = true)]
#[command(about = "Incremental collector for the Steam app catalog, player counts and reviews")]
pub struct Cli {
    /// Output format for command results (default: output.format from the config file)
    #[arg(short, long, value_enum, global = true)]
    pub output: Option<OutputFormat>,

    /// Steam Web API token (overrides the config file)
    #[arg(long, env = "STEAM_HARVEST_TOKEN", global = true, hide_env_values = true)]
    pub token: Option<String>,

    /// Directory holding the datasets and ledger (overrides the config file)
    #[arg(long, env = "STEAM_HARVEST_DATA_DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Increase log detail (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Write a completion script for `shell` to stdout
    pub fn print_completions(shell: Shell) {
        let mut cmd = Cli::command();
        let name = cmd.get_name().to_string();
        generate(shell, &mut cmd, name, &mut std::io::stdout());
    }

    /// Output format from `--output`, falling back to the configured default
    pub fn output_format(&self, config: &Config) -> Result<OutputFormat> {
        if let Some(format) = self.output {
            return Ok(format);
        }
        OutputFormat::from_str(&config.output.format, true).map_err(|_| {
            HarvestError::Config(format!(
                "output.format must be 'pretty' or 'json', found '{}'",
                config.output.format
            ))
        })
    }

    /// Default log filter for the verbosity flags
    pub fn log_filter(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    }
}

/// Output format options
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Colored, human-readable output
    #[default]
    Pretty,
    /// JSON output for scripting
    Json,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Run one collection pass over every category that is due
    #[command(alias = "c")]
    Collect(CollectArgs),

    /// Show ledger state and dataset sizes
    #[command(alias = "s")]
    Status,

    /// Inspect or reset fetch ledger entries
    Ledger(LedgerArgs),

    /// Export stored datasets
    Export(ExportArgs),

    /// Manage configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Arguments for the collect command
#[derive(Args)]
pub struct CollectArgs {
    /// Fetch every category regardless of when it last ran
    #[arg(short, long)]
    pub force: bool,

    /// Only follow these app ids (repeatable; overrides collection.tracked_apps)
    #[arg(short, long = "app", value_name = "APP_ID")]
    pub apps: Vec<u32>,
}

/// Arguments for the ledger command
#[derive(Args)]
pub struct LedgerArgs {
    #[command(subcommand)]
    pub command: LedgerCommands,
}

/// Ledger subcommands
#[derive(Subcommand)]
pub enum LedgerCommands {
    /// Show every ledger entry
    Show,
    /// Forget a category so the next run fetches it from scratch
    Reset {
        /// Category to reset
        #[arg(value_enum)]
        category: CategoryArg,
    },
}

/// Data categories as accepted on the command line
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum CategoryArg {
    /// The app catalog
    AppList,
    /// Player count samples
    PlayerCounts,
    /// User reviews
    Reviews,
}

impl CategoryArg {
    pub fn to_category(self) -> Category {
        match self {
            Self::AppList => Category::AppList,
            Self::PlayerCounts => Category::PlayerCounts,
            Self::Reviews => Category::Reviews,
        }
    }
}

/// Arguments for the export command
#[derive(Args)]
pub struct ExportArgs {
    #[command(subcommand)]
    pub command: ExportCommands,
}

/// Export subcommands
#[derive(Subcommand)]
pub enum ExportCommands {
    /// Write stored reviews as JSON Lines (one app per line) or CSV (one review per row)
    Reviews {
        /// File format to write
        #[arg(short, long, value_enum, default_value = "jsonl")]
        format: ExportFormat,

        /// Destination file (default: reviews/combined_reviews/all_reviews.jsonl
        /// or reviews/PBI_review_ready/all_reviews.csv under the data directory)
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

/// Review export file formats
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExportFormat {
    /// One `{appid, reviews}` JSON object per line
    #[default]
    Jsonl,
    /// Flattened table with one row per review
    Csv,
}

/// Arguments for the config command
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

/// Config subcommands
#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (e.g., api.token)
        key: String,
        /// Value to set
        value: String,
    },
    /// Show configuration file path
    Path,
    /// Initialize configuration interactively
    Init,
}

/// Arguments for the completions command
#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}
