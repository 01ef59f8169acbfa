use std::path::PathBuf;

use colored::Colorize;

use super::common::mask_token;
use crate::cli::args::{ConfigArgs, ConfigCommands, OutputFormat};
use crate::config::{Config, Paths};
use crate::error::{HarvestError, Result};

const VALID_KEYS: &str = "api.token, api.api_base_url, api.store_base_url, api.timeout_secs, \
output.directory, output.format, collection.app_list_interval_hours, \
collection.player_count_interval_minutes, collection.review_interval_hours, \
collection.app_list_page_size, collection.reviews_per_page, collection.max_reviews_per_app, \
collection.review_language, collection.tracked_apps, retry.base_delay_ms, retry.max_delay_ms, \
retry.max_attempts, retry.min_request_interval_ms";

/// Handle the config command
pub fn config(config: &mut Config, args: &ConfigArgs, format: OutputFormat) -> Result<String> {
    let paths = Paths::new()?;
    match &args.command {
        ConfigCommands::Show => config_show(config, format),
        ConfigCommands::Set { key, value } => config_set(config, &paths, key, value, format),
        ConfigCommands::Path => config_path(&paths, format),
        ConfigCommands::Init => config_init(config, &paths, format),
    }
}

/// Show current configuration
fn config_show(config: &Config, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Pretty => {
            let mut output = String::new();
            output.push_str(&format!("{}\n", "Configuration".bold()));
            output.push_str(&"─".repeat(40));
            output.push('\n');

            output.push_str(&format!("\n{}\n", "[api]".cyan()));
            let token_display = config
                .api
                .token
                .as_deref()
                .map(mask_token)
                .unwrap_or_else(|| "(not set)".dimmed().to_string());
            output.push_str(&format!("  token = {}\n", token_display));
            output.push_str(&format!("  api_base_url = {}\n", config.api.api_base_url));
            output.push_str(&format!("  store_base_url = {}\n", config.api.store_base_url));
            output.push_str(&format!("  timeout_secs = {}\n", config.api.timeout_secs));

            output.push_str(&format!("\n{}\n", "[output]".cyan()));
            output.push_str(&format!("  directory = {}\n", config.output.directory.display()));
            output.push_str(&format!("  format = {}\n", config.output.format));

            let collection = &config.collection;
            output.push_str(&format!("\n{}\n", "[collection]".cyan()));
            output.push_str(&format!(
                "  app_list_interval_hours = {}\n",
                collection.app_list_interval_hours
            ));
            output.push_str(&format!(
                "  player_count_interval_minutes = {}\n",
                collection.player_count_interval_minutes
            ));
            output.push_str(&format!(
                "  review_interval_hours = {}\n",
                collection.review_interval_hours
            ));
            output.push_str(&format!("  app_list_page_size = {}\n", collection.app_list_page_size));
            output.push_str(&format!("  reviews_per_page = {}\n", collection.reviews_per_page));
            output.push_str(&format!("  max_reviews_per_app = {}\n", collection.max_reviews_per_app));
            output.push_str(&format!("  review_language = {}\n", collection.review_language));
            let tracked = if collection.tracked_apps.is_empty() {
                "(whole catalog)".dimmed().to_string()
            } else {
                join_ids(&collection.tracked_apps)
            };
            output.push_str(&format!("  tracked_apps = {}\n", tracked));

            let retry = &config.retry;
            output.push_str(&format!("\n{}\n", "[retry]".cyan()));
            output.push_str(&format!("  base_delay_ms = {}\n", retry.base_delay_ms));
            output.push_str(&format!("  max_delay_ms = {}\n", retry.max_delay_ms));
            output.push_str(&format!("  max_attempts = {}\n", retry.max_attempts));
            output.push_str(&format!(
                "  min_request_interval_ms = {}\n",
                retry.min_request_interval_ms
            ));

            Ok(output)
        }
        OutputFormat::Json => {
            // Don't expose the full token in JSON output either
            let mut safe_config = config.clone();
            safe_config.api.token = safe_config.api.token.as_deref().map(mask_token);
            Ok(serde_json::to_string_pretty(&safe_config)?)
        }
    }
}

fn join_ids(ids: &[u32]) -> String {
    ids.iter().map(u32::to_string).collect::<Vec<_>>().join(",")
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        HarvestError::InvalidArgument(format!("{key} must be a non-negative whole number"))
    })
}

fn parse_app_ids(value: &str) -> Result<Vec<u32>> {
    value
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| parse_number("collection.tracked_apps", part))
        .collect()
}

/// Apply one `key = value` assignment to the configuration
fn apply_setting(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        "api.token" => config.set_token(value.to_string()),
        "api.api_base_url" => config.api.api_base_url = value.to_string(),
        "api.store_base_url" => config.api.store_base_url = value.to_string(),
        "api.timeout_secs" => config.api.timeout_secs = parse_number(key, value)?,
        "output.directory" => config.output.directory = PathBuf::from(value),
        "output.format" => {
            if value != "pretty" && value != "json" {
                return Err(HarvestError::InvalidArgument(
                    "output.format must be 'pretty' or 'json'".to_string(),
                ));
            }
            config.output.format = value.to_string();
        }
        "collection.app_list_interval_hours" => {
            config.collection.app_list_interval_hours = parse_number(key, value)?
        }
        "collection.player_count_interval_minutes" => {
            config.collection.player_count_interval_minutes = parse_number(key, value)?
        }
        "collection.review_interval_hours" => {
            config.collection.review_interval_hours = parse_number(key, value)?
        }
        "collection.app_list_page_size" => {
            config.collection.app_list_page_size = parse_number(key, value)?
        }
        "collection.reviews_per_page" => {
            let per_page: u32 = parse_number(key, value)?;
            if !(1..=100).contains(&per_page) {
                return Err(HarvestError::InvalidArgument(
                    "collection.reviews_per_page must be between 1 and 100".to_string(),
                ));
            }
            config.collection.reviews_per_page = per_page;
        }
        "collection.max_reviews_per_app" => {
            config.collection.max_reviews_per_app = parse_number(key, value)?
        }
        "collection.review_language" => config.collection.review_language = value.to_string(),
        "collection.tracked_apps" => config.collection.tracked_apps = parse_app_ids(value)?,
        "retry.base_delay_ms" => config.retry.base_delay_ms = parse_number(key, value)?,
        "retry.max_delay_ms" => config.retry.max_delay_ms = parse_number(key, value)?,
        "retry.max_attempts" => config.retry.max_attempts = parse_number(key, value)?,
        "retry.min_request_interval_ms" => {
            config.retry.min_request_interval_ms = parse_number(key, value)?
        }
        _ => {
            return Err(HarvestError::InvalidArgument(format!(
                "Unknown config key: {}. Valid keys: {}",
                key, VALID_KEYS
            )));
        }
    }
    Ok(())
}

/// Set a configuration value
fn config_set(
    config: &mut Config,
    paths: &Paths,
    key: &str,
    value: &str,
    format: OutputFormat,
) -> Result<String> {
    apply_setting(config, key, value)?;
    config.save_to(paths)?;

    let shown = if key == "api.token" {
        mask_token(value)
    } else {
        value.to_string()
    };
    match format {
        OutputFormat::Pretty => Ok(format!("{} Set {} = {}", "✓".green(), key, shown)),
        OutputFormat::Json => {
            let result = serde_json::json!({
                "success": true,
                "key": key,
                "value": shown
            });
            Ok(serde_json::to_string_pretty(&result)?)
        }
    }
}

/// Show configuration file path
fn config_path(paths: &Paths, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Pretty => {
            let mut output = String::new();
            output.push_str(&format!("Config file: {}\n", paths.config_file.display()));
            output.push_str(&format!(
                "Exists: {}\n",
                if paths.config_exists() {
                    "yes".green()
                } else {
                    "no".yellow()
                }
            ));
            Ok(output)
        }
        OutputFormat::Json => {
            let result = serde_json::json!({
                "path": paths.config_file.display().to_string(),
                "exists": paths.config_exists()
            });
            Ok(serde_json::to_string_pretty(&result)?)
        }
    }
}

/// Initialize configuration interactively
fn config_init(config: &mut Config, paths: &Paths, format: OutputFormat) -> Result<String> {
    if format == OutputFormat::Json {
        return Err(HarvestError::InvalidArgument(
            "config init requires interactive mode (--output pretty)".to_string(),
        ));
    }

    println!("{}", "steam-harvest Configuration".bold());
    println!("{}", "─".repeat(40));
    println!();

    // Hidden prompt, the token is a secret
    let token = rpassword::prompt_password("Enter your Steam Web API token: ")?;
    let token = token.trim().to_string();

    if token.is_empty() {
        return Err(HarvestError::InvalidArgument(
            "API token cannot be empty".to_string(),
        ));
    }

    config.set_token(token);
    config.save_to(paths)?;

    Ok(format!(
        "\n{} Configuration saved to: {}\n\nRun '{}' to start collecting.",
        "✓".green(),
        paths.config_file.display(),
        "steam-harvest collect".cyan()
    ))
}
