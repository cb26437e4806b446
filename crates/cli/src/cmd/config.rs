//! Configuration command
//!
//! Shows the effective configuration, the config file location or an
//! example file.

use anyhow::{Context, Result};
use autosave_core::config::MAX_FREQUENCY_MS;
use cli_lib::settings::{self, Settings};
use owo_colors::OwoColorize;
use std::path::Path;

/// Print the effective configuration (file + flags)
pub async fn run_show(settings: &Settings, config_path: Option<&Path>) -> Result<()> {
    let location = config_path
        .map(Path::to_path_buf)
        .or_else(settings::config_file_path)
        .context("Could not determine config file path")?;

    println!("{}", "Autosave Configuration".bold());
    println!(
        "{}: {}{}\n",
        "Location".dimmed(),
        location.display().dimmed(),
        if location.exists() {
            String::new()
        } else {
            " (not present, using defaults)".dimmed().to_string()
        }
    );

    println!("{}", "[session]".yellow());
    println!(
        "  {} = {} {}",
        "frequency_ms".cyan(),
        settings.session.frequency_ms,
        format!("({:.1}s)", settings.session.frequency_ms as f64 / 1000.0).dimmed()
    );
    println!(
        "  {} = {:?}",
        "completion_order".cyan(),
        settings.session.completion_order
    );

    println!("\n{}", "[store]".yellow());
    println!(
        "  {} = {}",
        "path".cyan(),
        settings.store_path()?.display()
    );

    println!("\n{}", "Valid Ranges:".bold());
    println!("  frequency_ms: 1-{}", MAX_FREQUENCY_MS);
    println!("  completion_order: highest-wins | last-arrived");

    Ok(())
}

/// Show the config file path
pub async fn run_path(config_path: Option<&Path>) -> Result<()> {
    let path = config_path
        .map(Path::to_path_buf)
        .or_else(settings::config_file_path)
        .context("Could not determine config file path")?;

    println!("{}", path.display());
    if !path.exists() {
        println!(
            "{}",
            "File does not exist. Use 'autosave config --example' for a template.".yellow()
        );
    }

    Ok(())
}

/// Show example configuration
pub async fn run_example() -> Result<()> {
    println!("{}", settings::example_config());
    Ok(())
}
