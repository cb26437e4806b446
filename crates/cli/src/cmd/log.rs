//! List recent snapshots

use anyhow::{Context, Result};
use cli_lib::settings::Settings;
use cli_lib::util;
use journal::Journal;
use owo_colors::OwoColorize;

pub async fn run(settings: &Settings, limit: Option<usize>) -> Result<()> {
    let limit = limit.unwrap_or(20);
    let store_path = settings.store_path()?;

    if !store_path.exists() {
        println!("{}", "No snapshots yet".dimmed());
        println!(
            "  {}",
            format!("Store {} does not exist", store_path.display()).dimmed()
        );
        return Ok(());
    }

    let journal = Journal::open(&store_path).context("Failed to open snapshot journal")?;
    let snapshots = journal.last_n(limit)?;

    println!(
        "{} ({} total, {} on disk)",
        "Snapshot Timeline".bold(),
        journal.count(),
        util::format_size(util::calculate_dir_size(&store_path)?)
    );
    println!("{}: {}\n", "Store".dimmed(), store_path.display().dimmed());

    if snapshots.is_empty() {
        println!("{}", "No snapshots yet".dimmed());
        return Ok(());
    }

    // Newest first
    for snapshot in snapshots.iter().rev() {
        util::display_snapshot_compact(snapshot);
    }

    if let Some(latest) = snapshots.last() {
        println!(
            "\n{} {}",
            "Latest saved at".dimmed(),
            util::format_absolute_time(latest.saved_at_ms)
        );
    }

    Ok(())
}
