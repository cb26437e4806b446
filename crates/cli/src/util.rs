//! Shared utilities for CLI commands

use anyhow::Result;
use chrono::{DateTime, Local, TimeZone};
use journal::Snapshot;
use owo_colors::OwoColorize;
use serde_json::Value;
use std::path::Path;

/// Format timestamp as relative time ("2 hours ago")
pub fn format_relative_time(ts_ms: u64) -> String {
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    let duration = Duration::from_millis(ts_ms);
    let datetime = UNIX_EPOCH + duration;

    if let Ok(elapsed) = SystemTime::now().duration_since(datetime) {
        let seconds = elapsed.as_secs();

        if seconds < 60 {
            format!("{} seconds ago", seconds)
        } else if seconds < 3600 {
            format!("{} minutes ago", seconds / 60)
        } else if seconds < 86400 {
            format!("{} hours ago", seconds / 3600)
        } else if seconds < 604800 {
            format!("{} days ago", seconds / 86400)
        } else {
            format!("{} weeks ago", seconds / 604800)
        }
    } else {
        "in the future".to_string()
    }
}

/// Format timestamp as local absolute time ("2024-01-03 14:30:00")
pub fn format_absolute_time(ts_ms: u64) -> String {
    let datetime: Option<DateTime<Local>> = i64::try_from(ts_ms)
        .ok()
        .and_then(|ms| Local.timestamp_millis_opt(ms).single());

    match datetime {
        Some(datetime) => datetime.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => format!("@{}ms", ts_ms),
    }
}

/// Format file size in human-readable format
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Compact single-line rendering of a document, cut at `max_chars`
pub fn preview(value: &Value, max_chars: usize) -> String {
    let rendered = value.to_string();
    if rendered.chars().count() <= max_chars {
        return rendered;
    }

    let mut cut: String = rendered.chars().take(max_chars.saturating_sub(1)).collect();
    cut.push('…');
    cut
}

/// Display a snapshot in compact format
pub fn display_snapshot_compact(snapshot: &Snapshot) {
    let id = snapshot.id.to_string();
    let id_short = &id[..8];
    println!(
        "{} {} {} {}",
        format!("#{}", snapshot.seq).yellow(),
        id_short.cyan(),
        format_relative_time(snapshot.saved_at_ms).dimmed(),
        preview(&snapshot.value, 60)
    );
}

/// Calculate directory size recursively
pub fn calculate_dir_size(dir: &Path) -> Result<u64> {
    if !dir.exists() {
        return Ok(0);
    }

    let mut total = 0u64;

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();

        if path.is_file() {
            total += entry.metadata()?.len();
        } else if path.is_dir() {
            total += calculate_dir_size(&path)?;
        }
    }

    Ok(total)
}
