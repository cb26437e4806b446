//! Interactive autosave session over stdin
//!
//! Each input line is one of:
//! - a JSON document: reported as a change
//! - `:save`: manual save
//! - `:status`: print session state
//! - `:quit`: final save and exit (EOF and Ctrl-C do the same)

use anyhow::{Context, Result};
use autosave_session::{
    Autosave, ChangeOutcome, LoadState, SequenceId, StatusEvent, StatusKind,
};
use cli_lib::project::FieldFilter;
use cli_lib::settings::Settings;
use cli_lib::store::JournalStore;
use cli_lib::util;
use owo_colors::OwoColorize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// How long the final save may take before the session is torn down anyway
const FINAL_SAVE_TIMEOUT: Duration = Duration::from_secs(5);

enum Command {
    Change(Value),
    Save,
    Status,
    Quit,
}

/// What the status hub has reported, as seen by the final save
#[derive(Debug, Clone, Copy, Default)]
struct Landing {
    saved: bool,
    failed: Option<SequenceId>,
}

impl Landing {
    fn covers(&self, id: SequenceId) -> bool {
        self.saved || self.failed.is_some_and(|failed| failed >= id)
    }
}

fn parse_line(line: &str) -> Result<Option<Command>> {
    let line = line.trim();
    match line {
        "" => Ok(None),
        ":save" => Ok(Some(Command::Save)),
        ":status" => Ok(Some(Command::Status)),
        ":quit" | ":q" => Ok(Some(Command::Quit)),
        _ if line.starts_with(':') => anyhow::bail!("Unknown command: {}", line),
        _ => {
            let value = serde_json::from_str(line).context("Invalid JSON document")?;
            Ok(Some(Command::Change(value)))
        }
    }
}

pub async fn run(settings: &Settings, ignore: Vec<String>) -> Result<()> {
    let store_path = settings.store_path()?;
    let store = JournalStore::open(&store_path)?;
    let filter = FieldFilter::new(ignore);

    if !filter.is_empty() {
        info!(
            "Ignoring fields: {}",
            filter.fields().collect::<Vec<_>>().join(", ")
        );
    }

    let autosave: Autosave<Value> = Autosave::builder(store.clone())
        .config(settings.session.clone())
        .map(move |value| filter.project(value))
        .build(store.clone())?;

    // Mirrors saved/failed reports so the final save can be awaited
    let (landing_tx, mut landing_rx) = watch::channel(Landing::default());
    let landing_tx = Arc::new(landing_tx);
    let landing_on_failure = Arc::clone(&landing_tx);
    let _subscriptions = vec![
        autosave.subscribe(StatusKind::Saved, move |event| {
            if let StatusEvent::Saved(saved) = event {
                if *saved {
                    eprintln!("{}", "✓ saved".green());
                } else {
                    eprintln!("{}", "● unsaved changes".yellow());
                }
                landing_tx.send_modify(|landing| landing.saved = *saved);
            }
        }),
        autosave.subscribe(StatusKind::SaveFailed, move |event| {
            if let StatusEvent::SaveFailed { id, message } = event {
                eprintln!("{} change {}: {}", "✗ save failed for".red(), id, message);
                landing_on_failure
                    .send_modify(|landing| landing.failed = landing.failed.max(Some(*id)));
            }
        }),
    ];

    autosave.activate()?;
    info!("Store: {}", store_path.display());

    match autosave.loaded().await {
        Some(LoadState::Ready(Value::Null)) => {
            eprintln!("{}", "No previous snapshot; starting empty".dimmed());
        }
        Some(LoadState::Ready(value)) => {
            eprintln!("{}", "Loaded latest snapshot".dimmed());
            println!("{}", value);
        }
        Some(LoadState::Failed(error)) => {
            eprintln!("{} {:#}", "Failed to load latest snapshot:".red(), error);
        }
        Some(LoadState::Loading) | None => {}
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    // Latest accepted change, and the latest change a `:save` already covers
    let mut last_accepted: Option<SequenceId> = None;
    let mut save_requested: Option<SequenceId> = None;

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("Failed to read stdin")?,
            _ = tokio::signal::ctrl_c() => {
                debug!("Interrupted");
                None
            }
        };

        let Some(line) = line else {
            debug!("End of input");
            break;
        };

        match parse_line(&line) {
            Ok(None) => {}
            Ok(Some(Command::Change(value))) => {
                if let ChangeOutcome::Accepted(id) = autosave.on_change(value)? {
                    last_accepted = Some(id);
                }
            }
            Ok(Some(Command::Save)) => {
                if autosave.manual_save() {
                    save_requested = last_accepted;
                }
            }
            Ok(Some(Command::Status)) => print_status(&autosave, &store),
            Ok(Some(Command::Quit)) => break,
            Err(err) => {
                warn!("Skipping input line: {:#}", err);
                eprintln!("{} {:#}", "✗".red(), err);
            }
        }
    }

    if let Some(last) = last_accepted {
        if autosave.status().is_saved() {
            debug!("Change {} already saved", last);
        } else {
            if save_requested != Some(last) {
                autosave.manual_save();
            }

            let landed = tokio::time::timeout(
                FINAL_SAVE_TIMEOUT,
                landing_rx.wait_for(|landing| landing.covers(last)),
            )
            .await
            .is_ok();
            if !landed {
                warn!(
                    "Final save did not finish within {}s",
                    FINAL_SAVE_TIMEOUT.as_secs()
                );
            }
        }
    }

    autosave.deactivate();

    match store.last_saved() {
        Some(snapshot) => eprintln!(
            "{} {} ({} snapshots in store)",
            "Last snapshot:".dimmed(),
            format!("#{}", snapshot.seq).yellow(),
            store.journal().count()
        ),
        None => eprintln!("{}", "Nothing saved this session".dimmed()),
    }

    Ok(())
}

fn print_status(autosave: &Autosave<Value>, store: &JournalStore) {
    let status = autosave.status();

    eprintln!("{}", "Session Status".bold());
    eprintln!("  Phase:       {:?}", autosave.phase());
    eprintln!(
        "  Saved:       {}",
        if status.is_saved() {
            "yes".green().to_string()
        } else {
            "no".yellow().to_string()
        }
    );
    eprintln!(
        "  Since save:  {}",
        match status.since_save() {
            Some(secs) => format!("{}s", secs),
            None => "never".dimmed().to_string(),
        }
    );
    eprintln!("  Snapshots:   {}", store.journal().count());
    if let Some(snapshot) = store.last_saved() {
        eprintln!(
            "  Last:        #{} {} ({})",
            snapshot.seq,
            util::preview(&snapshot.value, 40),
            util::format_absolute_time(snapshot.saved_at_ms).dimmed()
        );
    }
}
