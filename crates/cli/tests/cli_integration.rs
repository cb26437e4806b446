//! Integration tests driving the `autosave` binary

mod common;

use anyhow::Result;
use common::AutosaveCommand;
use tempfile::TempDir;

fn store_arg(dir: &TempDir) -> String {
    dir.path().join("store").to_string_lossy().into_owned()
}

#[test]
fn test_quit_saves_latest_document_once() -> Result<()> {
    let dir = TempDir::new()?;
    let store = store_arg(&dir);

    let result = autosave!(dir.path(), "run", "--store", &store, "--frequency", "60000")
        .stdin("{\"a\": 1}\n{\"a\": 2}\n:quit\n")
        .assert_success()?;
    assert!(result.contains_stderr("No previous snapshot"));
    assert!(result.contains_stderr("saved"));

    let log = autosave!(dir.path(), "log", "--store", &store).assert_success()?;
    assert_eq!(log.snapshot_seqs(), vec![1]);
    assert!(log.contains_stdout(r#"{"a":2}"#));
    assert!(!log.contains_stdout(r#"{"a":1}"#));

    Ok(())
}

#[test]
fn test_eof_behaves_like_quit() -> Result<()> {
    let dir = TempDir::new()?;
    let store = store_arg(&dir);

    autosave!(dir.path(), "run", "--store", &store, "--frequency", "60000")
        .stdin("{\"doc\": \"hello\"}\n")
        .assert_success()?;

    let log = autosave!(dir.path(), "log", "--store", &store).assert_success()?;
    assert_eq!(log.snapshot_seqs(), vec![1]);

    Ok(())
}

#[test]
fn test_next_run_loads_latest_snapshot() -> Result<()> {
    let dir = TempDir::new()?;
    let store = store_arg(&dir);

    autosave!(dir.path(), "run", "--store", &store)
        .stdin("{\"title\": \"first\"}\n")
        .assert_success()?;

    let second = autosave!(dir.path(), "run", "--store", &store)
        .stdin(":quit\n")
        .assert_success()?;
    assert!(second.contains_stdout(r#"{"title":"first"}"#));
    assert!(second.contains_stderr("Nothing saved this session"));

    Ok(())
}

#[test]
fn test_manual_saves_append_snapshots() -> Result<()> {
    let dir = TempDir::new()?;
    let store = store_arg(&dir);

    autosave!(dir.path(), "run", "--store", &store, "--frequency", "60000")
        .stdin("{\"n\": 1}\n:save\n{\"n\": 2}\n:save\n:status\n:quit\n")
        .assert_success()?;

    let log = autosave!(dir.path(), "log", "--store", &store).assert_success()?;
    assert_eq!(log.snapshot_seqs(), vec![2, 1]);
    assert!(log.contains_stdout(r#"{"n":1}"#));
    assert!(log.contains_stdout(r#"{"n":2}"#));

    Ok(())
}

#[test]
fn test_quit_after_save_does_not_resave() -> Result<()> {
    let dir = TempDir::new()?;
    let store = store_arg(&dir);

    autosave!(dir.path(), "run", "--store", &store, "--frequency", "60000")
        .stdin("{\"n\": 1}\n:save\n:quit\n")
        .assert_success()?;

    let log = autosave!(dir.path(), "log", "--store", &store).assert_success()?;
    assert_eq!(log.snapshot_seqs(), vec![1]);

    Ok(())
}

#[test]
fn test_ignored_fields_are_not_saved() -> Result<()> {
    let dir = TempDir::new()?;
    let store = store_arg(&dir);

    autosave!(
        dir.path(),
        "run",
        "--store",
        &store,
        "--frequency",
        "60000",
        "--ignore",
        "cursor"
    )
    .stdin("{\"text\": \"x\", \"cursor\": 1}\n{\"text\": \"x\", \"cursor\": 5}\n:quit\n")
    .assert_success()?;

    let log = autosave!(dir.path(), "log", "--store", &store).assert_success()?;
    assert_eq!(log.snapshot_seqs(), vec![1]);
    assert!(log.contains_stdout(r#"{"text":"x"}"#));
    assert!(!log.contains_stdout("cursor"));

    Ok(())
}

#[test]
fn test_invalid_lines_are_skipped() -> Result<()> {
    let dir = TempDir::new()?;
    let store = store_arg(&dir);

    let result = autosave!(dir.path(), "run", "--store", &store)
        .stdin("{broken\n:nope\n{\"ok\": true}\n")
        .assert_success()?;
    assert!(result.contains_stderr("Invalid JSON document"));
    assert!(result.contains_stderr("Unknown command"));

    let log = autosave!(dir.path(), "log", "--store", &store).assert_success()?;
    assert!(log.contains_stdout(r#"{"ok":true}"#));

    Ok(())
}

#[test]
fn test_log_on_missing_store() -> Result<()> {
    let dir = TempDir::new()?;
    let store = store_arg(&dir);

    let log = autosave!(dir.path(), "log", "--store", &store).assert_success()?;
    assert!(log.contains_stdout("No snapshots yet"));

    Ok(())
}

#[test]
fn test_log_file_receives_logs() -> Result<()> {
    let dir = TempDir::new()?;
    let store = store_arg(&dir);
    let log_file = dir.path().join("autosave.log");

    autosave!(
        dir.path(),
        "run",
        "--store",
        &store,
        "--log-file",
        log_file.to_str().unwrap()
    )
    .stdin("{\"a\": 1}\n")
    .assert_success()?;

    let contents = std::fs::read_to_string(&log_file)?;
    assert!(contents.contains("Autosave session activated"));
    assert!(contents.contains("Saved snapshot 1"));

    Ok(())
}

#[test]
fn test_config_example_and_path() -> Result<()> {
    let dir = TempDir::new()?;

    let example = autosave!(dir.path(), "config", "--example").assert_success()?;
    assert!(example.contains_stdout("[session]"));
    assert!(example.contains_stdout("frequency_ms = 1000"));

    let path = autosave!(dir.path(), "config", "--path").assert_success()?;
    assert!(path.contains_stdout("absent-config.toml"));
    assert!(path.contains_stdout("File does not exist"));

    Ok(())
}

#[test]
fn test_config_show_reflects_file() -> Result<()> {
    let dir = TempDir::new()?;
    let config = dir.path().join("config.toml");
    std::fs::write(
        &config,
        "[session]\nfrequency_ms = 2500\ncompletion_order = \"last-arrived\"\n",
    )?;

    let mut cmd = AutosaveCommand::new(dir.path());
    let shown = cmd.config(&config).args(&["config"]).assert_success()?;
    assert!(shown.contains_stdout("2500"));
    assert!(shown.contains_stdout("LastArrived"));

    Ok(())
}

#[test]
fn test_invalid_config_is_rejected() -> Result<()> {
    let dir = TempDir::new()?;
    let config = dir.path().join("config.toml");
    std::fs::write(&config, "[session]\nfrequency_ms = 0\n")?;

    let mut cmd = AutosaveCommand::new(dir.path());
    let result = cmd.config(&config).args(&["config"]).assert_failure()?;
    assert!(result.contains_stderr("greater than zero"));

    // A zero frequency flag is rejected the same way
    let store = store_arg(&dir);
    autosave!(dir.path(), "run", "--store", &store, "--frequency", "0")
        .stdin(":quit\n")
        .assert_failure()?;

    Ok(())
}
