//! CLI command execution helpers with automatic timing
//!
//! Wraps the `autosave` binary, measures execution time and provides
//! convenient assertion methods.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

/// CLI command builder with timing
pub struct AutosaveCommand {
    working_dir: PathBuf,
    config: PathBuf,
    args: Vec<String>,
    env: HashMap<String, String>,
    stdin_data: Option<String>,
}

impl AutosaveCommand {
    /// Create a new command in the given working directory.
    ///
    /// The config file defaults to a path inside `working_dir` that does not
    /// exist, so the user's own config never leaks into tests.
    pub fn new(working_dir: impl AsRef<Path>) -> Self {
        let working_dir = working_dir.as_ref().to_path_buf();
        let config = working_dir.join("absent-config.toml");

        Self {
            working_dir,
            config,
            args: Vec::new(),
            env: HashMap::new(),
            stdin_data: None,
        }
    }

    /// Use `path` as the config file
    pub fn config(&mut self, path: impl AsRef<Path>) -> &mut Self {
        self.config = path.as_ref().to_path_buf();
        self
    }

    /// Add command arguments
    pub fn args(&mut self, args: &[&str]) -> &mut Self {
        self.args.extend(args.iter().map(|s| s.to_string()));
        self
    }

    /// Set environment variable
    pub fn env(&mut self, key: &str, value: &str) -> &mut Self {
        self.env.insert(key.to_string(), value.to_string());
        self
    }

    /// Provide stdin data
    pub fn stdin(&mut self, data: &str) -> &mut Self {
        self.stdin_data = Some(data.to_string());
        self
    }

    /// Execute command and return result with timing
    pub fn execute(&self) -> Result<CommandResult> {
        let start = Instant::now();

        let mut child = Command::new(env!("CARGO_BIN_EXE_autosave"))
            .arg("--config")
            .arg(&self.config)
            .args(&self.args)
            .current_dir(&self.working_dir)
            .envs(&self.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .context("Failed to spawn autosave")?;

        // Dropping stdin closes it, so `run` sees EOF after the data
        if let Some(mut stdin) = child.stdin.take() {
            if let Some(data) = &self.stdin_data {
                stdin.write_all(data.as_bytes())?;
            }
        }

        let output = child
            .wait_with_output()
            .context("Failed to wait for autosave")?;

        Ok(CommandResult {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code().unwrap_or(-1),
            duration: start.elapsed(),
        })
    }

    /// Execute and assert success
    pub fn assert_success(&self) -> Result<CommandResult> {
        let result = self.execute()?;

        if !result.success() {
            anyhow::bail!(
                "Command failed (exit code: {}):\nArgs: {:?}\nStdout: {}\nStderr: {}",
                result.exit_code,
                self.args,
                result.stdout,
                result.stderr
            );
        }

        Ok(result)
    }

    /// Execute and expect failure
    pub fn assert_failure(&self) -> Result<CommandResult> {
        let result = self.execute()?;

        if result.success() {
            anyhow::bail!(
                "Command should have failed but succeeded:\nArgs: {:?}\nStdout: {}",
                self.args,
                result.stdout
            );
        }

        Ok(result)
    }
}

/// Command execution result with timing
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub duration: Duration,
}

impl CommandResult {
    /// Check if command succeeded
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Check if stdout contains text
    pub fn contains_stdout(&self, text: &str) -> bool {
        self.stdout.contains(text)
    }

    /// Check if stderr contains text
    pub fn contains_stderr(&self, text: &str) -> bool {
        self.stderr.contains(text)
    }

    /// Snapshot sequence numbers listed by `autosave log` (`#N` markers)
    pub fn snapshot_seqs(&self) -> Vec<u64> {
        self.stdout
            .lines()
            .filter_map(|line| {
                let marker = line.split_whitespace().find(|word| word.contains('#'))?;
                let digits: String = marker
                    .chars()
                    .skip_while(|c| *c != '#')
                    .skip(1)
                    .take_while(|c| c.is_ascii_digit())
                    .collect();
                digits.parse().ok()
            })
            .collect()
    }
}

/// Macro for convenient command construction
///
/// Usage:
/// ```ignore
/// autosave!(dir, "log", "--store", store).assert_success()?;
/// ```
#[macro_export]
macro_rules! autosave {
    ($dir:expr, $($arg:expr),*) => {{
        let mut cmd = $crate::common::cli::AutosaveCommand::new($dir);
        cmd.args(&[$($arg),*]);
        cmd
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_seq_extraction() {
        let result = CommandResult {
            stdout: "Snapshot Timeline (2 total)\n\n#2 01HXKJ7N 3 seconds ago {\"a\":2}\n#1 01HXKJ6M 5 seconds ago {\"a\":1}\n".to_string(),
            stderr: String::new(),
            exit_code: 0,
            duration: Duration::from_millis(10),
        };

        assert_eq!(result.snapshot_seqs(), vec![2, 1]);
    }
}
