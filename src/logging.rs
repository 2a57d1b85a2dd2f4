use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result, anyhow};
use tracing_subscriber::EnvFilter;

use crate::utils::get_data_dir;

const LOG_FILE_NAME: &str = "quiz-builder.log";

pub fn log_file_path() -> Result<PathBuf> {
    Ok(get_data_dir()?.join(LOG_FILE_NAME))
}

/// Sends `tracing` output to the log file in the data directory. The terminal
/// belongs to the TUI, so nothing is written to stdout or stderr.
pub fn init(verbose: bool) -> Result<PathBuf> {
    let path = log_file_path()?;
    init_at(&path, verbose)?;
    Ok(path)
}

pub fn init_at(path: &Path, verbose: bool) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file at {}", path.display()))?;

    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init()
        .map_err(|err| anyhow!("Failed to install log subscriber: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn events_land_in_the_log_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(LOG_FILE_NAME);

        init_at(&path, false).unwrap();
        tracing::error!(endpoint = "/question", "save failed in test");

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("save failed in test"));
        assert!(contents.contains("endpoint=\"/question\""));
    }
}
