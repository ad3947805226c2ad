use crate::GlobalOptions;
use anyhow::{Context, Result};
use smartcd::{HistoryStore, SessionState, SystemClock};
use std::path::PathBuf;
use tracing::debug;

pub fn run(dir: Option<PathBuf>, options: &GlobalOptions) -> Result<()> {
    let config = options.config()?;
    let store = HistoryStore::from_config(&config)?;

    let dir = match dir {
        Some(dir) => dir,
        None => std::env::current_dir().context("failed to read current directory")?,
    };
    let dir = dir
        .canonicalize()
        .with_context(|| format!("no such directory: {}", dir.display()))?;
    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    let mut session = SessionState::default();
    let written = store.record(&mut session, &dir, &SystemClock)?;
    debug!(dir = %dir.display(), log = %store.path().display(), written, "visit recorded");
    Ok(())
}
