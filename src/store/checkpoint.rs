use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::event::Timestamp;

const CHECKPOINT_FILE: &str = ".mailcache";

/// How far retrieval has progressed for one mail store.
///
/// `last` is never lower than the timestamp of any event whose message is in
/// `messages`. The id set is kept in full for the lifetime of the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub last: Timestamp,
    pub messages: BTreeSet<String>,
}

impl Checkpoint {
    /// Raise `last` to `ts` if it is newer.
    pub fn advance(&mut self, ts: Timestamp) {
        if ts > self.last {
            self.last = ts;
        }
    }

    pub fn is_seen(&self, message_id: &str) -> bool {
        self.messages.contains(message_id)
    }

    pub fn mark_seen(&mut self, message_id: impl Into<String>) {
        self.messages.insert(message_id.into());
    }
}

pub fn checkpoint_path(store: &Path) -> PathBuf {
    store.join(CHECKPOINT_FILE)
}

/// Load the checkpoint for `store`, or a fresh one if none was saved yet.
pub fn load(store: &Path) -> Result<Checkpoint> {
    let p = checkpoint_path(store);
    if !p.exists() {
        return Ok(Checkpoint::default());
    }
    let s = fs::read_to_string(&p).with_context(|| format!("Failed to read {}", p.display()))?;
    let cp: Checkpoint =
        serde_json::from_str(&s).with_context(|| format!("Corrupt checkpoint {}", p.display()))?;
    Ok(cp)
}

/// Overwrite the checkpoint for `store`. Last write wins.
pub fn save(store: &Path, checkpoint: &Checkpoint) -> Result<()> {
    fs::create_dir_all(store)?;
    let p = checkpoint_path(store);
    let s = serde_json::to_string(checkpoint)?;

    // write to temp, then rename over the old file
    let temp_path = p.with_extension("tmp");
    fs::write(&temp_path, s)?;
    fs::rename(&temp_path, &p).with_context(|| format!("Failed to write {}", p.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_missing_returns_default() {
        let dir = TempDir::new().unwrap();
        let cp = load(dir.path()).unwrap();
        assert_eq!(cp.last, 0.0);
        assert!(cp.messages.is_empty());
    }

    #[test]
    fn test_save_then_load_keeps_every_id() {
        let dir = TempDir::new().unwrap();
        let mut cp = Checkpoint::default();
        cp.advance(1700000123.456789);
        for i in 0..500 {
            cp.mark_seen(format!("<{i}@example.com>"));
        }
        save(dir.path(), &cp).unwrap();

        let loaded = load(dir.path()).unwrap();
        assert_eq!(loaded, cp);
        assert_eq!(loaded.last, 1700000123.456789);
    }

    #[test]
    fn test_save_overwrites() {
        let dir = TempDir::new().unwrap();
        let mut cp = Checkpoint::default();
        cp.mark_seen("a");
        save(dir.path(), &cp).unwrap();
        cp.mark_seen("b");
        cp.advance(5.0);
        save(dir.path(), &cp).unwrap();

        let loaded = load(dir.path()).unwrap();
        assert_eq!(loaded.messages.len(), 2);
        assert_eq!(loaded.last, 5.0);
        assert!(!checkpoint_path(dir.path()).with_extension("tmp").exists());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        fs::write(checkpoint_path(dir.path()), "not json").unwrap();
        assert!(load(dir.path()).is_err());
    }

    #[test]
    fn test_advance_never_moves_backwards() {
        let mut cp = Checkpoint::default();
        cp.advance(10.0);
        cp.advance(3.0);
        assert_eq!(cp.last, 10.0);
        cp.advance(10.5);
        assert_eq!(cp.last, 10.5);
    }

    #[test]
    fn test_file_format() {
        let mut cp = Checkpoint::default();
        cp.advance(1.5);
        cp.mark_seen("b");
        cp.mark_seen("a");
        let json = serde_json::to_string(&cp).unwrap();
        assert_eq!(json, r#"{"last":1.5,"messages":["a","b"]}"#);
    }
}
