use anyhow::{Context, Result, anyhow};
use log::debug;
use ::maildir::Maildir;
use std::path::Path;

use crate::store::sink::MailSink;

/// Writes each message as a new file under `new/` of a Maildir.
pub struct MaildirSink {
    maildir: Maildir,
}

impl MaildirSink {
    /// Open the Maildir at `path`, creating `cur/`, `new/` and `tmp/` if needed.
    pub fn open(path: &Path) -> Result<Self> {
        let maildir = Maildir::from(path.to_path_buf());
        maildir
            .create_dirs()
            .with_context(|| format!("Failed to create maildir at {}", path.display()))?;
        Ok(Self { maildir })
    }

    pub fn count_new(&self) -> usize {
        self.maildir.count_new()
    }
}

impl MailSink for MaildirSink {
    fn add(&mut self, raw: &[u8]) -> Result<String> {
        let id = self
            .maildir
            .store_new(raw)
            .map_err(|e| anyhow!("Failed to store message in maildir: {e}"))?;
        debug!("stored {id} ({} bytes)", raw.len());
        Ok(id)
    }
}
