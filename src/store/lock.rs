use anyhow::{Result, anyhow};
use log::warn;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

const LOCK_FILE: &str = ".mailcache.lock";

/// Advisory lock held for the duration of one run against a store location.
///
/// Only guards against other instances of this tool; the lock file holds the
/// owner's pid and is removed on drop. A lock whose owner is no longer alive
/// is taken over.
#[derive(Debug)]
pub struct StoreLock {
    path: PathBuf,
}

impl StoreLock {
    pub fn acquire(store: &Path) -> Result<Self> {
        fs::create_dir_all(store)?;
        let path = store.join(LOCK_FILE);

        match Self::create(&path) {
            Err(e) if e.kind() == ErrorKind::AlreadyExists && owner_is_gone(&path) => {
                warn!("removing stale lock {}", path.display());
                fs::remove_file(&path)?;
                Self::create(&path)
            }
            other => other,
        }
        .map_err(|e| match e.kind() {
            ErrorKind::AlreadyExists => anyhow!(
                "{} is locked by another run (remove {} if that run is gone)",
                store.display(),
                path.display()
            ),
            _ => e.into(),
        })
    }

    fn create(path: &Path) -> std::io::Result<Self> {
        let mut f = OpenOptions::new().write(true).create_new(true).open(path)?;
        writeln!(f, "{}", std::process::id())?;
        Ok(Self {
            path: path.to_path_buf(),
        })
    }
}

/// True only when the recorded owner is known to have exited.
fn owner_is_gone(path: &Path) -> bool {
    let Some(pid) = fs::read_to_string(path)
        .ok()
        .and_then(|s| s.trim().parse::<u32>().ok())
    else {
        return false;
    };
    pid_alive(pid) == Some(false)
}

#[cfg(target_os = "linux")]
fn pid_alive(pid: u32) -> Option<bool> {
    Some(Path::new("/proc").join(pid.to_string()).exists())
}

// TODO: check liveness on macOS/Windows; until then a crashed run's lock stays put there.
#[cfg(not(target_os = "linux"))]
fn pid_alive(_pid: u32) -> Option<bool> {
    None
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!("could not remove {}: {e}", self.path.display());
        }
    }
}
