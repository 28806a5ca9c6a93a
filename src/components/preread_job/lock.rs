use crate::error::PrereadResult;
use chrono::Utc;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, warn};

/// A lock left behind for longer than this belongs to a crashed run
pub const STALE_AFTER: Duration = Duration::from_secs(2 * 60 * 60);

/// Cross-process guard for one job run, released on drop
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
}

impl RunLock {
    /// Take the lock, `None` when another run holds it
    pub fn try_acquire(path: &Path) -> PrereadResult<Option<Self>> {
        Self::try_acquire_with(path, STALE_AFTER)
    }

    pub fn try_acquire_with(path: &Path, stale_after: Duration) -> PrereadResult<Option<Self>> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        if Self::create(path)? {
            return Ok(Some(Self { path: path.to_path_buf() }));
        }

        if !is_stale(path, stale_after) {
            debug!("Run lock {} is held", path.display());
            return Ok(None);
        }

        warn!("Taking over stale run lock {}", path.display());
        match fs::remove_file(path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        if Self::create(path)? {
            Ok(Some(Self { path: path.to_path_buf() }))
        } else {
            Ok(None)
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `false` when the file already exists
    fn create(path: &Path) -> PrereadResult<bool> {
        match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(mut file) => {
                writeln!(file, "{} {}", std::process::id(), Utc::now().to_rfc3339())?;
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            if e.kind() != ErrorKind::NotFound {
                warn!("Failed to release run lock {}: {}", self.path.display(), e);
            }
        }
    }
}

fn is_stale(path: &Path, stale_after: Duration) -> bool {
    let modified = match fs::metadata(path).and_then(|m| m.modified()) {
        Ok(modified) => modified,
        Err(_) => return false,
    };
    SystemTime::now()
        .duration_since(modified)
        .map(|age| age >= stale_after)
        .unwrap_or(false)
}
