use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

/// Lock file guarding against a second reporter on the same folders.
/// The file holds the owner's pid and is removed on drop.
#[derive(Debug)]
pub struct InstanceLock {
    path: PathBuf,
}

impl InstanceLock {
    pub fn acquire(path: &Path) -> Result<Self> {
        let mut f = match std::fs::OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                let holder = std::fs::read_to_string(path).unwrap_or_default();
                bail!("another instance is already running (lock {} held by pid {})", path.display(), holder.trim());
            }
            Err(e) => return Err(e).with_context(|| format!("creating lock file {}", path.display())),
        };
        write!(f, "{}", std::process::id()).with_context(|| format!("writing lock file {}", path.display()))?;
        log::debug!("Acquired instance lock {}", path.display());
        Ok(Self { path: path.to_path_buf() })
    }
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) { log::warn!("Failed to remove lock file {}: {}", self.path.display(), e); }
    }
}
