//! Host-wide advisory lock serialising id allocation per session.

use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::error::Result;

static UNSAFE_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9_.-]+").expect("Invalid UNSAFE_CHARS regex"));

/// Scope used for instance spawns
pub const SPAWN_SCOPE: &str = "spawn";

/// Scope used by the error analyzer
pub const ANALYZER_SCOPE: &str = "error-analyzer";

/// File-name-safe token for a session name.
///
/// Runs of unsafe characters collapse to `_`; leading/trailing `.`/`_` are
/// stripped; an empty result becomes `unknown`. The first 8 hex digits of
/// the raw name's SHA-256 are appended so distinct names stay distinct.
pub fn sanitize_lock_name(session: &str) -> String {
    let replaced = UNSAFE_CHARS.replace_all(session, "_");
    let trimmed = replaced.trim_matches(|c| c == '.' || c == '_');
    let base = if trimmed.is_empty() { "unknown" } else { trimmed };
    let digest = Sha256::digest(session.as_bytes());
    let suffix: String = digest[..4].iter().map(|b| format!("{b:02x}")).collect();
    format!("{}-{}", base, suffix)
}

/// Lock file for `scope` and `session` under `dir`
pub fn lock_path(dir: &Path, scope: &str, session: &str) -> PathBuf {
    dir.join(format!("aiteam-{}-{}.lock", scope, sanitize_lock_name(session)))
}

/// Held advisory lock; released on drop.
///
/// The lock file is created lazily and never removed.
#[derive(Debug)]
pub struct SpawnLock {
    file: File,
    path: PathBuf,
    locked: bool,
}

impl SpawnLock {
    /// Block until the lock for `session` is held.
    ///
    /// When the platform refuses file locking the guard is returned unlocked
    /// and a warning is logged.
    pub fn acquire(dir: &Path, scope: &str, session: &str) -> Result<Self> {
        let path = lock_path(dir, scope, session);
        let file = open_lock_file(&path)?;
        let locked = match file.lock_exclusive() {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    "File locking unavailable for {} ({}); continuing without cross-process exclusion",
                    path.display(),
                    e
                );
                false
            }
        };
        debug!(path = %path.display(), locked, "Spawn lock acquired");
        Ok(Self { file, path, locked })
    }

    /// Take the lock without waiting; `None` when another holder has it
    pub fn try_acquire(dir: &Path, scope: &str, session: &str) -> Result<Option<Self>> {
        let path = lock_path(dir, scope, session);
        let file = open_lock_file(&path)?;
        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(Self {
                file,
                path,
                locked: true,
            })),
            Err(e) if is_contended(&e) => Ok(None),
            Err(e) => {
                warn!(
                    "File locking unavailable for {} ({}); continuing without cross-process exclusion",
                    path.display(),
                    e
                );
                Ok(Some(Self {
                    file,
                    path,
                    locked: false,
                }))
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the OS lock is really held (false in degraded mode)
    pub fn is_locked(&self) -> bool {
        self.locked
    }
}

impl Drop for SpawnLock {
    fn drop(&mut self) {
        if self.locked {
            let _ = FileExt::unlock(&self.file);
        }
    }
}

fn open_lock_file(path: &Path) -> Result<File> {
    let mut options = OpenOptions::new();
    options.create(true).read(true).write(true).truncate(false);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    Ok(options.open(path)?)
}

fn is_contended(e: &std::io::Error) -> bool {
    e.kind() == ErrorKind::WouldBlock
        || e.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}
