// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-account refresh serialization.
//!
//! Two layers: an in-process async mutex keyed by credential path, then an
//! exclusive flock(2) on `<credentials>.lock` for other processes sharing the
//! same file. Both are released when the [`RefreshGuard`] drops.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use nix::fcntl::{Flock, FlockArg};
use parking_lot::Mutex;
use tokio::sync::OwnedMutexGuard;
use tracing::debug;

use crate::paths::lock_path_for;

type LocalLocks = Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>;

fn local_locks() -> &'static LocalLocks {
    static LOCKS: OnceLock<LocalLocks> = OnceLock::new();
    LOCKS.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Held for the duration of one refresh of one credential file.
pub struct RefreshGuard {
    _file: Flock<File>,
    _local: OwnedMutexGuard<()>,
}

impl std::fmt::Debug for RefreshGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshGuard").finish_non_exhaustive()
    }
}

impl RefreshGuard {
    /// Wait until no other task or process is refreshing `credentials`.
    pub async fn acquire(credentials: &Path) -> anyhow::Result<Self> {
        let local = {
            let mut locks = local_locks().lock();
            Arc::clone(locks.entry(credentials.to_path_buf()).or_default())
        };
        let local = local.lock_owned().await;

        let lock_path = lock_path_for(credentials);
        let file = tokio::task::spawn_blocking(move || lock_file(&lock_path)).await??;
        debug!(path = %credentials.display(), "refresh lock acquired");

        Ok(Self { _file: file, _local: local })
    }
}

fn lock_file(path: &Path) -> anyhow::Result<Flock<File>> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).truncate(false).write(true).open(path)?;
    Flock::lock(file, FlockArg::LockExclusive)
        .map_err(|(_file, errno)| anyhow::anyhow!("flock {} failed: {errno}", path.display()))
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
