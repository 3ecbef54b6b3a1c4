// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Credential persistence: load/save one account's record with atomic writes.
//!
//! The file on disk is the only source of truth. Nothing is cached between
//! calls, so a record replaced out of process is picked up on the next load.

use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Persisted authorization state for one account.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialRecord {
    pub access_token: String,
    /// Empty means the account must be authorized again.
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default)]
    pub scope: String,
    #[serde(default)]
    pub token_type: String,
    /// Expiry as milliseconds since Unix epoch.
    #[serde(default, rename = "expiry_date")]
    pub expiry_epoch_ms: u64,
    /// Fields written by other tools (e.g. `id_token`), carried through unchanged.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl CredentialRecord {
    pub fn has_refresh_token(&self) -> bool {
        !self.refresh_token.trim().is_empty()
    }
}

impl fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &if self.has_refresh_token() { "<redacted>" } else { "" })
            .field("scope", &self.scope)
            .field("token_type", &self.token_type)
            .field("expiry_epoch_ms", &self.expiry_epoch_ms)
            .finish_non_exhaustive()
    }
}

/// File-backed store for a single credential record.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the record. Missing, unreadable and unparsable files all yield `None`.
    pub fn load(&self) -> Option<CredentialRecord> {
        let data = match std::fs::read_to_string(&self.path) {
            Ok(d) => d,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no credential record");
                return None;
            }
            Err(e) => {
                warn!(path = %self.path.display(), err = %e, "failed to read credential record");
                return None;
            }
        };

        match serde_json::from_str::<CredentialRecord>(&data) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(path = %self.path.display(), err = %e, "failed to parse credential record");
                None
            }
        }
    }

    /// Replace the record on disk (write tmp + fsync + rename).
    ///
    /// Uses a unique temp filename (PID + counter) so concurrent saves never
    /// share a temp file. Readers see either the old or the new record.
    pub fn save(&self, record: &CredentialRecord) -> anyhow::Result<()> {
        static COUNTER: AtomicU32 = AtomicU32::new(0);

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_vec_pretty(record)?;
        let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
        let tmp_name = format!(
            "{}.{}.{}.tmp",
            self.path.file_name().unwrap_or_default().to_string_lossy(),
            std::process::id(),
            seq,
        );
        let tmp_path = self.path.with_file_name(tmp_name);

        let result = write_synced(&tmp_path, &json)
            .and_then(|()| std::fs::rename(&tmp_path, &self.path).map_err(Into::into));
        if result.is_err() {
            let _ = std::fs::remove_file(&tmp_path);
        }
        result?;

        debug!(path = %self.path.display(), "persisted credential record");
        Ok(())
    }
}

fn write_synced(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    use std::os::unix::fs::OpenOptionsExt;

    let mut file =
        std::fs::OpenOptions::new().write(true).create_new(true).mode(0o600).open(path)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    Ok(())
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
