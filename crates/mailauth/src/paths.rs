// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Filesystem locations for the credential record and client registration.

use std::path::{Path, PathBuf};

/// Directory under `$HOME` holding per-account files.
pub const APP_DIR: &str = ".gmail-mcp";

/// Default credential record location, relative to `$HOME`.
pub const DEFAULT_CREDENTIALS_SUFFIX: &str = ".gmail-mcp/credentials.json";

/// Default client registration location, relative to `$HOME`.
pub const DEFAULT_REGISTRATION_SUFFIX: &str = ".gmail-mcp/oauth-keys.json";

/// The two directories a path can be anchored to.
///
/// Captured once at the process boundary so resolution itself stays pure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathContext {
    pub home: PathBuf,
    pub cwd: PathBuf,
}

impl PathContext {
    pub fn new(home: impl Into<PathBuf>, cwd: impl Into<PathBuf>) -> Self {
        Self { home: home.into(), cwd: cwd.into() }
    }

    /// Snapshot `$HOME` and the working directory of the current process.
    pub fn from_env() -> Self {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/"));
        let home = std::env::var_os("HOME")
            .filter(|h| !h.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| cwd.clone());
        Self { home, cwd }
    }

    /// Resolve an optional override, falling back to `$HOME/<default_suffix>`.
    ///
    /// `~` and `~/...` expand to the home directory. Anything else that is not
    /// already absolute is taken relative to the working directory. Blank
    /// overrides count as unset. Never fails; a nonexistent result is left for
    /// the consumer to report.
    pub fn resolve(&self, override_path: Option<&str>, default_suffix: &str) -> PathBuf {
        let raw = override_path.map(str::trim).filter(|s| !s.is_empty());
        match raw {
            Some(raw) => self.resolve_raw(raw),
            None => self.home.join(default_suffix),
        }
    }

    fn resolve_raw(&self, raw: &str) -> PathBuf {
        if let Some(p) = expand_tilde(&self.home, raw) {
            return p;
        }
        let candidate = Path::new(raw);
        if candidate.is_absolute() {
            return candidate.to_path_buf();
        }
        self.cwd.join(candidate)
    }
}

fn expand_tilde(home: &Path, raw: &str) -> Option<PathBuf> {
    if raw == "~" {
        return Some(home.to_path_buf());
    }
    raw.strip_prefix("~/").map(|rest| home.join(rest))
}

/// Where one account's files live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPaths {
    pub credentials: PathBuf,
    pub registration: PathBuf,
}

impl ResolvedPaths {
    /// Sidecar file used for cross-process refresh exclusion.
    pub fn lock_file(&self) -> PathBuf {
        lock_path_for(&self.credentials)
    }
}

/// `<credentials>.lock`, next to the credential record.
pub fn lock_path_for(credentials: &Path) -> PathBuf {
    let mut name = credentials.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".lock");
    credentials.with_file_name(name)
}

#[cfg(test)]
#[path = "paths_tests.rs"]
mod tests;
