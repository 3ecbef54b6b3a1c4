// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Entry point for API callers: hand out a client with a usable access token.

use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, warn};

use crate::client::AuthenticatedClient;
use crate::config::AuthConfig;
use crate::error::{AuthError, RefreshFailure, RefreshFailureKind};
use crate::freshness::{epoch_ms, secs_until, Freshness};
use crate::lock::RefreshGuard;
use crate::paths::{PathContext, ResolvedPaths};
use crate::refresh::Refresher;
use crate::registration::{load_registration, ClientRegistration};
use crate::store::{CredentialRecord, CredentialStore};

/// Builds [`AuthenticatedClient`]s for one account.
///
/// Holds no credential state: every call re-reads the registration and the
/// credential file, so an out-of-process re-authorization takes effect on the
/// next call.
#[derive(Debug, Clone)]
pub struct ClientFactory {
    paths: ResolvedPaths,
    store: CredentialStore,
    refresher: Refresher,
    http: reqwest::Client,
}

impl ClientFactory {
    pub fn new(config: &AuthConfig, ctx: &PathContext) -> anyhow::Result<Self> {
        config.validate()?;
        Self::from_paths(config.resolve(ctx), &config.token_url, config.refresh_timeout())
    }

    pub fn from_paths(
        paths: ResolvedPaths,
        token_url: &str,
        refresh_timeout: Duration,
    ) -> anyhow::Result<Self> {
        let http = crate::http::build_client()?;
        Ok(Self {
            store: CredentialStore::new(&paths.credentials),
            refresher: Refresher::new(http.clone(), token_url, refresh_timeout),
            paths,
            http,
        })
    }

    pub fn paths(&self) -> &ResolvedPaths {
        &self.paths
    }

    /// Client carrying an access token valid for at least the expiry buffer,
    /// refreshing (and persisting) first when the stored one is due.
    pub async fn authenticated_client(&self) -> Result<AuthenticatedClient, AuthError> {
        let registration = load_registration(&self.paths.registration)?;
        let record = self.load_required()?;

        let record = match Freshness::evaluate(&record, epoch_ms()) {
            Freshness::Fresh => {
                debug!(path = %self.paths.credentials.display(), "credentials fresh");
                if !record.has_refresh_token() {
                    warn!(
                        path = %self.paths.credentials.display(),
                        "credentials have no refresh token; authorization will be needed once they expire"
                    );
                }
                record
            }
            Freshness::Due => self.refresh_exclusive(&registration, &record, false).await?,
        };
        Ok(AuthenticatedClient::new(self.http.clone(), registration, record))
    }

    /// Refresh regardless of freshness.
    ///
    /// A refresh completed by another caller while this one waited for the
    /// lock counts as this call's refresh.
    pub async fn force_refresh(&self) -> Result<AuthenticatedClient, AuthError> {
        let registration = load_registration(&self.paths.registration)?;
        let record = self.load_required()?;
        let record = self.refresh_exclusive(&registration, &record, true).await?;
        Ok(AuthenticatedClient::new(self.http.clone(), registration, record))
    }

    /// Snapshot of the account's files without refreshing or writing anything.
    pub fn status(&self) -> CredentialStatus {
        let registration_error = load_registration(&self.paths.registration)
            .err()
            .map(|e| e.as_str().to_owned());
        let record = self.store.load();
        let now = epoch_ms();

        CredentialStatus {
            credentials_path: self.paths.credentials.clone(),
            registration_path: self.paths.registration.clone(),
            registration_error,
            present: record.is_some(),
            freshness: record.as_ref().map(|r| Freshness::evaluate(r, now)),
            expires_in_secs: record
                .as_ref()
                .map(|r| secs_until(r.expiry_epoch_ms, now)),
            has_refresh_token: record.as_ref().is_some_and(CredentialRecord::has_refresh_token),
            scope: record.map(|r| r.scope).filter(|s| !s.is_empty()),
        }
    }

    fn load_required(&self) -> Result<CredentialRecord, AuthError> {
        self.store
            .load()
            .ok_or_else(|| AuthError::MissingCredentials { path: self.paths.credentials.clone() })
    }

    /// Refresh under the per-account lock.
    ///
    /// The record is re-read once the lock is held. Unless `force` is set, a
    /// record that is fresh by then is returned as-is. With `force`, only a
    /// record that differs from `seen` (and is fresh) is accepted.
    async fn refresh_exclusive(
        &self,
        registration: &ClientRegistration,
        seen: &CredentialRecord,
        force: bool,
    ) -> Result<CredentialRecord, AuthError> {
        if !seen.has_refresh_token() {
            return Err(AuthError::MissingRefreshToken { path: self.paths.credentials.clone() });
        }

        let _guard = RefreshGuard::acquire(&self.paths.credentials).await.map_err(|e| {
            RefreshFailure::new(RefreshFailureKind::Persist, format!("lock credentials: {e:#}"))
        })?;

        let current = self.load_required()?;
        let replaced = !force || current != *seen;
        if replaced && Freshness::evaluate(&current, epoch_ms()) == Freshness::Fresh {
            debug!(path = %self.paths.credentials.display(), "credentials refreshed by another caller");
            return Ok(current);
        }

        self.refresher.refresh(&self.store, registration, &current).await
    }
}

/// Read-only view of one account, as reported by `mailauth status`.
#[derive(Debug, Clone, Serialize)]
pub struct CredentialStatus {
    pub credentials_path: PathBuf,
    pub registration_path: PathBuf,
    /// Error code when the registration file cannot be used.
    pub registration_error: Option<String>,
    pub present: bool,
    pub freshness: Option<Freshness>,
    /// Negative once expired.
    pub expires_in_secs: Option<i64>,
    pub has_refresh_token: bool,
    pub scope: Option<String>,
}

impl CredentialStatus {
    /// True when [`ClientFactory::authenticated_client`] can succeed without
    /// operator action (network permitting).
    pub fn is_usable(&self) -> bool {
        self.registration_error.is_none()
            && self.present
            && (self.freshness == Some(Freshness::Fresh) || self.has_refresh_token)
    }
}

#[cfg(test)]
#[path = "factory_tests.rs"]
mod tests;
