// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! OAuth refresh-token exchange and persistence of its result.

use std::time::Duration;

use serde::Deserialize;
use tracing::{info, warn};

use crate::error::{AuthError, RefreshFailure, RefreshFailureKind};
use crate::freshness::epoch_ms;
use crate::registration::ClientRegistration;
use crate::store::{CredentialRecord, CredentialStore};

/// Lifetime assumed when the token endpoint omits `expires_in`.
const DEFAULT_EXPIRES_IN_SECS: u64 = 3600;

/// OAuth token response from the provider.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Token lifetime in seconds.
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
}

/// OAuth error response from the provider.
#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Performs `grant_type=refresh_token` exchanges against one token endpoint.
#[derive(Debug, Clone)]
pub struct Refresher {
    http: reqwest::Client,
    token_url: String,
    timeout: Duration,
}

impl Refresher {
    pub fn new(http: reqwest::Client, token_url: impl Into<String>, timeout: Duration) -> Self {
        Self { http, token_url: token_url.into(), timeout }
    }

    pub fn token_url(&self) -> &str {
        &self.token_url
    }

    /// Refresh `current` and persist the result before returning it.
    ///
    /// A failed exchange leaves the stored record untouched. A success response
    /// that cannot be used still has its rotated refresh token saved.
    pub async fn refresh(
        &self,
        store: &CredentialStore,
        registration: &ClientRegistration,
        current: &CredentialRecord,
    ) -> Result<CredentialRecord, AuthError> {
        if !current.has_refresh_token() {
            return Err(AuthError::MissingRefreshToken { path: store.path().to_path_buf() });
        }

        let token = match tokio::time::timeout(
            self.timeout,
            self.exchange(registration, &current.refresh_token),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(RefreshFailure::new(
                RefreshFailureKind::Timeout,
                format!("no response from token endpoint within {:?}", self.timeout),
            )),
        }
        .inspect_err(|e| {
            warn!(path = %store.path().display(), kind = %e.kind, err = %e.message, "credential refresh failed");
        })?;

        let rotated = token.refresh_token.clone().filter(|rt| !rt.trim().is_empty());
        let updated = match apply_token(current, token, epoch_ms()) {
            Ok(updated) => updated,
            Err(e) => {
                if let Some(rt) = rotated.filter(|rt| *rt != current.refresh_token) {
                    self.keep_rotated(store, current, rt);
                }
                return Err(e.into());
            }
        };

        store.save(&updated).map_err(|e| {
            warn!(path = %store.path().display(), err = %e, "failed to persist refreshed credentials");
            RefreshFailure::new(RefreshFailureKind::Persist, format!("{e:#}"))
        })?;

        info!(
            path = %store.path().display(),
            expires_in_secs = updated.expiry_epoch_ms.saturating_sub(epoch_ms()) / 1000,
            rotated = updated.refresh_token != current.refresh_token,
            "credentials refreshed"
        );
        Ok(updated)
    }

    /// Save a rotated refresh token from an otherwise unusable response. The
    /// provider may already have invalidated the old one.
    fn keep_rotated(&self, store: &CredentialStore, current: &CredentialRecord, refresh_token: String) {
        let kept = CredentialRecord { refresh_token, ..current.clone() };
        match store.save(&kept) {
            Ok(()) => warn!(path = %store.path().display(), "kept rotated refresh token from unusable response"),
            Err(e) => warn!(path = %store.path().display(), err = %e, "failed to persist rotated refresh token"),
        }
    }

    /// Execute a single refresh request, classifying failures.
    pub async fn exchange(
        &self,
        registration: &ClientRegistration,
        refresh_token: &str,
    ) -> Result<TokenResponse, RefreshFailure> {
        let resp = self
            .http
            .post(&self.token_url)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&[
                ("grant_type", "refresh_token"),
                ("client_id", registration.client_id.as_str()),
                ("client_secret", registration.client_secret.as_str()),
                ("refresh_token", refresh_token),
            ])
            .send()
            .await
            .map_err(|e| RefreshFailure::new(RefreshFailureKind::Transport, format!("HTTP error: {e}")))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| RefreshFailure::new(RefreshFailureKind::Transport, format!("read body: {e}")))?;

        if !status.is_success() {
            return Err(classify_error(status, &body));
        }

        serde_json::from_str::<TokenResponse>(&body).map_err(|e| {
            RefreshFailure::new(RefreshFailureKind::Malformed, format!("parse response: {e}"))
        })
    }
}

fn classify_error(status: reqwest::StatusCode, body: &str) -> RefreshFailure {
    if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return RefreshFailure::new(RefreshFailureKind::Transport, format!("HTTP {status}: {body}"));
    }
    match serde_json::from_str::<TokenErrorResponse>(body) {
        Ok(err) if err.error == "invalid_grant" => RefreshFailure::new(
            RefreshFailureKind::Revoked,
            err.error_description.unwrap_or(err.error),
        ),
        Ok(err) => RefreshFailure::new(
            RefreshFailureKind::Rejected,
            format!("HTTP {status}: {}: {}", err.error, err.error_description.unwrap_or_default()),
        ),
        Err(_) => RefreshFailure::new(RefreshFailureKind::Rejected, format!("HTTP {status}: {body}")),
    }
}

/// Build the post-refresh record from the pre-refresh one.
///
/// The refresh token is kept when the response omits it. Scope and token type
/// carry over from `current` (the response only fills them when `current` has
/// none). The expiry is `now + expires_in` whatever the old one was, so a
/// shorter lifetime than before is accepted.
pub fn apply_token(
    current: &CredentialRecord,
    token: TokenResponse,
    now_ms: u64,
) -> Result<CredentialRecord, RefreshFailure> {
    if token.access_token.trim().is_empty() {
        return Err(RefreshFailure::new(RefreshFailureKind::Malformed, "empty access_token"));
    }

    let expires_in = token.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS);
    let expiry_epoch_ms = now_ms.saturating_add(expires_in.saturating_mul(1000));

    let refresh_token = token
        .refresh_token
        .filter(|rt| !rt.trim().is_empty())
        .unwrap_or_else(|| current.refresh_token.clone());

    let scope = if current.scope.is_empty() {
        token.scope.unwrap_or_default()
    } else {
        current.scope.clone()
    };
    let token_type = if current.token_type.is_empty() {
        token.token_type.unwrap_or_default()
    } else {
        current.token_type.clone()
    };

    Ok(CredentialRecord {
        access_token: token.access_token,
        refresh_token,
        scope,
        token_type,
        expiry_epoch_ms,
        extra: current.extra.clone(),
    })
}

#[cfg(test)]
#[path = "refresh_tests.rs"]
mod tests;
