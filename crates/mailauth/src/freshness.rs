// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Decide whether a credential record can be used as-is.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::store::CredentialRecord;

/// Margin before true expiry at which a refresh is triggered.
pub const EXPIRY_BUFFER: Duration = Duration::from_secs(5 * 60);

/// Outcome of evaluating a record against the wall clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Freshness {
    /// `expiry >= now + buffer`: use the access token unchanged.
    Fresh,
    /// `expiry < now + buffer`: refresh before use.
    Due,
}

impl Freshness {
    pub fn evaluate(record: &CredentialRecord, now_ms: u64) -> Self {
        Self::evaluate_with(record.expiry_epoch_ms, now_ms, EXPIRY_BUFFER)
    }

    pub fn evaluate_with(expiry_ms: u64, now_ms: u64, buffer: Duration) -> Self {
        let threshold = now_ms.saturating_add(buffer.as_millis() as u64);
        if expiry_ms >= threshold {
            Self::Fresh
        } else {
            Self::Due
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fresh => "fresh",
            Self::Due => "due",
        }
    }
}

impl std::fmt::Display for Freshness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Milliseconds since Unix epoch, by the wall clock.
pub fn epoch_ms() -> u64 {
    let ms = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
    u64::try_from(ms).unwrap_or(u64::MAX)
}

/// Whole seconds from `now_ms` until `expiry_ms`, negative once expired.
pub fn secs_until(expiry_ms: u64, now_ms: u64) -> i64 {
    let expiry = i64::try_from(expiry_ms).unwrap_or(i64::MAX);
    let now = i64::try_from(now_ms).unwrap_or(i64::MAX);
    expiry.saturating_sub(now) / 1000
}

#[cfg(test)]
#[path = "freshness_tests.rs"]
mod tests;
