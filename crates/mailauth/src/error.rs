// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::fmt;
use std::path::PathBuf;

/// Failures surfaced by [`ClientFactory`](crate::factory::ClientFactory).
///
/// Every variant is terminal for the current invocation. Nothing here is
/// retried internally; the message carries the remediation step.
#[derive(Debug)]
pub enum AuthError {
    /// The OAuth client registration file does not exist.
    MissingClientRegistration { path: PathBuf },
    /// The registration file exists but has neither an `installed` nor a `web` section.
    InvalidRegistrationFormat { path: PathBuf, reason: String },
    /// No usable credential record (never authorized, deleted, or corrupt).
    MissingCredentials { path: PathBuf },
    /// The credential record has no refresh token to exchange.
    MissingRefreshToken { path: PathBuf },
    /// The refresh exchange or the subsequent save failed.
    RefreshFailed(RefreshFailure),
}

impl AuthError {
    /// Stable machine-readable code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingClientRegistration { .. } => "MISSING_CLIENT_REGISTRATION",
            Self::InvalidRegistrationFormat { .. } => "INVALID_REGISTRATION_FORMAT",
            Self::MissingCredentials { .. } => "MISSING_CREDENTIALS",
            Self::MissingRefreshToken { .. } => "MISSING_REFRESH_TOKEN",
            Self::RefreshFailed(_) => "REFRESH_FAILED",
        }
    }

    /// What the operator should do next.
    pub fn remediation(&self) -> &'static str {
        match self {
            Self::MissingClientRegistration { .. } => {
                "create the OAuth client registration file for this account"
            }
            Self::InvalidRegistrationFormat { .. } => {
                "fix the registration file: it needs an \"installed\" or \"web\" section"
            }
            Self::MissingCredentials { .. } | Self::MissingRefreshToken { .. } => {
                "run the authorization flow to create fresh credentials"
            }
            Self::RefreshFailed(f) => match f.kind {
                RefreshFailureKind::Revoked => {
                    "the refresh token was revoked or expired; run the authorization flow again"
                }
                RefreshFailureKind::Timeout | RefreshFailureKind::Transport => {
                    "the token endpoint is unreachable or unavailable; retry later"
                }
                RefreshFailureKind::Rejected => {
                    "the token endpoint rejected the request; check the client id and secret in the registration file"
                }
                RefreshFailureKind::Malformed => {
                    "the token endpoint returned an unusable response; check --token-url, then retry"
                }
                RefreshFailureKind::Persist => {
                    "the credential file could not be written; check permissions and free space in its directory"
                }
            },
        }
    }

    /// True when only a new interactive authorization can recover.
    pub fn is_reauthorization_required(&self) -> bool {
        match self {
            Self::MissingCredentials { .. } | Self::MissingRefreshToken { .. } => true,
            Self::RefreshFailed(f) => f.is_reauthorization_required(),
            Self::MissingClientRegistration { .. } | Self::InvalidRegistrationFormat { .. } => {
                false
            }
        }
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingClientRegistration { path } => {
                write!(f, "client registration not found at {}", path.display())?
            }
            Self::InvalidRegistrationFormat { path, reason } => {
                write!(f, "invalid client registration at {}: {reason}", path.display())?
            }
            Self::MissingCredentials { path } => {
                write!(f, "no credentials found at {}", path.display())?
            }
            Self::MissingRefreshToken { path } => {
                write!(f, "credentials at {} have no refresh token", path.display())?
            }
            Self::RefreshFailed(failure) => write!(f, "token refresh failed: {failure}")?,
        }
        write!(f, " ({})", self.remediation())
    }
}

impl std::error::Error for AuthError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::RefreshFailed(failure) => Some(failure),
            _ => None,
        }
    }
}

impl From<RefreshFailure> for AuthError {
    fn from(failure: RefreshFailure) -> Self {
        Self::RefreshFailed(failure)
    }
}

/// Why a refresh attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshFailureKind {
    /// Authorization server answered `invalid_grant`.
    Revoked,
    /// No response within the configured timeout.
    Timeout,
    /// Connection or I/O failure talking to the token endpoint.
    Transport,
    /// Non-success status other than `invalid_grant`.
    Rejected,
    /// Response body did not describe a usable token.
    Malformed,
    /// The refreshed record could not be saved.
    Persist,
}

impl RefreshFailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Revoked => "revoked",
            Self::Timeout => "timeout",
            Self::Transport => "transport",
            Self::Rejected => "rejected",
            Self::Malformed => "malformed",
            Self::Persist => "persist",
        }
    }
}

impl fmt::Display for RefreshFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Underlying cause carried by [`AuthError::RefreshFailed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshFailure {
    pub kind: RefreshFailureKind,
    pub message: String,
}

impl RefreshFailure {
    pub fn new(kind: RefreshFailureKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }

    pub fn is_reauthorization_required(&self) -> bool {
        self.kind == RefreshFailureKind::Revoked
    }
}

impl fmt::Display for RefreshFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for RefreshFailure {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
