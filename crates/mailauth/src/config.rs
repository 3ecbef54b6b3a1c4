// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use crate::paths::{
    PathContext, ResolvedPaths, DEFAULT_CREDENTIALS_SUFFIX, DEFAULT_REGISTRATION_SUFFIX,
};

/// Google's OAuth2 token endpoint.
pub const DEFAULT_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Default upper bound on a single refresh exchange.
pub const DEFAULT_REFRESH_TIMEOUT_MS: u64 = 30_000;

/// Configuration for one account's credential lifecycle.
///
/// Environment overrides are applied by clap when the struct is parsed;
/// nothing downstream reads the process environment for these values.
#[derive(Debug, Clone, clap::Args)]
pub struct AuthConfig {
    /// Credential record path (`~` expands to the home directory).
    #[arg(long, env = "GMAIL_CREDENTIALS_PATH")]
    pub credentials_path: Option<String>,

    /// OAuth client registration path (`~` expands to the home directory).
    #[arg(long, env = "GMAIL_OAUTH_PATH")]
    pub oauth_path: Option<String>,

    /// Token endpoint used for refresh exchanges.
    #[arg(long, env = "MAILAUTH_TOKEN_URL", default_value = DEFAULT_TOKEN_URL)]
    pub token_url: String,

    /// Timeout for a single refresh exchange, in milliseconds.
    #[arg(long, env = "MAILAUTH_REFRESH_TIMEOUT_MS", default_value_t = DEFAULT_REFRESH_TIMEOUT_MS)]
    pub refresh_timeout_ms: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            credentials_path: None,
            oauth_path: None,
            token_url: DEFAULT_TOKEN_URL.to_owned(),
            refresh_timeout_ms: DEFAULT_REFRESH_TIMEOUT_MS,
        }
    }
}

impl AuthConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.token_url.trim().is_empty() {
            anyhow::bail!("--token-url must not be empty");
        }
        if self.refresh_timeout_ms == 0 {
            anyhow::bail!("--refresh-timeout-ms must be greater than zero");
        }
        Ok(())
    }

    pub fn refresh_timeout(&self) -> Duration {
        Duration::from_millis(self.refresh_timeout_ms)
    }

    /// Resolve both file locations against `ctx`.
    pub fn resolve(&self, ctx: &PathContext) -> ResolvedPaths {
        ResolvedPaths {
            credentials: ctx.resolve(self.credentials_path.as_deref(), DEFAULT_CREDENTIALS_SUFFIX),
            registration: ctx.resolve(self.oauth_path.as_deref(), DEFAULT_REGISTRATION_SUFFIX),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
