// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! OAuth client registration loading.
//!
//! The registration file is the JSON downloaded from the provider's console.
//! Two shapes exist, differing only in the wrapping key:
//!
//! ```json
//! {"installed": {"client_id": "...", "client_secret": "...", "redirect_uris": ["..."]}}
//! {"web":       {"client_id": "...", "client_secret": "...", "redirect_uris": ["..."]}}
//! ```

use std::fmt;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::error::AuthError;

/// Redirect URI used when the registration file does not list one.
pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:3000/oauth2callback";

/// The OAuth application identity.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientRegistration {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

impl fmt::Debug for ClientRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientRegistration")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("redirect_uri", &self.redirect_uri)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct RegistrationFile {
    #[serde(default)]
    installed: Option<RegistrationSection>,
    #[serde(default)]
    web: Option<RegistrationSection>,
}

#[derive(Debug, Deserialize)]
struct RegistrationSection {
    client_id: String,
    client_secret: String,
    #[serde(default)]
    redirect_uris: Vec<String>,
}

/// Read the registration file at `path`.
pub fn load_registration(path: &Path) -> Result<ClientRegistration, AuthError> {
    let data = match std::fs::read_to_string(path) {
        Ok(d) => d,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(AuthError::MissingClientRegistration { path: path.to_path_buf() });
        }
        Err(e) => {
            return Err(AuthError::InvalidRegistrationFormat {
                path: path.to_path_buf(),
                reason: format!("cannot read file: {e}"),
            });
        }
    };
    let registration = parse_registration(&data).map_err(|reason| {
        AuthError::InvalidRegistrationFormat { path: path.to_path_buf(), reason }
    })?;
    debug!(path = %path.display(), "loaded client registration");
    Ok(registration)
}

/// Parse registration JSON, preferring `installed` over `web`.
pub fn parse_registration(json: &str) -> Result<ClientRegistration, String> {
    let file: RegistrationFile =
        serde_json::from_str(json).map_err(|e| format!("invalid JSON: {e}"))?;

    let section = file
        .installed
        .or(file.web)
        .ok_or_else(|| "expected an \"installed\" or \"web\" section".to_owned())?;

    if section.client_id.trim().is_empty() {
        return Err("client_id is empty".to_owned());
    }

    let redirect_uri = section
        .redirect_uris
        .into_iter()
        .find(|u| !u.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_REDIRECT_URI.to_owned());

    Ok(ClientRegistration {
        client_id: section.client_id,
        client_secret: section.client_secret,
        redirect_uri,
    })
}

#[cfg(test)]
#[path = "registration_tests.rs"]
mod tests;
