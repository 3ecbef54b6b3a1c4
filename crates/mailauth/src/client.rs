// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::fmt;

use reqwest::{Method, RequestBuilder};

use crate::registration::ClientRegistration;
use crate::store::CredentialRecord;

/// HTTP client bound to one account's current access token.
///
/// Built from a record that was fresh (or freshly refreshed) at construction
/// time. Long-lived holders should go back to the factory rather than keep
/// one of these past [`expires_at_ms`](Self::expires_at_ms).
#[derive(Clone)]
pub struct AuthenticatedClient {
    http: reqwest::Client,
    registration: ClientRegistration,
    record: CredentialRecord,
}

impl AuthenticatedClient {
    pub fn new(
        http: reqwest::Client,
        registration: ClientRegistration,
        record: CredentialRecord,
    ) -> Self {
        Self { http, registration, record }
    }

    pub fn access_token(&self) -> &str {
        &self.record.access_token
    }

    pub fn refresh_token(&self) -> &str {
        &self.record.refresh_token
    }

    pub fn expires_at_ms(&self) -> u64 {
        self.record.expiry_epoch_ms
    }

    pub fn token_type(&self) -> &str {
        &self.record.token_type
    }

    pub fn scope(&self) -> &str {
        &self.record.scope
    }

    pub fn client_id(&self) -> &str {
        &self.registration.client_id
    }

    pub fn redirect_uri(&self) -> &str {
        &self.registration.redirect_uri
    }

    pub fn registration(&self) -> &ClientRegistration {
        &self.registration
    }

    pub fn record(&self) -> &CredentialRecord {
        &self.record
    }

    /// Underlying client, without authorization attached.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Start a request carrying `Authorization: Bearer <access token>`.
    pub fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.http.request(method, url).bearer_auth(&self.record.access_token)
    }

    pub fn get(&self, url: &str) -> RequestBuilder {
        self.request(Method::GET, url)
    }

    pub fn post(&self, url: &str) -> RequestBuilder {
        self.request(Method::POST, url)
    }

    pub fn put(&self, url: &str) -> RequestBuilder {
        self.request(Method::PUT, url)
    }

    pub fn delete(&self, url: &str) -> RequestBuilder {
        self.request(Method::DELETE, url)
    }
}

impl fmt::Debug for AuthenticatedClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthenticatedClient")
            .field("client_id", &self.registration.client_id)
            .field("record", &self.record)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
