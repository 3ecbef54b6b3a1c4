// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod factory;
pub mod freshness;
pub mod http;
pub mod lock;
pub mod paths;
pub mod refresh;
pub mod registration;
pub mod store;
#[cfg(test)]
pub mod test_support;

pub use client::AuthenticatedClient;
pub use config::AuthConfig;
pub use error::{AuthError, RefreshFailure, RefreshFailureKind};
pub use factory::{ClientFactory, CredentialStatus};
pub use paths::PathContext;
