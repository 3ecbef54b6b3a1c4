// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `mailauth` subcommands operating on one account's credentials.

use std::fmt::Write as _;

use clap::{Parser, Subcommand};
use tracing::error;

use crate::config::AuthConfig;
use crate::factory::{ClientFactory, CredentialStatus};
use crate::freshness::{epoch_ms, secs_until};
use crate::paths::PathContext;

#[derive(Debug, Parser)]
#[command(name = "mailauth", version, about = "Manage a mail account's OAuth credentials")]
pub struct Cli {
    #[command(flatten)]
    pub auth: AuthConfig,

    /// Log level filter (tracing EnvFilter syntax).
    #[arg(long, env = "MAILAUTH_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log format on stderr.
    #[arg(long, env = "MAILAUTH_LOG_FORMAT", default_value = "text", value_parser = ["json", "text"])]
    pub log_format: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show where the account's files live and whether they are usable
    Status {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Print a valid access token, refreshing first if it is due
    Token,
    /// Refresh now, even if the current token is still fresh
    Refresh,
}

impl Cli {
    pub fn validate(&self) -> anyhow::Result<()> {
        self.auth.validate()
    }
}

/// Run the selected subcommand and return the process exit code.
pub async fn run(cli: Cli, ctx: &PathContext) -> i32 {
    let factory = match ClientFactory::new(&cli.auth, ctx) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("error: {e:#}");
            return 1;
        }
    };

    match cli.command {
        Command::Status { json } => {
            let status = factory.status();
            if json {
                match serde_json::to_string_pretty(&status) {
                    Ok(s) => println!("{s}"),
                    Err(e) => {
                        eprintln!("error: {e}");
                        return 1;
                    }
                }
            } else {
                print!("{}", render_status(&status));
            }
            if status.is_usable() {
                0
            } else {
                1
            }
        }
        Command::Token => match factory.authenticated_client().await {
            Ok(client) => {
                println!("{}", client.access_token());
                0
            }
            Err(e) => {
                error!(code = e.as_str(), "token unavailable");
                eprintln!("error: {e}");
                1
            }
        },
        Command::Refresh => match factory.force_refresh().await {
            Ok(client) => {
                let secs = secs_until(client.expires_at_ms(), epoch_ms());
                println!("refreshed, expires in {}", format_expires(Some(secs)));
                0
            }
            Err(e) => {
                error!(code = e.as_str(), "refresh failed");
                eprintln!("error: {e}");
                1
            }
        },
    }
}

fn format_expires(secs: Option<i64>) -> String {
    match secs {
        Some(s) if s >= 0 => format!("{}m {:02}s", s / 60, s % 60),
        Some(s) => {
            let s = s.unsigned_abs();
            format!("expired {}m {:02}s ago", s / 60, s % 60)
        }
        None => "-".to_owned(),
    }
}

/// Two-column table: field name, value.
pub fn render_status(status: &CredentialStatus) -> String {
    let registration = match &status.registration_error {
        Some(code) => format!("{} ({code})", status.registration_path.display()),
        None => status.registration_path.display().to_string(),
    };
    let state = match status.freshness {
        Some(f) => f.as_str(),
        None => "missing",
    };
    let refresh = if !status.present {
        "-"
    } else if status.has_refresh_token {
        "yes"
    } else {
        "no"
    };

    let rows = [
        ("CREDENTIALS", status.credentials_path.display().to_string()),
        ("REGISTRATION", registration),
        ("STATUS", state.to_owned()),
        ("EXPIRES IN", format_expires(status.expires_in_secs)),
        ("REFRESH TOKEN", refresh.to_owned()),
        ("SCOPE", status.scope.clone().unwrap_or_else(|| "-".to_owned())),
    ];
    let key_w = rows.iter().map(|(k, _)| k.len()).max().unwrap_or(0);

    let mut out = String::new();
    for (key, value) in rows {
        let _ = writeln!(out, "{key:<key_w$}  {value}");
    }
    out
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
