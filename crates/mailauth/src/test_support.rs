// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test infrastructure: fixtures, a mock token endpoint, and assertion helpers.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::routing::post;
use axum::Router;
use parking_lot::Mutex;
use tokio::net::TcpListener;

use crate::config::AuthConfig;
use crate::freshness::epoch_ms;
use crate::paths::ResolvedPaths;
use crate::store::CredentialRecord;

/// Assert that an expression evaluates to `Err` whose Display output
/// contains the given substring.
#[macro_export]
macro_rules! assert_err_contains {
    ($expr:expr, $substr:expr) => {{
        let result = $expr;
        let err = result.expect_err(concat!("expected Err for: ", stringify!($expr)));
        let msg = err.to_string();
        assert!(msg.contains($substr), "expected error containing {:?}, got: {msg:?}", $substr);
    }};
}

/// Token endpoint on 127.0.0.1 that replays canned responses in order,
/// repeating the last one once the list is exhausted.
pub struct MockTokenServer {
    pub addr: SocketAddr,
    calls: Arc<AtomicU32>,
    bodies: Arc<Mutex<Vec<String>>>,
}

impl MockTokenServer {
    pub async fn start(responses: Vec<(u16, String)>) -> Self {
        Self::start_with_delay(responses, Duration::ZERO).await
    }

    /// Like [`start`](Self::start) but sleeps before every response.
    pub async fn start_with_delay(responses: Vec<(u16, String)>, delay: Duration) -> Self {
        let calls = Arc::new(AtomicU32::new(0));
        let bodies = Arc::new(Mutex::new(Vec::new()));
        let responses = Arc::new(responses);

        let app = {
            let calls = Arc::clone(&calls);
            let bodies = Arc::clone(&bodies);
            Router::new().route(
                "/token",
                post(move |body: String| {
                    let calls = Arc::clone(&calls);
                    let bodies = Arc::clone(&bodies);
                    let resps = Arc::clone(&responses);
                    async move {
                        let idx = calls.fetch_add(1, Ordering::SeqCst) as usize;
                        bodies.lock().push(body);
                        if !delay.is_zero() {
                            tokio::time::sleep(delay).await;
                        }
                        let (status, body) = resps
                            .get(idx)
                            .or_else(|| resps.last())
                            .cloned()
                            .unwrap_or((500, "{}".to_owned()));
                        (
                            axum::http::StatusCode::from_u16(status)
                                .unwrap_or(axum::http::StatusCode::INTERNAL_SERVER_ERROR),
                            body,
                        )
                    }
                }),
            )
        };

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Self { addr, calls, bodies }
    }

    pub fn token_url(&self) -> String {
        format!("http://{}/token", self.addr)
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Form bodies received so far, in arrival order.
    pub fn bodies(&self) -> Vec<String> {
        self.bodies.lock().clone()
    }
}

/// JSON body for a successful refresh response.
pub fn token_body(access: &str, refresh: Option<&str>, expires_in: u64) -> String {
    let mut body = serde_json::json!({
        "access_token": access,
        "expires_in": expires_in,
        "token_type": "Bearer",
    });
    if let Some(rt) = refresh {
        body["refresh_token"] = serde_json::json!(rt);
    }
    body.to_string()
}

pub fn record(access: &str, refresh: &str, expiry_epoch_ms: u64) -> CredentialRecord {
    CredentialRecord {
        access_token: access.to_owned(),
        refresh_token: refresh.to_owned(),
        scope: "https://www.googleapis.com/auth/gmail.modify".to_owned(),
        token_type: "Bearer".to_owned(),
        expiry_epoch_ms,
        extra: serde_json::Map::new(),
    }
}

/// Expiry `offset_ms` away from now (negative means already in the past).
pub fn expiry_in(offset_ms: i64) -> u64 {
    let now = epoch_ms() as i64;
    now.saturating_add(offset_ms).max(0) as u64
}

pub fn write_registration(path: &Path) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create registration dir");
    }
    std::fs::write(
        path,
        r#"{"installed": {"client_id": "cid.apps.example.com", "client_secret": "shh", "redirect_uris": ["http://localhost"]}}"#,
    )
    .expect("write registration");
}

/// Account layout inside a temp dir with a valid registration already written.
pub fn account(dir: &Path) -> ResolvedPaths {
    let paths = ResolvedPaths {
        credentials: dir.join("credentials.json"),
        registration: dir.join("oauth-keys.json"),
    };
    write_registration(&paths.registration);
    paths
}

pub fn config_for(paths: &ResolvedPaths, token_url: &str) -> AuthConfig {
    AuthConfig {
        credentials_path: Some(path_str(&paths.credentials)),
        oauth_path: Some(path_str(&paths.registration)),
        token_url: token_url.to_owned(),
        refresh_timeout_ms: 2_000,
    }
}

fn path_str(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
