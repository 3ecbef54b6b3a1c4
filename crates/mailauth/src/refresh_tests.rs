// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use super::*;
use crate::registration::DEFAULT_REDIRECT_URI;
use crate::test_support::{expiry_in, record, token_body, MockTokenServer};

fn registration() -> ClientRegistration {
    ClientRegistration {
        client_id: "cid".to_owned(),
        client_secret: "secret".to_owned(),
        redirect_uri: DEFAULT_REDIRECT_URI.to_owned(),
    }
}

fn refresher(token_url: &str) -> anyhow::Result<Refresher> {
    Ok(Refresher::new(crate::http::build_client()?, token_url, Duration::from_secs(2)))
}

fn token(access: &str, refresh: Option<&str>, expires_in: Option<u64>) -> TokenResponse {
    TokenResponse {
        access_token: access.to_owned(),
        refresh_token: refresh.map(str::to_owned),
        expires_in,
        scope: None,
        token_type: None,
    }
}

const NOW: u64 = 1_760_000_000_000;

#[test]
fn apply_keeps_refresh_token_when_omitted() -> anyhow::Result<()> {
    let current = record("old", "keep-me", NOW - 1);
    let updated = apply_token(&current, token("new", None, Some(3599)), NOW)?;
    assert_eq!(updated.access_token, "new");
    assert_eq!(updated.refresh_token, "keep-me");
    assert_eq!(updated.expiry_epoch_ms, NOW + 3_599_000);
    Ok(())
}

#[test]
fn apply_takes_rotated_refresh_token() -> anyhow::Result<()> {
    let current = record("old", "r1", NOW - 1);
    let updated = apply_token(&current, token("new", Some("r2"), Some(3600)), NOW)?;
    assert_eq!(updated.refresh_token, "r2");
    Ok(())
}

#[test]
fn apply_ignores_blank_rotated_refresh_token() -> anyhow::Result<()> {
    let current = record("old", "r1", NOW - 1);
    let updated = apply_token(&current, token("new", Some("  "), Some(3600)), NOW)?;
    assert_eq!(updated.refresh_token, "r1");
    Ok(())
}

#[test]
fn apply_defaults_missing_lifetime_to_one_hour() -> anyhow::Result<()> {
    let current = record("old", "r", NOW - 1);
    let updated = apply_token(&current, token("new", None, None), NOW)?;
    assert_eq!(updated.expiry_epoch_ms, NOW + 3_600_000);
    Ok(())
}

#[test]
fn apply_preserves_scope_type_and_extra_fields() -> anyhow::Result<()> {
    let mut current = record("old", "r", NOW - 1);
    current.extra.insert("id_token".to_owned(), serde_json::json!("jwt"));
    let mut resp = token("new", None, Some(60 * 60));
    resp.scope = Some("something-else".to_owned());
    resp.token_type = Some("bearer".to_owned());

    let updated = apply_token(&current, resp, NOW)?;
    assert_eq!(updated.scope, current.scope);
    assert_eq!(updated.token_type, "Bearer");
    assert_eq!(updated.extra.get("id_token"), Some(&serde_json::json!("jwt")));
    Ok(())
}

#[test]
fn apply_fills_token_type_when_record_has_none() -> anyhow::Result<()> {
    let mut current = record("old", "r", NOW - 1);
    current.token_type.clear();
    let mut resp = token("new", None, Some(3600));
    resp.token_type = Some("Bearer".to_owned());
    assert_eq!(apply_token(&current, resp, NOW)?.token_type, "Bearer");
    Ok(())
}

#[test]
fn apply_rejects_empty_access_token() {
    let current = record("old", "r", NOW - 1);
    let err = apply_token(&current, token("", None, Some(3600)), NOW).expect_err("rejected");
    assert_eq!(err.kind, RefreshFailureKind::Malformed);
}

#[yare::parameterized(
    shorter_than_stored = { Some(60), NOW + 200_000, NOW + 60_000 },
    same_as_stored      = { Some(60), NOW + 60_000, NOW + 60_000 },
    zero_lifetime       = { Some(0), NOW - 1, NOW },
)]
fn apply_uses_issued_lifetime(expires_in: Option<u64>, old_expiry: u64, want: u64) {
    let current = record("old", "r1", old_expiry);
    let updated = apply_token(&current, token("new", Some("r2"), expires_in), NOW).expect("applied");
    assert_eq!(updated.access_token, "new");
    assert_eq!(updated.refresh_token, "r2");
    assert_eq!(updated.expiry_epoch_ms, want);
}

#[tokio::test]
async fn refresh_persists_before_returning() -> anyhow::Result<()> {
    let server = MockTokenServer::start(vec![(200, token_body("fresh", None, 3600))]).await;
    let dir = tempfile::tempdir()?;
    let store = CredentialStore::new(dir.path().join("credentials.json"));
    let current = record("stale", "r1", expiry_in(-1_000));
    store.save(&current)?;

    let updated = refresher(&server.token_url())?.refresh(&store, &registration(), &current).await?;

    assert_eq!(server.calls(), 1);
    assert_eq!(updated.access_token, "fresh");
    assert_eq!(updated.refresh_token, "r1");
    assert!(updated.expiry_epoch_ms > current.expiry_epoch_ms);
    assert_eq!(store.load(), Some(updated));
    Ok(())
}

#[tokio::test]
async fn exchange_sends_refresh_grant_form() -> anyhow::Result<()> {
    let server = MockTokenServer::start(vec![(200, token_body("a", None, 3600))]).await;
    refresher(&server.token_url())?.exchange(&registration(), "1//rt").await?;

    let bodies = server.bodies();
    assert_eq!(bodies.len(), 1);
    let form = &bodies[0];
    assert!(form.contains("grant_type=refresh_token"), "{form}");
    assert!(form.contains("client_id=cid"), "{form}");
    assert!(form.contains("client_secret=secret"), "{form}");
    assert!(form.contains("refresh_token=1%2F%2Frt"), "{form}");
    Ok(())
}

#[tokio::test]
async fn missing_refresh_token_makes_no_request() -> anyhow::Result<()> {
    let server = MockTokenServer::start(vec![(200, token_body("a", None, 3600))]).await;
    let dir = tempfile::tempdir()?;
    let store = CredentialStore::new(dir.path().join("credentials.json"));
    let current = record("stale", "", expiry_in(-1_000));

    let err = refresher(&server.token_url())?
        .refresh(&store, &registration(), &current)
        .await
        .expect_err("no refresh token");
    assert_eq!(err.as_str(), "MISSING_REFRESH_TOKEN");
    assert_eq!(server.calls(), 0);
    Ok(())
}

#[yare::parameterized(
    invalid_grant   = { 400, r#"{"error":"invalid_grant","error_description":"Token has been expired or revoked."}"#, RefreshFailureKind::Revoked },
    invalid_client  = { 401, r#"{"error":"invalid_client"}"#, RefreshFailureKind::Rejected },
    server_error    = { 503, "upstream unavailable", RefreshFailureKind::Transport },
    rate_limited    = { 429, r#"{"error":"rate_limited"}"#, RefreshFailureKind::Transport },
    garbage_success = { 200, "not json", RefreshFailureKind::Malformed },
)]
#[test_macro(tokio::test)]
async fn failure_is_classified_and_store_untouched(
    status: u16,
    body: &str,
    kind: RefreshFailureKind,
) {
    let server = MockTokenServer::start(vec![(status, body.to_owned())]).await;
    let dir = tempfile::tempdir().expect("tempdir");
    let store = CredentialStore::new(dir.path().join("credentials.json"));
    let current = record("stale", "r1", expiry_in(-1_000));
    store.save(&current).expect("seed");

    let err = refresher(&server.token_url())
        .expect("refresher")
        .refresh(&store, &registration(), &current)
        .await
        .expect_err("refresh should fail");

    assert!(
        matches!(&err, AuthError::RefreshFailed(f) if f.kind == kind),
        "unexpected error: {err}"
    );
    assert_eq!(store.load(), Some(current));
}

#[tokio::test]
async fn short_lifetime_with_rotation_is_saved() -> anyhow::Result<()> {
    let server = MockTokenServer::start(vec![(200, token_body("a2", Some("r2"), 60))]).await;
    let dir = tempfile::tempdir()?;
    let store = CredentialStore::new(dir.path().join("credentials.json"));
    let current = record("stale", "r1", expiry_in(200_000));
    store.save(&current)?;

    let updated = refresher(&server.token_url())?.refresh(&store, &registration(), &current).await?;

    assert_eq!(updated.access_token, "a2");
    assert_eq!(updated.refresh_token, "r2");
    assert!(updated.expiry_epoch_ms < current.expiry_epoch_ms);
    assert_eq!(store.load(), Some(updated));
    Ok(())
}

#[tokio::test]
async fn rotated_refresh_token_survives_unusable_response() -> anyhow::Result<()> {
    let server = MockTokenServer::start(vec![(200, token_body("", Some("r2"), 3600))]).await;
    let dir = tempfile::tempdir()?;
    let store = CredentialStore::new(dir.path().join("credentials.json"));
    let current = record("stale", "r1", expiry_in(-1_000));
    store.save(&current)?;

    let err = refresher(&server.token_url())?
        .refresh(&store, &registration(), &current)
        .await
        .err()
        .ok_or_else(|| anyhow::anyhow!("expected failure"))?;

    assert!(matches!(&err, AuthError::RefreshFailed(f) if f.kind == RefreshFailureKind::Malformed));
    let stored = store.load().ok_or_else(|| anyhow::anyhow!("record missing"))?;
    assert_eq!(stored.refresh_token, "r2");
    assert_eq!(stored.access_token, "stale");
    assert_eq!(stored.expiry_epoch_ms, current.expiry_epoch_ms);
    Ok(())
}

#[tokio::test]
async fn slow_endpoint_times_out() -> anyhow::Result<()> {
    let server = MockTokenServer::start_with_delay(
        vec![(200, token_body("late", None, 3600))],
        Duration::from_secs(5),
    )
    .await;
    let dir = tempfile::tempdir()?;
    let store = CredentialStore::new(dir.path().join("credentials.json"));
    let current = record("stale", "r1", expiry_in(-1_000));
    store.save(&current)?;

    let refresher =
        Refresher::new(crate::http::build_client()?, server.token_url(), Duration::from_millis(200));
    let err = refresher.refresh(&store, &registration(), &current).await.expect_err("timeout");

    match err {
        AuthError::RefreshFailed(f) => assert_eq!(f.kind, RefreshFailureKind::Timeout),
        other => anyhow::bail!("unexpected error: {other}"),
    }
    assert_eq!(store.load(), Some(current));
    Ok(())
}

#[tokio::test]
async fn unreachable_endpoint_is_transport_failure() -> anyhow::Result<()> {
    // Bind then drop to get a port nothing listens on.
    let port = std::net::TcpListener::bind("127.0.0.1:0")?.local_addr()?.port();
    let err = refresher(&format!("http://127.0.0.1:{port}/token"))?
        .exchange(&registration(), "r1")
        .await
        .expect_err("connection refused");
    assert_eq!(err.kind, RefreshFailureKind::Transport);
    Ok(())
}

#[tokio::test]
async fn persist_failure_is_reported() -> anyhow::Result<()> {
    let server = MockTokenServer::start(vec![(200, token_body("fresh", None, 3600))]).await;
    let dir = tempfile::tempdir()?;
    // Parent "directory" is a regular file, so the write cannot succeed.
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, "")?;
    let store = CredentialStore::new(blocker.join("credentials.json"));
    let current = record("stale", "r1", expiry_in(-1_000));

    let err = refresher(&server.token_url())?
        .refresh(&store, &registration(), &current)
        .await
        .expect_err("persist");
    match err {
        AuthError::RefreshFailed(f) => assert_eq!(f.kind, RefreshFailureKind::Persist),
        other => anyhow::bail!("unexpected error: {other}"),
    }
    Ok(())
}
