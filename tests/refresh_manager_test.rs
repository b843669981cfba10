//! Credential manager refresh behavior: idempotence, single-flight, grace
//! window, and refresh-token retention.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::*;
use playd::auth::{AccountsClient, AuthError, CredentialManager};
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn token_mock() -> wiremock::MockBuilder {
    Mock::given(method("POST")).and(path("/api/token"))
}

#[tokio::test]
async fn fresh_credential_never_hits_the_token_endpoint() {
    let dir = TempDir::new().unwrap();
    let credentials = fresh_credentials();
    credential_store(&dir).save(&credentials).unwrap();

    let accounts = MockServer::start().await;
    token_mock()
        .respond_with(ResponseTemplate::new(200).set_body_json(token_response_json()))
        .expect(0)
        .mount(&accounts)
        .await;

    let manager = manager_with_store(credential_store(&dir), &accounts.uri(), "http://unused");
    assert!(manager.bootstrap().await.unwrap());

    // Repeated refresh checks on a fresh credential are no-ops.
    manager.refresh_if_needed().await.unwrap();
    manager.refresh_if_needed().await.unwrap();
    manager.acquire_client().await.unwrap();

    // The stored credential is untouched.
    assert_eq!(
        credential_store(&dir).load().unwrap(),
        Some(credentials)
    );
}

#[tokio::test]
async fn credential_inside_grace_window_is_refreshed_before_handout() {
    let dir = TempDir::new().unwrap();
    // 30s from expiry: inside the 60s grace window.
    credential_store(&dir)
        .save(&credentials_expiring_in(30))
        .unwrap();

    let accounts = MockServer::start().await;
    token_mock()
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("cached-refresh-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_response_json()))
        .expect(1)
        .mount(&accounts)
        .await;

    let manager = manager_with_store(credential_store(&dir), &accounts.uri(), "http://unused");
    assert!(!manager.bootstrap().await.unwrap());

    manager.acquire_client().await.unwrap();

    let stored = credential_store(&dir).load().unwrap().unwrap();
    assert_eq!(stored.access_token, "new-access-token");
    assert_eq!(stored.refresh_token, "new-refresh-token");
}

#[tokio::test]
async fn concurrent_acquires_collapse_into_one_refresh() {
    let dir = TempDir::new().unwrap();
    credential_store(&dir).save(&expired_credentials()).unwrap();

    let accounts = MockServer::start().await;
    token_mock()
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(token_response_json())
                .set_delay(Duration::from_millis(100)),
        )
        .expect(1)
        .mount(&accounts)
        .await;

    let manager = manager_with_store(credential_store(&dir), &accounts.uri(), "http://unused");
    assert!(!manager.bootstrap().await.unwrap());

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let manager = Arc::clone(&manager);
            tokio::spawn(async move { manager.acquire_client().await.map(|_| ()) })
        })
        .collect();

    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let stored = credential_store(&dir).load().unwrap().unwrap();
    assert_eq!(stored.access_token, "new-access-token");
}

#[tokio::test]
async fn refresh_without_new_refresh_token_keeps_the_old_one() {
    let dir = TempDir::new().unwrap();
    credential_store(&dir).save(&expired_credentials()).unwrap();

    let accounts = MockServer::start().await;
    token_mock()
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "new-access-token",
            "token_type": "Bearer",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&accounts)
        .await;

    let manager = manager_with_store(credential_store(&dir), &accounts.uri(), "http://unused");
    manager.bootstrap().await.unwrap();
    manager.acquire_client().await.unwrap();

    let stored = credential_store(&dir).load().unwrap().unwrap();
    assert_eq!(stored.access_token, "new-access-token");
    assert_eq!(stored.refresh_token, "cached-refresh-token");
}

#[tokio::test]
async fn acquire_without_any_credential_is_unauthenticated() {
    let dir = TempDir::new().unwrap();
    let manager = manager_with_store(credential_store(&dir), "http://unused", "http://unused");
    assert!(!manager.bootstrap().await.unwrap());

    let err = manager.acquire_client().await.unwrap_err();
    assert!(matches!(err, AuthError::NotAuthenticated));
    assert!(err.requires_reauth());
}

#[tokio::test]
async fn refresh_loop_survives_a_failing_tick() {
    let dir = TempDir::new().unwrap();
    credential_store(&dir).save(&expired_credentials()).unwrap();

    let accounts = MockServer::start().await;
    // The first tick hits a token endpoint that is down.
    token_mock()
        .respond_with(ResponseTemplate::new(500).set_body_string("token service down"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&accounts)
        .await;
    // A later tick finds it back up.
    token_mock()
        .respond_with(ResponseTemplate::new(200).set_body_json(token_response_json()))
        .expect(1..)
        .mount(&accounts)
        .await;

    let manager = Arc::new(
        CredentialManager::new(
            credential_store(&dir),
            AccountsClient::new(accounts.uri(), "test-client", "test-secret"),
            "http://unused".to_string(),
        )
        .with_refresh_interval(Duration::from_millis(50)),
    );
    assert!(!manager.bootstrap().await.unwrap());

    let loop_handle = tokio::spawn(Arc::clone(&manager).run_refresh_loop());

    // The failed tick must not kill the loop: a later tick installs a
    // fresh handle.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while manager.installed_client().await.is_none() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "refresh loop never recovered from the failed tick"
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(!loop_handle.is_finished());
    loop_handle.abort();

    let stored = credential_store(&dir).load().unwrap().unwrap();
    assert_eq!(stored.access_token, "new-access-token");
}

#[tokio::test]
async fn rejected_refresh_token_surfaces_the_endpoint_error() {
    let dir = TempDir::new().unwrap();
    credential_store(&dir).save(&expired_credentials()).unwrap();

    let accounts = MockServer::start().await;
    token_mock()
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(serde_json::json!({"error": "invalid_grant"})),
        )
        .mount(&accounts)
        .await;

    let manager = manager_with_store(credential_store(&dir), &accounts.uri(), "http://unused");
    manager.bootstrap().await.unwrap();

    let err = manager.acquire_client().await.unwrap_err();
    assert!(matches!(err, AuthError::TokenEndpoint { status: 401, .. }));
    assert!(err.requires_reauth());

    // The cached credential (and its refresh token) survives the failure.
    let stored = credential_store(&dir).load().unwrap().unwrap();
    assert_eq!(stored.refresh_token, "cached-refresh-token");
}
