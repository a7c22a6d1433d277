use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde_json::{json, Value};

use super::{GoogleApi, HttpGoogleApi, TokenGrant};
use crate::config::GoogleConfig;
use crate::google::errors::SyncError;
use crate::google::store::GoogleCredential;

#[derive(Default)]
struct Calls {
    messages: AtomicUsize,
    token: AtomicUsize,
}

async fn list_messages(
    State(calls): State<Arc<Calls>>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    calls.messages.fetch_add(1, Ordering::SeqCst);
    let authorized = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        == Some("Bearer fresh");
    if authorized {
        (StatusCode::OK, Json(json!({"messages": [{"id": "m1"}]})))
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "invalid_token"})),
        )
    }
}

async fn grant_token(
    State(calls): State<Arc<Calls>>,
    Form(form): Form<HashMap<String, String>>,
) -> (StatusCode, Json<Value>) {
    calls.token.fetch_add(1, Ordering::SeqCst);
    let valid = form.get("grant_type").map(String::as_str) == Some("refresh_token")
        && form.get("refresh_token").map(String::as_str) == Some("refresh-me")
        && form.get("client_id").map(String::as_str) == Some("client");
    if valid {
        (
            StatusCode::OK,
            Json(json!({"access_token": "fresh", "expires_in": 3600})),
        )
    } else {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "invalid_grant"})),
        )
    }
}

async fn failing_events() -> (StatusCode, &'static str) {
    (StatusCode::INTERNAL_SERVER_ERROR, "backend unavailable")
}

/// Serves a fake Google API on a loopback port from a background runtime.
fn spawn_server(calls: Arc<Calls>) -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("loopback should bind");
    listener
        .set_nonblocking(true)
        .expect("listener should be non-blocking");
    let addr = listener.local_addr().expect("listener should have an address");
    let router = Router::new()
        .route("/api/gmail/v1/users/me/messages", get(list_messages))
        .route(
            "/api/calendar/v3/calendars/primary/events",
            get(failing_events),
        )
        .route("/token", post(grant_token))
        .with_state(calls);
    std::thread::spawn(move || {
        let runtime = tokio::runtime::Runtime::new().expect("runtime should start");
        runtime.block_on(async move {
            let listener =
                tokio::net::TcpListener::from_std(listener).expect("listener should convert");
            axum::serve(listener, router).await.expect("server should run");
        });
    });
    addr
}

fn config(addr: SocketAddr) -> GoogleConfig {
    GoogleConfig {
        client_id: Some("client".to_string()),
        client_secret: Some("secret".to_string()),
        token_uri: format!("http://{}/token", addr),
        api_base: format!("http://{}/api/", addr),
        ..GoogleConfig::default()
    }
}

fn credential(refresh_token: Option<&str>) -> GoogleCredential {
    GoogleCredential {
        user_id: 1,
        account_email: "owner@example.com".to_string(),
        access_token: "stale".to_string(),
        refresh_token: refresh_token.map(str::to_string),
        expires_at: None,
        updated_at: "2026-01-01T00:00:00Z".to_string(),
    }
}

#[test]
fn unauthorized_response_refreshes_once_and_retries() {
    let calls = Arc::new(Calls::default());
    let addr = spawn_server(Arc::clone(&calls));
    let mut api = HttpGoogleApi::new(&config(addr), &credential(Some("refresh-me")))
        .expect("client should build");

    let listed = api.list_messages(None).expect("retry should succeed");
    assert_eq!(listed.messages.len(), 1);
    assert_eq!(listed.messages[0].id, "m1");
    assert_eq!(calls.messages.load(Ordering::SeqCst), 2);
    assert_eq!(calls.token.load(Ordering::SeqCst), 1);
    assert_eq!(
        api.take_refreshed_token(),
        Some(TokenGrant {
            access_token: "fresh".to_string(),
            expires_in: Some(3600),
        })
    );
    assert!(api.take_refreshed_token().is_none());

    // the refreshed token is reused without another grant
    api.list_messages(None).expect("second listing should succeed");
    assert_eq!(calls.messages.load(Ordering::SeqCst), 3);
    assert_eq!(calls.token.load(Ordering::SeqCst), 1);
}

#[test]
fn unauthorized_without_refresh_token_is_an_auth_error() {
    let calls = Arc::new(Calls::default());
    let addr = spawn_server(Arc::clone(&calls));
    let mut api =
        HttpGoogleApi::new(&config(addr), &credential(None)).expect("client should build");

    let err = api.list_messages(None).expect_err("stale token should fail");
    assert!(matches!(err, SyncError::Auth(_)), "unexpected error: {err}");
    assert_eq!(calls.token.load(Ordering::SeqCst), 0);
}

#[test]
fn server_errors_map_to_api_errors_with_body() {
    let calls = Arc::new(Calls::default());
    let addr = spawn_server(Arc::clone(&calls));
    let mut api = HttpGoogleApi::new(&config(addr), &credential(Some("refresh-me")))
        .expect("client should build");

    let err = api.list_events(None).expect_err("500 should fail");
    match err {
        SyncError::Api { status, body } => {
            assert_eq!(status, 500);
            assert_eq!(body, "backend unavailable");
        }
        other => panic!("unexpected error: {other}"),
    }
}
