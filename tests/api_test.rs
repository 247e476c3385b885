//! End-to-end tests through the router over the in-memory store

use bytes::Bytes;
use clap::Parser;
use http_body_util::{BodyExt, Full};
use hyper::{Method, Request, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio_test::{assert_err, assert_ok};

use storehouse::auth::SessionCodec;
use storehouse::db::MemoryStore;
use storehouse::routes::{route, MAX_BODY_BYTES};
use storehouse::types::User;
use storehouse::{AppState, Args};

const SECRET: &str = "integration-secret-with-more-than-32-bytes";

fn state() -> Arc<AppState> {
    let args = Args::parse_from(["storehouse", "--jwt-secret", SECRET]);
    Arc::new(AppState::new(args, Arc::new(MemoryStore::new())).unwrap())
}

async fn call(
    state: &Arc<AppState>,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {}", token));
    }
    let body = body.map(|b| b.to_string()).unwrap_or_default();
    let req = builder.body(Full::new(Bytes::from(body))).unwrap();

    let response = route(Arc::clone(state), req).await;
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn call_raw_auth(state: &Arc<AppState>, uri: &str, header: &str) -> StatusCode {
    let req = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .header("Authorization", header)
        .body(Full::new(Bytes::new()))
        .unwrap();
    route(Arc::clone(state), req).await.status()
}

async fn login_token(state: &Arc<AppState>, email: &str) -> String {
    let creds = json!({"email": email, "password": "password123"});
    let (status, _) = call(state, Method::POST, "/register", None, Some(creds.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = call(state, Method::POST, "/login", None, Some(creds)).await;
    assert_eq!(status, StatusCode::OK);
    body["token"].as_str().unwrap().to_string()
}

async fn create_item(state: &Arc<AppState>, token: &str, name: &str, quantity: i64) -> String {
    let (status, body) = call(
        state,
        Method::POST,
        "/api/items",
        Some(token),
        Some(json!({"name": name, "quantity": quantity})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn register_and_login_round_trip() {
    let state = state();
    let creds = json!({"email": "alice@example.com", "password": "password123"});

    let (status, body) = call(&state, Method::POST, "/register", None, Some(creds.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "user registered successfully");
    let user_id = body["user_id"].as_str().unwrap().to_string();

    let (status, body) = call(&state, Method::POST, "/login", None, Some(creds)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["id"], user_id.as_str());
    assert_eq!(body["user"]["email"], "alice@example.com");
    assert!(body["user"].get("password_hash").is_none());
    assert!(body["expires_at"].as_u64().is_some());

    let token = body["token"].as_str().unwrap();
    let (status, _) = call(&state, Method::GET, "/api/items", Some(token), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn duplicate_registration_conflicts() {
    let state = state();
    let creds = json!({"email": "bob@example.com", "password": "password123"});

    let (status, _) = call(&state, Method::POST, "/register", None, Some(creds.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = call(&state, Method::POST, "/register", None, Some(creds)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "user already exists");
}

#[tokio::test]
async fn registration_validation() {
    let state = state();

    let (status, _) = call(
        &state,
        Method::POST,
        "/register",
        None,
        Some(json!({"email": "nope", "password": "password123"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(
        &state,
        Method::POST,
        "/register",
        None,
        Some(json!({"email": "carol@example.com", "password": "short"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(&state, Method::POST, "/register", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn login_failures_look_identical() {
    let state = state();
    login_token(&state, "dave@example.com").await;

    let (wrong_status, wrong_body) = call(
        &state,
        Method::POST,
        "/login",
        None,
        Some(json!({"email": "dave@example.com", "password": "not-the-password"})),
    )
    .await;
    let (unknown_status, unknown_body) = call(
        &state,
        Method::POST,
        "/login",
        None,
        Some(json!({"email": "nobody@example.com", "password": "password123"})),
    )
    .await;

    assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_status, unknown_status);
    assert_eq!(wrong_body, unknown_body);
    assert_eq!(wrong_body["error"], "invalid credentials");
}

#[tokio::test]
async fn protected_routes_reject_bad_credentials() {
    let state = state();

    let (status, _) = call(&state, Method::GET, "/api/items", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    for header in ["Bear", "B", "Bearer", "Bearer ", "Basic abc", "Bearer not.a.token"] {
        assert_eq!(
            call_raw_auth(&state, "/api/items", header).await,
            StatusCode::UNAUTHORIZED,
            "header {:?}",
            header
        );
    }

    // Signed with a different secret
    let other = SessionCodec::new("some-other-secret-that-is-32-bytes-long!", 3600).unwrap();
    let user = User::new("eve@example.com".into(), "hash".into());
    let forged = other.issue(&user).unwrap();
    let (status, _) = call(&state, Method::GET, "/api/items", Some(&forged.token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn expired_token_rejected() {
    let state = state();
    let codec = SessionCodec::new(SECRET, 60).unwrap();
    let user = User::new("frank@example.com".into(), "hash".into());
    let issued = codec
        .issue_at(&user, jsonwebtoken::get_current_timestamp() - 3600)
        .unwrap();

    let (status, body) = call(&state, Method::GET, "/api/items", Some(&issued.token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid or expired token");
}

#[tokio::test]
async fn item_crud() {
    let state = state();
    let token = login_token(&state, "grace@example.com").await;

    let id = create_item(&state, &token, "Bolts", 50).await;

    let (status, body) = call(&state, Method::GET, &format!("/api/items/{}", id), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Bolts");
    assert_eq!(body["quantity"], 50);

    let (status, body) = call(
        &state,
        Method::PUT,
        &format!("/api/items/{}", id),
        Some(&token),
        Some(json!({"quantity": 5})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["quantity"], 5);
    assert_eq!(body["name"], "Bolts");

    let (status, body) = call(&state, Method::GET, "/api/items/low-stock", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, body) = call(&state, Method::DELETE, &format!("/api/items/{}", id), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "item deleted successfully");

    let (status, _) = call(&state, Method::GET, &format!("/api/items/{}", id), Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn item_validation_and_routing() {
    let state = state();
    let token = login_token(&state, "heidi@example.com").await;

    let (status, _) = call(
        &state,
        Method::POST,
        "/api/items",
        Some(&token),
        Some(json!({"name": "", "quantity": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(
        &state,
        Method::POST,
        "/api/items",
        Some(&token),
        Some(json!({"name": "Nuts", "quantity": -1})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = call(&state, Method::GET, "/api/items/not-a-uuid", Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid item ID");

    let (status, _) = call(&state, Method::PATCH, "/api/items", Some(&token), None).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);

    let (status, _) = call(&state, Method::GET, "/api/unknown", Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = call(&state, Method::GET, "/register", None, None).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);

    let (status, _) = call(&state, Method::OPTIONS, "/api/items", None, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn oversized_body_rejected() {
    let state = state();
    let token = login_token(&state, "ivan@example.com").await;

    let name = "x".repeat(MAX_BODY_BYTES + 1);
    let (status, _) = call(
        &state,
        Method::POST,
        "/api/items",
        Some(&token),
        Some(json!({"name": name})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn restock_cap_and_history() {
    let state = state();
    let token = login_token(&state, "judy@example.com").await;
    let id = create_item(&state, &token, "Washers", 0).await;
    let restock_uri = format!("/api/items/{}/restock", id);

    for (n, amount) in [100, 200, 300].into_iter().enumerate() {
        let (status, body) = call(
            &state,
            Method::POST,
            &restock_uri,
            Some(&token),
            Some(json!({"amount": amount})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "item restocked successfully");
        assert_eq!(body["restocks"], (n + 1) as u64);
    }

    let (status, body) = call(
        &state,
        Method::POST,
        &restock_uri,
        Some(&token),
        Some(json!({"amount": 50})),
    )
    .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(
        body["error"],
        "rate limit exceeded: maximum 3 restocks per item in 24 hours"
    );

    let (status, body) = call(&state, Method::GET, &format!("/api/items/{}", id), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["quantity"], 600);

    let (status, body) = call(
        &state,
        Method::GET,
        &format!("/api/items/{}/restock-history", id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let amounts: Vec<i64> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["amount"].as_i64().unwrap())
        .collect();
    assert_eq!(amounts, vec![300, 200, 100]);
}

#[tokio::test]
async fn restock_amount_bounds_and_missing_item() {
    let state = state();
    let token = login_token(&state, "ken@example.com").await;
    let id = create_item(&state, &token, "Gaskets", 0).await;

    for amount in [5, 5000] {
        let (status, _) = call(
            &state,
            Method::POST,
            &format!("/api/items/{}/restock", id),
            Some(&token),
            Some(json!({"amount": amount})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    let item_id = uuid::Uuid::parse_str(&id).unwrap();
    assert_ok!(state.restock.history(item_id).await);
    assert!(state.restock.history(item_id).await.unwrap().is_empty());

    let missing = uuid::Uuid::new_v4();
    let (status, _) = call(
        &state,
        Method::POST,
        &format!("/api/items/{}/restock", missing),
        Some(&token),
        Some(json!({"amount": 50})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_err!(state.restock.history(missing).await);
}

#[tokio::test]
async fn restock_overflow_rejected_without_side_effects() {
    let state = state();
    let token = login_token(&state, "max@example.com").await;
    let id = create_item(&state, &token, "Sand", i64::MAX - 5).await;

    let (status, body) = call(
        &state,
        Method::POST,
        &format!("/api/items/{}/restock", id),
        Some(&token),
        Some(json!({"amount": 10})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "quantity overflow");

    let (status, body) = call(&state, Method::GET, &format!("/api/items/{}", id), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["quantity"], i64::MAX - 5);

    let item_id = uuid::Uuid::parse_str(&id).unwrap();
    assert!(state.restock.history(item_id).await.unwrap().is_empty());
    assert_eq!(state.restock.active_locks(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_restocks_respect_cap() {
    let state = state();
    let token = login_token(&state, "leo@example.com").await;
    let id = create_item(&state, &token, "Rivets", 0).await;

    let mut handles = Vec::new();
    for _ in 0..10 {
        let state = Arc::clone(&state);
        let token = token.clone();
        let uri = format!("/api/items/{}/restock", id);
        handles.push(tokio::spawn(async move {
            call(&state, Method::POST, &uri, Some(&token), Some(json!({"amount": 10})))
                .await
                .0
        }));
    }

    let mut ok = 0;
    let mut limited = 0;
    for handle in handles {
        match handle.await.unwrap() {
            StatusCode::OK => ok += 1,
            StatusCode::TOO_MANY_REQUESTS => limited += 1,
            other => panic!("unexpected status {}", other),
        }
    }
    assert_eq!(ok, 3);
    assert_eq!(limited, 7);
}

#[tokio::test]
async fn health_is_public() {
    let state = state();
    let (status, body) = call(&state, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["healthy"], true);
    assert_eq!(body["store"], "memory");
}
