//! Token relay integration tests
//!
//! Runs the relay against a stub tokeninfo endpoint on an ephemeral port.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{extract::Query, routing::get, Json, Router};
use mangrove_admin::relay::{create_router, Args, RelayState};
use serde_json::{json, Value};

const CLIENT_ID: &str = "test-client.apps.example";

/// Stub of Google's tokeninfo: the token value selects the reply
async fn tokeninfo(Query(params): Query<HashMap<String, String>>) -> axum::response::Response {
    use axum::response::IntoResponse;

    match params.get("id_token").map(String::as_str) {
        Some("good") => Json(json!({
            "aud": CLIENT_ID,
            "name": "Ranger One",
            "email": "ranger@example.org",
            "picture": "https://example.org/r.png"
        }))
        .into_response(),
        Some("foreign") => Json(json!({ "aud": "someone-else.apps.example" })).into_response(),
        Some("garbage") => "<html>oops</html>".into_response(),
        _ => (
            axum::http::StatusCode::BAD_REQUEST,
            Json(json!({ "error": "invalid_token" })),
        )
            .into_response(),
    }
}

async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn start_relay(tokeninfo_url: String) -> String {
    let args = Args {
        listen: "127.0.0.1:0".parse().unwrap(),
        client_id: Some(CLIENT_ID.to_string()),
        tokeninfo_url,
        request_timeout_ms: 2_000,
        log_level: "info".to_string(),
    };
    let state = Arc::new(RelayState::from_args(&args).unwrap());
    spawn(create_router(state)).await
}

async fn verify(relay: &str, body: &str) -> (u16, Value) {
    let res = reqwest::Client::new()
        .post(format!("{}/verify-token", relay))
        .header("Content-Type", "application/json")
        .body(body.to_string())
        .send()
        .await
        .unwrap();
    let status = res.status().as_u16();
    (status, res.json().await.unwrap())
}

#[tokio::test]
async fn test_verification_outcomes() {
    let google = spawn(Router::new().route("/tokeninfo", get(tokeninfo))).await;
    let relay = start_relay(format!("{}/tokeninfo", google)).await;

    let (status, body) = verify(&relay, r#"{"token":"good"}"#).await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
    assert_eq!(body["user"]["email"], "ranger@example.org");
    assert_eq!(body["user"]["name"], "Ranger One");

    let (status, body) = verify(&relay, r#"{"token":"foreign"}"#).await;
    assert_eq!(status, 200);
    assert_eq!(body, json!({ "success": false, "message": "Invalid Client ID" }));

    // Google's error reply has no audience
    let (_, body) = verify(&relay, r#"{"token":"expired"}"#).await;
    assert_eq!(body["message"], "Invalid Client ID");

    let (_, body) = verify(&relay, r#"{"token":"garbage"}"#).await;
    assert_eq!(body, json!({ "success": false, "message": "Verification failed" }));
}

#[tokio::test]
async fn test_missing_token() {
    let relay = start_relay("http://127.0.0.1:9/tokeninfo".to_string()).await;

    for body in ["{}", r#"{"token":""}"#, "not json"] {
        let (status, reply) = verify(&relay, body).await;
        assert_eq!(status, 200);
        assert_eq!(reply["message"], "Missing token");
    }
}

#[tokio::test]
async fn test_unreachable_upstream() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let closed = format!("http://{}/tokeninfo", listener.local_addr().unwrap());
    drop(listener);

    let relay = start_relay(closed).await;
    let (status, body) = verify(&relay, r#"{"token":"good"}"#).await;
    assert_eq!(status, 200);
    assert_eq!(body["message"], "Verification failed");
}

#[tokio::test]
async fn test_cors() {
    let relay = start_relay("http://127.0.0.1:9/tokeninfo".to_string()).await;
    let client = reqwest::Client::new();

    let preflight = client
        .request(reqwest::Method::OPTIONS, format!("{}/verify-token", relay))
        .send()
        .await
        .unwrap();
    assert_eq!(preflight.status().as_u16(), 204);
    assert_eq!(
        preflight.headers()["access-control-allow-origin"],
        "*"
    );

    let res = client
        .post(format!("{}/verify-token", relay))
        .body("{}")
        .send()
        .await
        .unwrap();
    assert_eq!(res.headers()["access-control-allow-origin"], "*");
}
