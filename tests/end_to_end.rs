//! Full verification flow over HTTP: signup, client token, webhook, match.

use bytes::Bytes;
use clap::Parser;
use hmac::{Hmac, Mac};
use http_body_util::Full;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde_json::{json, Value};
use sha2::Sha256;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

use master_match::config::Args;
use master_match::logging::AuditLogger;
use master_match::registry::MemoryRegistry;
use master_match::server::{serve, AppState};

const WEBHOOK_SECRET: &str = "webhook-secret";

async fn fake_vendor() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let service = service_fn(|req: Request<hyper::body::Incoming>| async move {
                    let signed = req.headers().contains_key("x-app-access-sig");
                    let (status, body) = if signed {
                        (StatusCode::OK, r#"{"token":"sdk-token","userId":"from-vendor"}"#)
                    } else {
                        (StatusCode::UNAUTHORIZED, r#"{"description":"unsigned"}"#)
                    };
                    Ok::<_, hyper::Error>(
                        Response::builder()
                            .status(status)
                            .header("Content-Type", "application/json")
                            .body(Full::new(Bytes::from_static(body.as_bytes())))
                            .unwrap(),
                    )
                });
                let _ = http1::Builder::new()
                    .serve_connection(TokioIo::new(stream), service)
                    .await;
            });
        }
    });

    addr
}

async fn start_app() -> String {
    let vendor = fake_vendor().await;
    let base_url = format!("http://{}", vendor);
    let args = Args::try_parse_from([
        "master-match",
        "--dev-mode",
        "--sumsub-app-token",
        "app-token",
        "--sumsub-secret-key",
        "sumsub-secret",
        "--sumsub-webhook-secret",
        WEBHOOK_SECRET,
        "--sumsub-base-url",
        base_url.as_str(),
    ])
    .unwrap();

    let state = Arc::new(AppState::new(
        args,
        Arc::new(MemoryRegistry::new()),
        AuditLogger::new("e2e".to_string()),
    )
    .unwrap());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(serve(listener, state));

    format!("http://{}", addr)
}

fn digest(body: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(WEBHOOK_SECRET.as_bytes()).unwrap();
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

async fn plumbers(client: &reqwest::Client, app: &str, verified_only: bool) -> Vec<Value> {
    let response: Value = client
        .get(format!(
            "{}/api/masters?service=plumber&lat=52.52&lng=13.405&radius_km=2&verified_only={}",
            app, verified_only
        ))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    response["items"].as_array().unwrap().clone()
}

#[tokio::test]
async fn test_signup_token_webhook_match() {
    let app = start_app().await;
    let client = reqwest::Client::new();

    let signup: Value = client
        .post(format!("{}/api/masters/signup", app))
        .json(&json!({
            "name": "Igor",
            "service": "plumber",
            "phone": "+491234567890",
            "email": "igor@example.com",
            "lat": 52.5208,
            "lng": 13.405,
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(signup["ok"], true);
    let master_id = signup["masterId"].as_u64().unwrap();
    let auth_token = signup["authToken"].as_str().unwrap().to_string();

    // Wrong possession token
    let response = client
        .post(format!("{}/api/kyc/sumsub-token", app))
        .json(&json!({ "masterId": master_id, "authToken": "guess" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::UNAUTHORIZED);

    // Correct token; vendor response comes back verbatim
    let response = client
        .post(format!("{}/api/kyc/sumsub-token", app))
        .json(&json!({ "masterId": master_id, "authToken": auth_token }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let token: Value = response.json().await.unwrap();
    assert_eq!(token["token"], "sdk-token");

    assert!(plumbers(&client, &app, true).await.is_empty());
    let listed = plumbers(&client, &app, false).await;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["isVerified"], false);

    let event = serde_json::to_vec(&json!({
        "type": "applicantReviewed",
        "externalUserId": format!("master:{}", master_id),
        "reviewResult": { "reviewAnswer": "GREEN" },
    }))
    .unwrap();

    // Tampered digest
    let response = client
        .post(format!("{}/api/sumsub/webhook", app))
        .header("x-payload-digest", "00".repeat(32))
        .body(event.clone())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::UNAUTHORIZED);

    // Valid, delivered twice
    for _ in 0..2 {
        let response = client
            .post(format!("{}/api/sumsub/webhook", app))
            .header("x-payload-digest", digest(&event))
            .header("x-payload-digest-alg", "HMAC_SHA256_HEX")
            .body(event.clone())
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        let ack: Value = response.json().await.unwrap();
        assert_eq!(ack["ok"], true);
    }

    let verified = plumbers(&client, &app, true).await;
    assert_eq!(verified.len(), 1);
    assert_eq!(verified[0]["id"], master_id);
    assert_eq!(verified[0]["isVerified"], true);
    assert_eq!(verified[0]["distanceKm"], 0.09);
}

#[tokio::test]
async fn test_webhook_without_digest_is_bad_request() {
    let app = start_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/sumsub/webhook", app))
        .body(r#"{"type":"applicantReviewed"}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unrecognized_event_is_acknowledged() {
    let app = start_app().await;
    let client = reqwest::Client::new();

    let body = br#"{"type":"applicantReviewed","externalUserId":"someone-else","reviewResult":{"reviewAnswer":"GREEN"}}"#;
    let response = client
        .post(format!("{}/api/sumsub/webhook", app))
        .header("x-payload-digest", digest(body))
        .body(body.to_vec())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
}

#[tokio::test]
async fn test_validation_and_fallbacks() {
    let app = start_app().await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/api/masters?service=gardener&lat=52.52&lng=13.405", app))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);

    let response = client
        .get(format!("{}/api/masters?service=plumber&lat=52.52&lng=13.405&radius_km=50", app))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);

    let response = client
        .post(format!("{}/api/masters/signup", app))
        .json(&json!({ "name": "I", "service": "plumber", "phone": "+491234567", "lat": 0.0, "lng": 0.0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);

    let response = client.get(format!("{}/nowhere", app)).send().await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);

    let health: Value = client
        .get(format!("{}/health", app))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["healthy"], true);
    assert_eq!(health["registry"], "memory");
    assert_eq!(health["vendorConfigured"], true);
}
