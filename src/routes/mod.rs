//! HTTP routes for master-match
//!
//! Handlers take already-collected request bodies and return complete
//! responses; the server owns body limits and dispatch.

pub mod health;
pub mod kyc;
pub mod masters;

pub use health::{health_check, version_info};
pub use kyc::{handle_client_token, handle_webhook};
pub use masters::{handle_match, handle_signup};

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::{Deserialize, Serialize};

use crate::types::GatewayError;

/// JSON response with CORS headers
pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());

    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(Bytes::from(json)))
        .unwrap()
}

/// Render a service error
pub fn error_response(err: &GatewayError) -> Response<Full<Bytes>> {
    json_response(err.status_code(), &err.to_json())
}

/// Decode a JSON request body
pub fn parse_json<T: for<'de> Deserialize<'de>>(body: &[u8]) -> Result<T, GatewayError> {
    serde_json::from_slice(body).map_err(|e| GatewayError::Validation(format!("Invalid JSON: {}", e)))
}

/// CORS preflight response
pub fn preflight_response() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Headers", "Content-Type, x-payload-digest, x-payload-digest-alg")
        .header("Access-Control-Allow-Methods", "GET, POST, OPTIONS")
        .header("Access-Control-Max-Age", "86400")
        .body(Full::new(Bytes::new()))
        .unwrap()
}

pub fn not_found_response(path: &str) -> Response<Full<Bytes>> {
    error_response(&GatewayError::NotFound(format!("no route for {}", path)))
}

pub fn bad_request_response(message: &str) -> Response<Full<Bytes>> {
    json_response(
        StatusCode::BAD_REQUEST,
        &serde_json::json!({
            "error": "validation",
            "message": message,
        }),
    )
}
