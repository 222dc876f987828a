//! Identity verification routes
//!
//! - POST /api/kyc/sumsub-token - client access token for a provider
//! - POST /api/sumsub/webhook - vendor callbacks

use bytes::Bytes;
use http_body_util::Full;
use hyper::{HeaderMap, Response, StatusCode};
use serde::Deserialize;
use tracing::{debug, error, warn};

use super::{bad_request_response, error_response, json_response, parse_json};
use crate::registry::ProviderId;
use crate::server::AppState;
use crate::services::webhook::{DIGEST_ALG_HEADER, DIGEST_HEADER};
use crate::services::VerificationEvent;
use crate::types::GatewayError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientTokenRequest {
    pub master_id: ProviderId,
    pub auth_token: String,
}

/// POST /api/kyc/sumsub-token
///
/// The vendor's response is passed through unchanged.
pub async fn handle_client_token(state: &AppState, body: &[u8]) -> Response<Full<Bytes>> {
    let request: ClientTokenRequest = match parse_json(body) {
        Ok(r) => r,
        Err(e) => return error_response(&e),
    };

    match state
        .onboarding
        .issue_client_token(request.master_id, &request.auth_token)
        .await
    {
        Ok(vendor_response) => json_response(StatusCode::OK, &vendor_response),
        Err(e) => error_response(&e),
    }
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn acknowledged() -> Response<Full<Bytes>> {
    json_response(StatusCode::OK, &serde_json::json!({ "ok": true }))
}

/// POST /api/sumsub/webhook
///
/// Once the digest checks out the callback is always acknowledged, whether or
/// not the event meant anything to us. Registry failures are the exception:
/// they answer 503 so the vendor redelivers.
pub async fn handle_webhook(state: &AppState, headers: &HeaderMap, body: &[u8]) -> Response<Full<Bytes>> {
    let Some(digest) = header(headers, DIGEST_HEADER) else {
        return bad_request_response("missing x-payload-digest header");
    };
    if !state.webhook.is_configured() {
        error!("Webhook received but SUMSUB_WEBHOOK_SECRET is not configured");
        return bad_request_response("webhook secret is not configured");
    }

    let algorithm = header(headers, DIGEST_ALG_HEADER).or(Some("HMAC_SHA256_HEX"));
    if !state.webhook.verify(body, digest, algorithm) {
        warn!("Webhook signature mismatch");
        state.audit.log_webhook_rejected("signature mismatch").await;
        return error_response(&GatewayError::Unauthorized("invalid webhook signature".to_string()));
    }

    let event: VerificationEvent = match serde_json::from_slice(body) {
        Ok(event) => event,
        Err(e) => {
            warn!(error = %e, "Authenticated webhook with unreadable body, acknowledging");
            return acknowledged();
        }
    };

    match state.trust.apply_event(&event).await {
        Ok(outcome) => {
            debug!(?outcome, "Verification event handled");
            acknowledged()
        }
        Err(e) => {
            error!(error = %e, event_type = %event.event_type, "Failed to apply verification event");
            error_response(&e)
        }
    }
}
