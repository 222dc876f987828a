//! Provider routes
//!
//! - GET /api/masters - nearby providers for a service category
//! - POST /api/masters/signup - create a provider record

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{error_response, json_response, parse_json};
use crate::geo::GeoPoint;
use crate::registry::{ProviderId, ServiceCategory};
use crate::server::AppState;
use crate::services::{MatchResult, SignupRequest, DEFAULT_RADIUS_KM};
use crate::types::{GatewayError, Result};

#[derive(Debug, Deserialize)]
pub struct MatchQuery {
    pub service: String,
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub radius_km: Option<f64>,
    #[serde(default)]
    pub verified_only: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct MatchResponse {
    pub items: Vec<MatchResult>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupResponse {
    pub ok: bool,
    pub master_id: ProviderId,
    pub auth_token: String,
}

async fn run_match(state: &AppState, query: Option<&str>) -> Result<MatchResponse> {
    let query: MatchQuery = serde_urlencoded::from_str(query.unwrap_or(""))
        .map_err(|e| GatewayError::Validation(format!("Invalid query: {}", e)))?;

    let category: ServiceCategory = query.service.parse()?;
    let origin = GeoPoint::new(query.lat, query.lng)?;

    let items = state
        .matching
        .find_nearby(
            category,
            origin,
            query.radius_km.unwrap_or(DEFAULT_RADIUS_KM),
            query.verified_only.unwrap_or(false),
        )
        .await?;

    Ok(MatchResponse { items })
}

/// GET /api/masters?service=&lat=&lng=&radius_km=&verified_only=
pub async fn handle_match(state: &AppState, query: Option<&str>) -> Response<Full<Bytes>> {
    match run_match(state, query).await {
        Ok(response) => json_response(StatusCode::OK, &response),
        Err(e) => {
            debug!(error = %e, "Match query rejected");
            error_response(&e)
        }
    }
}

/// POST /api/masters/signup
pub async fn handle_signup(state: &AppState, body: &[u8]) -> Response<Full<Bytes>> {
    let request: SignupRequest = match parse_json(body) {
        Ok(r) => r,
        Err(e) => return error_response(&e),
    };

    match state.onboarding.signup(request).await {
        Ok(outcome) => json_response(
            StatusCode::OK,
            &SignupResponse {
                ok: true,
                master_id: outcome.provider_id,
                auth_token: outcome.possession_token,
            },
        ),
        Err(e) => error_response(&e),
    }
}
