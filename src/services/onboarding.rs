//! Provider signup and client-token issuance
//!
//! Signup creates the record and hands out the possession token exactly once.
//! Token issuance checks that token before anything reaches the vendor, and
//! only marks verification as started once the vendor has answered.

use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

use super::trust::VerificationStateMachine;
use super::vendor_client::{ApplicantIdentifiers, VerificationClient};
use crate::auth::{generate_possession_token, hash_possession_token, verify_possession_token};
use crate::geo::GeoPoint;
use crate::logging::AuditLogger;
use crate::registry::{NewProvider, ProviderId, ProviderRegistry, ServiceCategory, TrustState};
use crate::types::{GatewayError, Result};

pub const NAME_CHARS: (usize, usize) = (2, 80);
pub const PHONE_CHARS: (usize, usize) = (6, 30);

/// Starting rating for new providers
pub const INITIAL_RATING: f64 = 4.5;

#[derive(Debug, Clone, Deserialize)]
pub struct SignupRequest {
    pub name: String,
    pub service: ServiceCategory,
    pub phone: String,
    #[serde(default)]
    pub email: Option<String>,
    pub lat: f64,
    pub lng: f64,
}

/// Returned once; the token is not retrievable afterwards
#[derive(Debug, Clone)]
pub struct SignupOutcome {
    pub provider_id: ProviderId,
    pub possession_token: String,
}

fn check_length(field: &str, value: &str, (min, max): (usize, usize)) -> Result<()> {
    let len = value.chars().count();
    if len < min || len > max {
        return Err(GatewayError::Validation(format!(
            "{} must be {}-{} characters",
            field, min, max
        )));
    }
    Ok(())
}

impl SignupRequest {
    /// Validate and normalize into a registry record (minus the hash)
    fn into_profile(self) -> Result<(NewProviderProfile, GeoPoint)> {
        let name = self.name.trim().to_string();
        let phone = self.phone.trim().to_string();
        check_length("name", &name, NAME_CHARS)?;
        check_length("phone", &phone, PHONE_CHARS)?;
        let location = GeoPoint::new(self.lat, self.lng)?;

        let email = self
            .email
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty());

        Ok((
            NewProviderProfile {
                name,
                category: self.service,
                phone,
                email,
            },
            location,
        ))
    }
}

struct NewProviderProfile {
    name: String,
    category: ServiceCategory,
    phone: String,
    email: Option<String>,
}

#[derive(Clone)]
pub struct OnboardingService {
    registry: Arc<dyn ProviderRegistry>,
    vendor: VerificationClient,
    trust: VerificationStateMachine,
    audit: AuditLogger,
}

impl OnboardingService {
    pub fn new(
        registry: Arc<dyn ProviderRegistry>,
        vendor: VerificationClient,
        trust: VerificationStateMachine,
        audit: AuditLogger,
    ) -> Self {
        Self {
            registry,
            vendor,
            trust,
            audit,
        }
    }

    pub fn vendor_configured(&self) -> bool {
        self.vendor.is_configured()
    }

    /// Create a provider record in the Unverified state
    pub async fn signup(&self, request: SignupRequest) -> Result<SignupOutcome> {
        let (profile, location) = request.into_profile()?;

        let possession_token = generate_possession_token();
        let to_hash = possession_token.clone();
        let possession_hash = tokio::task::spawn_blocking(move || hash_possession_token(&to_hash))
            .await
            .map_err(|e| GatewayError::Internal(format!("hashing task failed: {}", e)))??;

        let provider_id = self
            .registry
            .create(NewProvider {
                name: profile.name,
                category: profile.category,
                phone: profile.phone,
                email: profile.email,
                rating: INITIAL_RATING,
                jobs: 0,
                price_from: 0,
                tagline: String::new(),
                location,
                trust_state: TrustState::Unverified,
                possession_hash,
            })
            .await?;

        info!(provider_id, category = %profile.category, "Provider signed up");
        Ok(SignupOutcome {
            provider_id,
            possession_token,
        })
    }

    /// Exchange a possession token for a vendor client access token
    ///
    /// Unknown ids and wrong tokens fail identically with `Unauthorized`.
    pub async fn issue_client_token(&self, provider_id: ProviderId, possession_token: &str) -> Result<Value> {
        let stored = self.registry.get_possession_token(provider_id).await?;
        let token = possession_token.to_string();
        let matches = tokio::task::spawn_blocking(move || verify_possession_token(&token, stored.as_deref()))
            .await
            .map_err(|e| GatewayError::Internal(format!("verification task failed: {}", e)))??;

        if !matches {
            warn!(provider_id, "Possession token rejected");
            self.audit.log_possession_rejected(provider_id).await;
            return Err(GatewayError::Unauthorized("invalid provider credentials".to_string()));
        }

        let record = self
            .registry
            .get_by_id(provider_id)
            .await?
            .ok_or_else(|| GatewayError::Unauthorized("invalid provider credentials".to_string()))?;

        let identifiers = ApplicantIdentifiers {
            email: record.email.clone(),
            phone: Some(record.phone.clone()).filter(|p| !p.is_empty()),
        };

        let config = self.vendor.config();
        let response = self
            .vendor
            .request_client_token(provider_id, config.token_ttl_secs, &config.level_name, &identifiers)
            .await?;

        self.audit.log_client_token_issued(provider_id).await;

        // The vendor token is already minted; a failed write must not discard it
        if let Err(e) = self.trust.begin_verification(provider_id).await {
            warn!(provider_id, error = %e, "Client token issued but trust state not updated");
        }

        Ok(response)
    }
}
