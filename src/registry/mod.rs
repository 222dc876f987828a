//! Provider registry
//!
//! The registry is the record store for providers ("masters"). It is consumed
//! through the [`ProviderRegistry`] trait so the matching engine and the
//! verification flow never care which backend sits underneath:
//!
//! - [`MemoryRegistry`]: dashmap-backed, used in dev mode and tests
//! - [`MongoRegistry`]: MongoDB-backed, used when `MONGODB_URI` is set
//!
//! Writers are limited to `create` and `compare_and_set_trust`. Both operate
//! on a single record atomically.

pub mod memory;
pub mod mongo;
pub mod seed;

pub use memory::MemoryRegistry;
pub use mongo::MongoRegistry;
pub use seed::{seed_samples, SEED_ORIGIN};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::geo::GeoPoint;
use crate::types::{GatewayError, Result};

/// Numeric provider identifier assigned by the registry
pub type ProviderId = u64;

/// Kind of service a provider offers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceCategory {
    Plumber,
    Electrician,
    Furniture,
    Handyman,
}

impl ServiceCategory {
    pub const ALL: [ServiceCategory; 4] = [
        ServiceCategory::Plumber,
        ServiceCategory::Electrician,
        ServiceCategory::Furniture,
        ServiceCategory::Handyman,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceCategory::Plumber => "plumber",
            ServiceCategory::Electrician => "electrician",
            ServiceCategory::Furniture => "furniture",
            ServiceCategory::Handyman => "handyman",
        }
    }
}

impl fmt::Display for ServiceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceCategory {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "plumber" => Ok(ServiceCategory::Plumber),
            "electrician" => Ok(ServiceCategory::Electrician),
            "furniture" => Ok(ServiceCategory::Furniture),
            "handyman" => Ok(ServiceCategory::Handyman),
            other => Err(GatewayError::Validation(format!(
                "unknown service category '{other}' (expected plumber, electrician, furniture or handyman)"
            ))),
        }
    }
}

/// Verification status of a provider
///
/// Only moves forward: Unverified -> PendingVerification -> Verified, with
/// Rejected as a terminal branch for a final negative review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustState {
    #[default]
    Unverified,
    PendingVerification,
    Verified,
    Rejected,
}

impl TrustState {
    pub fn is_verified(&self) -> bool {
        matches!(self, TrustState::Verified)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TrustState::Unverified => "unverified",
            TrustState::PendingVerification => "pending_verification",
            TrustState::Verified => "verified",
            TrustState::Rejected => "rejected",
        }
    }
}

impl fmt::Display for TrustState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrustState {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "unverified" => Ok(TrustState::Unverified),
            "pending_verification" => Ok(TrustState::PendingVerification),
            "verified" => Ok(TrustState::Verified),
            "rejected" => Ok(TrustState::Rejected),
            other => Err(GatewayError::Database(format!("unknown trust state '{other}'"))),
        }
    }
}

/// A stored provider, as read back from the registry
///
/// The possession-token hash is deliberately absent; it is only reachable
/// through [`ProviderRegistry::get_possession_token`].
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderRecord {
    pub id: ProviderId,
    pub name: String,
    pub category: ServiceCategory,
    pub phone: String,
    pub email: Option<String>,
    pub rating: f64,
    pub jobs: u32,
    pub price_from: u32,
    pub tagline: String,
    pub location: GeoPoint,
    pub trust_state: TrustState,
}

/// Everything needed to create a record; the registry assigns the id
#[derive(Debug, Clone)]
pub struct NewProvider {
    pub name: String,
    pub category: ServiceCategory,
    pub phone: String,
    pub email: Option<String>,
    pub rating: f64,
    pub jobs: u32,
    pub price_from: u32,
    pub tagline: String,
    pub location: GeoPoint,
    pub trust_state: TrustState,
    /// Argon2 PHC hash of the possession token
    pub possession_hash: String,
}

impl NewProvider {
    fn into_record(self, id: ProviderId) -> (ProviderRecord, String) {
        let record = ProviderRecord {
            id,
            name: self.name,
            category: self.category,
            phone: self.phone,
            email: self.email,
            rating: self.rating,
            jobs: self.jobs,
            price_from: self.price_from,
            tagline: self.tagline,
            location: self.location,
            trust_state: self.trust_state,
        };
        (record, self.possession_hash)
    }
}

/// Result of a compare-and-set on a record's trust state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CasOutcome {
    /// The expected state matched and the new state was written
    Applied,
    /// Someone else changed the record first; carries the state found
    Conflict(TrustState),
    /// No record with that id
    NotFound,
}

/// Record store for providers
#[async_trait]
pub trait ProviderRegistry: Send + Sync {
    /// Short backend name for health output
    fn backend(&self) -> &'static str;

    /// Insert a record and return its assigned id
    async fn create(&self, provider: NewProvider) -> Result<ProviderId>;

    /// All providers in a category, optionally restricted to verified ones
    async fn find_by_category(
        &self,
        category: ServiceCategory,
        verified_only: bool,
    ) -> Result<Vec<ProviderRecord>>;

    async fn get_by_id(&self, id: ProviderId) -> Result<Option<ProviderRecord>>;

    /// Stored possession-token hash for a record
    async fn get_possession_token(&self, id: ProviderId) -> Result<Option<String>>;

    /// Atomically replace the trust state if it still equals `expected`
    async fn compare_and_set_trust(
        &self,
        id: ProviderId,
        expected: TrustState,
        next: TrustState,
    ) -> Result<CasOutcome>;

    /// Number of stored records
    async fn count(&self) -> Result<u64>;
}
