//! Provider document schema

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;
use crate::geo::GeoPoint;
use crate::registry::{NewProvider, ProviderId, ProviderRecord, ServiceCategory, TrustState};
use crate::types::GatewayError;

/// Collection name for providers
pub const PROVIDER_COLLECTION: &str = "masters";

/// Provider document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ProviderDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    /// Registry-assigned numeric id (BSON has no unsigned integers)
    pub provider_id: i64,

    pub name: String,
    pub category: ServiceCategory,
    pub phone: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    pub rating: f64,
    pub jobs: i64,
    pub price_from: i64,

    #[serde(default)]
    pub tagline: String,

    pub location: GeoPoint,

    #[serde(default)]
    pub trust_state: TrustState,

    /// Argon2 PHC hash of the possession token
    pub possession_hash: String,
}

impl ProviderDoc {
    pub fn from_new(id: ProviderId, provider: NewProvider) -> Result<Self, GatewayError> {
        let provider_id = i64::try_from(id)
            .map_err(|_| GatewayError::Database(format!("provider id {id} overflows i64")))?;

        Ok(Self {
            _id: None,
            metadata: Metadata::default(),
            provider_id,
            name: provider.name,
            category: provider.category,
            phone: provider.phone,
            email: provider.email,
            rating: provider.rating,
            jobs: i64::from(provider.jobs),
            price_from: i64::from(provider.price_from),
            tagline: provider.tagline,
            location: provider.location,
            trust_state: provider.trust_state,
            possession_hash: provider.possession_hash,
        })
    }

    pub fn into_record(self) -> ProviderRecord {
        ProviderRecord {
            id: self.provider_id.max(0) as ProviderId,
            name: self.name,
            category: self.category,
            phone: self.phone,
            email: self.email,
            rating: self.rating,
            jobs: self.jobs.clamp(0, i64::from(u32::MAX)) as u32,
            price_from: self.price_from.clamp(0, i64::from(u32::MAX)) as u32,
            tagline: self.tagline,
            location: self.location,
            trust_state: self.trust_state,
        }
    }
}

impl IntoIndexes for ProviderDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "provider_id": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("provider_id_unique".to_string())
                        .build(),
                ),
            ),
            // Matching queries filter on both
            (
                doc! { "category": 1, "trust_state": 1 },
                Some(
                    IndexOptions::builder()
                        .name("category_trust_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for ProviderDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
