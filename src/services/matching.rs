//! Nearby-provider matching
//!
//! Pure read path: category filter from the registry, great-circle distance
//! to the requester, radius cut, nearest first, at most [`MAX_RESULTS`].

use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::debug;

use crate::geo::{distance_km, round_km, GeoPoint};
use crate::registry::{ProviderId, ProviderRecord, ProviderRegistry, ServiceCategory};
use crate::types::{GatewayError, Result};

/// Upper bound on returned matches
pub const MAX_RESULTS: usize = 5;

pub const DEFAULT_RADIUS_KM: f64 = 2.0;
pub const MIN_RADIUS_KM: f64 = 0.1;
pub const MAX_RADIUS_KM: f64 = 10.0;

/// One match, as rendered to requesters
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    pub id: ProviderId,
    pub name: String,
    pub phone: String,
    pub rating: f64,
    pub jobs: u32,
    pub price_from: u32,
    pub tagline: String,
    /// Full precision; rounded to two decimals only when serialized
    #[serde(serialize_with = "serialize_km")]
    pub distance_km: f64,
    pub is_verified: bool,
}

fn serialize_km<S: Serializer>(km: &f64, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_f64(round_km(*km))
}

impl MatchResult {
    fn from_record(record: ProviderRecord, distance_km: f64) -> Self {
        Self {
            id: record.id,
            is_verified: record.trust_state.is_verified(),
            name: record.name,
            phone: record.phone,
            rating: record.rating,
            jobs: record.jobs,
            price_from: record.price_from,
            tagline: record.tagline,
            distance_km,
        }
    }
}

/// Validate a requested radius
pub fn check_radius(radius_km: f64) -> Result<f64> {
    if !radius_km.is_finite() || radius_km < MIN_RADIUS_KM || radius_km > MAX_RADIUS_KM {
        return Err(GatewayError::Validation(format!(
            "radius_km must be between {} and {}",
            MIN_RADIUS_KM, MAX_RADIUS_KM
        )));
    }
    Ok(radius_km)
}

/// Rank candidates by distance from `origin`
///
/// Ties are broken by ascending id so the order is stable across calls.
pub fn rank(origin: GeoPoint, radius_km: f64, candidates: Vec<ProviderRecord>) -> Vec<MatchResult> {
    let mut matches: Vec<MatchResult> = candidates
        .into_iter()
        .filter_map(|record| {
            let d = distance_km(origin, record.location);
            (d <= radius_km).then(|| MatchResult::from_record(record, d))
        })
        .collect();

    matches.sort_by(|a, b| match a.distance_km.total_cmp(&b.distance_km) {
        Ordering::Equal => a.id.cmp(&b.id),
        other => other,
    });
    matches.truncate(MAX_RESULTS);
    matches
}

/// Matching engine over a provider registry
#[derive(Clone)]
pub struct MatchingEngine {
    registry: Arc<dyn ProviderRegistry>,
}

impl MatchingEngine {
    pub fn new(registry: Arc<dyn ProviderRegistry>) -> Self {
        Self { registry }
    }

    /// Providers of `category` within `radius_km` of `origin`, nearest first
    pub async fn find_nearby(
        &self,
        category: ServiceCategory,
        origin: GeoPoint,
        radius_km: f64,
        verified_only: bool,
    ) -> Result<Vec<MatchResult>> {
        let radius_km = check_radius(radius_km)?;
        let candidates = self.registry.find_by_category(category, verified_only).await?;
        let total = candidates.len();

        let matches = rank(origin, radius_km, candidates);
        debug!(
            category = %category,
            radius_km,
            verified_only,
            candidates = total,
            returned = matches.len(),
            "Matched providers"
        );
        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{seed_samples, MemoryRegistry, NewProvider, TrustState, SEED_ORIGIN};

    fn at(lat: f64, lng: f64) -> NewProvider {
        NewProvider {
            name: "Master".to_string(),
            category: ServiceCategory::Handyman,
            phone: "+49100000".to_string(),
            email: None,
            rating: 4.5,
            jobs: 0,
            price_from: 0,
            tagline: String::new(),
            location: GeoPoint { lat, lng },
            trust_state: TrustState::Unverified,
            possession_hash: "x".to_string(),
        }
    }

    async fn engine_with(points: &[(f64, f64)]) -> MatchingEngine {
        let registry = Arc::new(MemoryRegistry::new());
        for &(lat, lng) in points {
            registry.create(at(lat, lng)).await.unwrap();
        }
        MatchingEngine::new(registry)
    }

    #[tokio::test]
    async fn test_seeded_plumbers_nearest_first() {
        let registry = Arc::new(MemoryRegistry::new());
        seed_samples(registry.as_ref()).await.unwrap();
        let engine = MatchingEngine::new(registry);

        let matches = engine
            .find_nearby(ServiceCategory::Plumber, SEED_ORIGIN, DEFAULT_RADIUS_KM, false)
            .await
            .unwrap();

        assert_eq!(matches.len(), 2);
        assert_eq!(round_km(matches[0].distance_km), 0.09);
        assert_eq!(round_km(matches[1].distance_km), 0.16);
        assert!(matches[0].is_verified);
        assert!(!matches[1].is_verified);
    }

    #[tokio::test]
    async fn test_verified_only_filters() {
        let registry = Arc::new(MemoryRegistry::new());
        seed_samples(registry.as_ref()).await.unwrap();
        let engine = MatchingEngine::new(registry);

        let matches = engine
            .find_nearby(ServiceCategory::Plumber, SEED_ORIGIN, DEFAULT_RADIUS_KM, true)
            .await
            .unwrap();
        assert_eq!(matches.len(), 1);
        assert!(matches[0].is_verified);
    }

    #[tokio::test]
    async fn test_capped_at_five() {
        let points: Vec<(f64, f64)> = (1..=8).map(|i| (52.52 + i as f64 * 0.001, 13.405)).collect();
        let engine = engine_with(&points).await;

        let matches = engine
            .find_nearby(ServiceCategory::Handyman, GeoPoint { lat: 52.52, lng: 13.405 }, 5.0, false)
            .await
            .unwrap();
        assert_eq!(matches.len(), MAX_RESULTS);
        for pair in matches.windows(2) {
            assert!(pair[0].distance_km <= pair[1].distance_km);
        }
        assert_eq!(matches[0].id, 1);
    }

    #[tokio::test]
    async fn test_growing_radius_never_drops_matches() {
        let points = [(52.521, 13.405), (52.53, 13.405), (52.56, 13.405)];
        let engine = engine_with(&points).await;
        let origin = GeoPoint { lat: 52.52, lng: 13.405 };

        let mut previous: Vec<ProviderId> = Vec::new();
        for radius in [0.5, 2.0, 5.0, 10.0] {
            let ids: Vec<ProviderId> = engine
                .find_nearby(ServiceCategory::Handyman, origin, radius, false)
                .await
                .unwrap()
                .into_iter()
                .map(|m| m.id)
                .collect();
            assert!(previous.iter().all(|id| ids.contains(id)));
            previous = ids;
        }
        assert_eq!(previous.len(), 3);
    }

    #[tokio::test]
    async fn test_ties_ordered_by_id() {
        // Same point twice
        let engine = engine_with(&[(52.521, 13.405), (52.521, 13.405)]).await;
        let matches = engine
            .find_nearby(ServiceCategory::Handyman, GeoPoint { lat: 52.52, lng: 13.405 }, 1.0, false)
            .await
            .unwrap();
        assert_eq!(matches.iter().map(|m| m.id).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_nothing_in_range_is_empty() {
        let engine = engine_with(&[(48.137, 11.575)]).await;
        let matches = engine
            .find_nearby(ServiceCategory::Handyman, SEED_ORIGIN, MAX_RADIUS_KM, false)
            .await
            .unwrap();
        assert!(matches.is_empty());
    }

    #[tokio::test]
    async fn test_radius_out_of_range_rejected() {
        let engine = engine_with(&[]).await;
        for radius in [0.0, 0.05, 10.5, f64::NAN] {
            let err = engine
                .find_nearby(ServiceCategory::Handyman, SEED_ORIGIN, radius, false)
                .await
                .unwrap_err();
            assert!(matches!(err, GatewayError::Validation(_)));
        }
    }

    #[test]
    fn test_serialized_shape() {
        let result = MatchResult {
            id: 3,
            name: "Igor".to_string(),
            phone: "+49".to_string(),
            rating: 4.8,
            jobs: 10,
            price_from: 50,
            tagline: "Fast".to_string(),
            distance_km: 0.08896,
            is_verified: true,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["distanceKm"], 0.09);
        assert_eq!(json["priceFrom"], 50);
        assert_eq!(json["isVerified"], true);
    }
}
