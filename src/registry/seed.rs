//! Sample providers for development and demos
//!
//! Two providers per category placed around central Berlin. The plumbers sit
//! due north of [`SEED_ORIGIN`] at roughly 0.09 km and 0.16 km.

use tracing::info;

use super::{NewProvider, ProviderRegistry, ServiceCategory, TrustState};
use crate::auth::{generate_possession_token, hash_possession_token};
use crate::geo::GeoPoint;
use crate::types::Result;

/// Reference point the sample set is laid out around
pub const SEED_ORIGIN: GeoPoint = GeoPoint {
    lat: 52.5200,
    lng: 13.4050,
};

struct Sample {
    name: &'static str,
    category: ServiceCategory,
    rating: f64,
    jobs: u32,
    price_from: u32,
    tagline: &'static str,
    phone: &'static str,
    offset: (f64, f64),
    verified: bool,
}

const SAMPLES: [Sample; 8] = [
    Sample {
        name: "Igor, plumber",
        category: ServiceCategory::Plumber,
        rating: 4.8,
        jobs: 132,
        price_from: 50,
        tagline: "Fast, no upselling",
        phone: "+491234567890",
        offset: (0.0008, 0.0),
        verified: true,
    },
    Sample {
        name: "Marina, plumber",
        category: ServiceCategory::Plumber,
        rating: 4.7,
        jobs: 64,
        price_from: 45,
        tagline: "Clean and careful",
        phone: "+491111222333",
        offset: (0.0014, 0.0),
        verified: false,
    },
    Sample {
        name: "Alina, electrician",
        category: ServiceCategory::Electrician,
        rating: 4.9,
        jobs: 98,
        price_from: 60,
        tagline: "Work guaranteed",
        phone: "+492222333444",
        offset: (0.004, 0.002),
        verified: true,
    },
    Sample {
        name: "Pavel, electrician",
        category: ServiceCategory::Electrician,
        rating: 4.6,
        jobs: 51,
        price_from: 55,
        tagline: "Sockets and lighting",
        phone: "+493333444555",
        offset: (-0.006, 0.001),
        verified: false,
    },
    Sample {
        name: "Denis, furniture assembly",
        category: ServiceCategory::Furniture,
        rating: 4.8,
        jobs: 88,
        price_from: 45,
        tagline: "Quick and level",
        phone: "+495555666777",
        offset: (0.002, -0.007),
        verified: true,
    },
    Sample {
        name: "Sergey, furniture assembly",
        category: ServiceCategory::Furniture,
        rating: 4.7,
        jobs: 210,
        price_from: 40,
        tagline: "Flat-pack specialist",
        phone: "+494444555666",
        offset: (-0.003, -0.004),
        verified: false,
    },
    Sample {
        name: "Kirill, handyman",
        category: ServiceCategory::Handyman,
        rating: 4.6,
        jobs: 175,
        price_from: 35,
        tagline: "Small repairs",
        phone: "+496666777888",
        offset: (0.004, 0.002),
        verified: true,
    },
    Sample {
        name: "Oleg, handyman",
        category: ServiceCategory::Handyman,
        rating: 4.5,
        jobs: 73,
        price_from: 30,
        tagline: "Household tasks",
        phone: "+497777888999",
        offset: (-0.006, 0.001),
        verified: false,
    },
];

/// Insert the sample set when the registry is empty.
///
/// Returns the number of records created (0 when data already exists).
pub async fn seed_samples(registry: &dyn ProviderRegistry) -> Result<usize> {
    if registry.count().await? > 0 {
        info!("Registry already populated, skipping sample seed");
        return Ok(0);
    }

    for sample in &SAMPLES {
        // Nobody holds the token for a sample record
        let possession_hash = hash_possession_token(&generate_possession_token())?;
        let trust_state = if sample.verified {
            TrustState::Verified
        } else {
            TrustState::Unverified
        };

        registry
            .create(NewProvider {
                name: sample.name.to_string(),
                category: sample.category,
                phone: sample.phone.to_string(),
                email: None,
                rating: sample.rating,
                jobs: sample.jobs,
                price_from: sample.price_from,
                tagline: sample.tagline.to_string(),
                location: GeoPoint {
                    lat: SEED_ORIGIN.lat + sample.offset.0,
                    lng: SEED_ORIGIN.lng + sample.offset.1,
                },
                trust_state,
                possession_hash,
            })
            .await?;
    }

    info!("Seeded {} sample providers", SAMPLES.len());
    Ok(SAMPLES.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::MemoryRegistry;

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let registry = MemoryRegistry::new();
        assert_eq!(seed_samples(&registry).await.unwrap(), 8);
        assert_eq!(seed_samples(&registry).await.unwrap(), 0);
        assert_eq!(registry.count().await.unwrap(), 8);
    }

    #[tokio::test]
    async fn test_every_category_has_samples() {
        let registry = MemoryRegistry::new();
        seed_samples(&registry).await.unwrap();
        for category in ServiceCategory::ALL {
            let found = registry.find_by_category(category, false).await.unwrap();
            assert_eq!(found.len(), 2, "{category}");
            let verified = registry.find_by_category(category, true).await.unwrap();
            assert_eq!(verified.len(), 1, "{category}");
        }
    }
}
