//! In-memory provider registry
//!
//! Backed by a `DashMap`; holding a shard write guard for the duration of a
//! compare-and-set makes each trust transition atomic per record.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use super::{
    CasOutcome, NewProvider, ProviderId, ProviderRecord, ProviderRegistry, ServiceCategory,
    TrustState,
};
use crate::types::Result;

struct StoredProvider {
    record: ProviderRecord,
    possession_hash: String,
}

/// Process-local registry
pub struct MemoryRegistry {
    providers: DashMap<ProviderId, StoredProvider>,
    next_id: AtomicU64,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self {
            providers: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }
}

impl Default for MemoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProviderRegistry for MemoryRegistry {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn create(&self, provider: NewProvider) -> Result<ProviderId> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (record, possession_hash) = provider.into_record(id);
        self.providers.insert(
            id,
            StoredProvider {
                record,
                possession_hash,
            },
        );
        Ok(id)
    }

    async fn find_by_category(
        &self,
        category: ServiceCategory,
        verified_only: bool,
    ) -> Result<Vec<ProviderRecord>> {
        Ok(self
            .providers
            .iter()
            .filter(|entry| {
                let r = &entry.value().record;
                r.category == category && (!verified_only || r.trust_state.is_verified())
            })
            .map(|entry| entry.value().record.clone())
            .collect())
    }

    async fn get_by_id(&self, id: ProviderId) -> Result<Option<ProviderRecord>> {
        Ok(self.providers.get(&id).map(|p| p.record.clone()))
    }

    async fn get_possession_token(&self, id: ProviderId) -> Result<Option<String>> {
        Ok(self.providers.get(&id).map(|p| p.possession_hash.clone()))
    }

    async fn compare_and_set_trust(
        &self,
        id: ProviderId,
        expected: TrustState,
        next: TrustState,
    ) -> Result<CasOutcome> {
        let Some(mut entry) = self.providers.get_mut(&id) else {
            return Ok(CasOutcome::NotFound);
        };
        let current = entry.record.trust_state;
        if current != expected {
            return Ok(CasOutcome::Conflict(current));
        }
        entry.record.trust_state = next;
        Ok(CasOutcome::Applied)
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.providers.len() as u64)
    }
}
