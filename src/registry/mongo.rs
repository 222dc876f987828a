//! MongoDB-backed provider registry

use async_trait::async_trait;
use bson::doc;
use mongodb::{options::ReturnDocument, Collection};
use tracing::debug;

use super::{
    CasOutcome, NewProvider, ProviderId, ProviderRecord, ProviderRegistry, ServiceCategory,
    TrustState,
};
use crate::db::schemas::{
    CounterDoc, ProviderDoc, COUNTER_COLLECTION, PROVIDER_COLLECTION, PROVIDER_SEQUENCE,
};
use crate::db::{MongoClient, MongoCollection};
use crate::types::{GatewayError, Result};

/// Registry persisted in the `masters` collection
pub struct MongoRegistry {
    providers: MongoCollection<ProviderDoc>,
    counters: Collection<CounterDoc>,
}

impl MongoRegistry {
    pub async fn new(client: &MongoClient) -> Result<Self> {
        let providers = client.collection::<ProviderDoc>(PROVIDER_COLLECTION).await?;
        let counters = client.raw_collection::<CounterDoc>(COUNTER_COLLECTION);
        Ok(Self {
            providers,
            counters,
        })
    }

    /// Atomically bump the provider sequence and return the new value
    async fn next_id(&self) -> Result<ProviderId> {
        let counter = self
            .counters
            .find_one_and_update(
                doc! { "_id": PROVIDER_SEQUENCE },
                doc! { "$inc": { "seq": 1_i64 } },
            )
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await?
            .ok_or_else(|| GatewayError::Database("id sequence upsert returned nothing".into()))?;

        ProviderId::try_from(counter.seq)
            .map_err(|_| GatewayError::Database(format!("invalid sequence value {}", counter.seq)))
    }
}

fn id_filter(id: ProviderId) -> Result<bson::Document> {
    let id = i64::try_from(id)
        .map_err(|_| GatewayError::Validation(format!("provider id {id} out of range")))?;
    Ok(doc! { "provider_id": id })
}

#[async_trait]
impl ProviderRegistry for MongoRegistry {
    fn backend(&self) -> &'static str {
        "mongodb"
    }

    async fn create(&self, provider: NewProvider) -> Result<ProviderId> {
        let id = self.next_id().await?;
        let doc = ProviderDoc::from_new(id, provider)?;
        self.providers.insert_one(doc).await?;
        debug!(provider_id = id, "Provider inserted");
        Ok(id)
    }

    async fn find_by_category(
        &self,
        category: ServiceCategory,
        verified_only: bool,
    ) -> Result<Vec<ProviderRecord>> {
        let mut filter = doc! { "category": category.as_str() };
        if verified_only {
            filter.insert("trust_state", TrustState::Verified.as_str());
        }

        let docs = self.providers.find_many(filter).await?;
        Ok(docs.into_iter().map(ProviderDoc::into_record).collect())
    }

    async fn get_by_id(&self, id: ProviderId) -> Result<Option<ProviderRecord>> {
        let Ok(filter) = id_filter(id) else {
            return Ok(None);
        };
        Ok(self
            .providers
            .find_one(filter)
            .await?
            .map(ProviderDoc::into_record))
    }

    async fn get_possession_token(&self, id: ProviderId) -> Result<Option<String>> {
        let Ok(filter) = id_filter(id) else {
            return Ok(None);
        };
        Ok(self
            .providers
            .find_one(filter)
            .await?
            .map(|doc| doc.possession_hash))
    }

    async fn compare_and_set_trust(
        &self,
        id: ProviderId,
        expected: TrustState,
        next: TrustState,
    ) -> Result<CasOutcome> {
        let Ok(mut filter) = id_filter(id) else {
            return Ok(CasOutcome::NotFound);
        };
        filter.insert("trust_state", expected.as_str());

        let result = self
            .providers
            .set_fields(filter, doc! { "trust_state": next.as_str() })
            .await?;

        if result.matched_count == 1 {
            return Ok(CasOutcome::Applied);
        }

        // Filter missed: either the record is gone or its state moved on
        match self.get_by_id(id).await? {
            Some(record) => Ok(CasOutcome::Conflict(record.trust_state)),
            None => Ok(CasOutcome::NotFound),
        }
    }

    async fn count(&self) -> Result<u64> {
        self.providers.count(doc! {}).await
    }
}
