//! In-memory stores, useful for testing and ephemeral sessions.

use async_trait::async_trait;
use chrono::Utc;
use dealdesk_core::error::{QuotaError, SourceError};
use dealdesk_core::quota::{QuotaState, QuotaStore};
use dealdesk_core::retrieval::{
    BusinessProfile, ProfileStore, RetrievedRecord, SimilarityQuery, SimilaritySearch,
};
use dealdesk_core::tenant::TenantId;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::vector::{EmbeddedRecord, vector_search};

/// A per-tenant vector index held in memory.
///
/// One instance backs one corpus (success examples, failure examples or
/// knowledge documents).
pub struct InMemoryIndex {
    name: String,
    records: Arc<RwLock<HashMap<TenantId, Vec<EmbeddedRecord>>>>,
}

impl InMemoryIndex {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            records: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Add a record to `tenant`'s corpus. An empty id is replaced with a UUID.
    pub async fn insert(
        &self,
        tenant: &TenantId,
        mut record: RetrievedRecord,
        embedding: Vec<f32>,
    ) -> String {
        if record.id.is_empty() {
            record.id = Uuid::new_v4().to_string();
        }
        let id = record.id.clone();
        self.records
            .write()
            .await
            .entry(tenant.clone())
            .or_default()
            .push(EmbeddedRecord::new(record, embedding));
        id
    }

    /// Number of records stored for `tenant`.
    pub async fn count(&self, tenant: &TenantId) -> usize {
        self.records
            .read()
            .await
            .get(tenant)
            .map_or(0, Vec::len)
    }
}

#[async_trait]
impl SimilaritySearch for InMemoryIndex {
    fn name(&self) -> &str {
        &self.name
    }

    async fn search(&self, query: &SimilarityQuery) -> Result<Vec<RetrievedRecord>, SourceError> {
        let records = self.records.read().await;
        let Some(corpus) = records.get(&query.tenant) else {
            return Ok(vec![]);
        };
        let results = vector_search(corpus, &query.embedding, query.limit, query.threshold);
        debug!(
            index = %self.name,
            tenant = %query.tenant,
            hits = results.len(),
            "In-memory similarity search"
        );
        Ok(results)
    }
}

/// Business profiles keyed by tenant.
#[derive(Default)]
pub struct InMemoryProfileStore {
    profiles: RwLock<HashMap<TenantId, BusinessProfile>>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn put(&self, tenant: &TenantId, profile: BusinessProfile) {
        self.profiles.write().await.insert(tenant.clone(), profile);
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn fetch(&self, tenant: &TenantId) -> Result<Option<BusinessProfile>, SourceError> {
        Ok(self.profiles.read().await.get(tenant).cloned())
    }
}

/// Quota records in a map.
///
/// Unknown tenants are an error unless the store was created with
/// [`provisioning`](Self::provisioning), in which case a fresh record with the
/// given base limit is created on first read.
#[derive(Default)]
pub struct InMemoryQuotaStore {
    records: RwLock<HashMap<TenantId, QuotaState>>,
    provision: Option<Option<f64>>,
}

impl InMemoryQuotaStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Auto-create unknown tenants with `default_limit` (`None` = unlimited).
    pub fn provisioning(default_limit: Option<f64>) -> Self {
        Self {
            records: RwLock::default(),
            provision: Some(default_limit),
        }
    }

    /// Seed or replace a tenant's record.
    pub async fn insert(&self, tenant: &TenantId, state: QuotaState) {
        self.records.write().await.insert(tenant.clone(), state);
    }

    /// Peek at the stored record without provisioning.
    pub async fn get(&self, tenant: &TenantId) -> Option<QuotaState> {
        self.records.read().await.get(tenant).cloned()
    }
}

#[async_trait]
impl QuotaStore for InMemoryQuotaStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn read(&self, tenant: &TenantId) -> Result<QuotaState, QuotaError> {
        if let Some(state) = self.records.read().await.get(tenant) {
            return Ok(state.clone());
        }
        let Some(default_limit) = self.provision else {
            return Err(QuotaError::UnknownTenant(tenant.to_string()));
        };
        let state = QuotaState::new(default_limit, Utc::now());
        self.records
            .write()
            .await
            .entry(tenant.clone())
            .or_insert_with(|| state.clone());
        Ok(state)
    }

    async fn write(&self, tenant: &TenantId, state: &QuotaState) -> Result<(), QuotaError> {
        self.records
            .write()
            .await
            .insert(tenant.clone(), state.clone());
        Ok(())
    }
}
