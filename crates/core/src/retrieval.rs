//! Retrieval collaborators: embeddings, similarity search, business profile.
//!
//! The aggregator talks to every data source through these traits. Each
//! source can fail independently; only the embedder is mandatory.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SourceError;
use crate::tenant::TenantId;

/// Which fan-out task produced an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    SuccessExamples,
    FailureExamples,
    Knowledge,
    BusinessProfile,
    Calendar,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SuccessExamples => write!(f, "success_examples"),
            Self::FailureExamples => write!(f, "failure_examples"),
            Self::Knowledge => write!(f, "knowledge"),
            Self::BusinessProfile => write!(f, "business_profile"),
            Self::Calendar => write!(f, "calendar"),
        }
    }
}

/// A record returned by a similarity search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedRecord {
    pub id: String,

    /// The text shown to the prompt builder.
    pub content: String,

    /// Cosine similarity to the query (0.0–1.0).
    #[serde(default)]
    pub similarity: f32,

    /// Source-specific fields (outcome notes, document title, etc.).
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl RetrievedRecord {
    pub fn new(id: impl Into<String>, content: impl Into<String>, similarity: f32) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            similarity,
            metadata: serde_json::Map::new(),
        }
    }
}

/// A similarity query against one tenant's corpus.
#[derive(Debug, Clone)]
pub struct SimilarityQuery {
    pub embedding: Vec<f32>,
    pub tenant: TenantId,
    /// Minimum similarity for a record to be returned.
    pub threshold: f32,
    /// Maximum number of records.
    pub limit: usize,
}

/// The tenant's business profile (company description, offering, pitch).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessProfile {
    pub company_name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub products: Vec<String>,

    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub details: serde_json::Map<String, serde_json::Value>,
}

/// Generates query embeddings.
#[async_trait]
pub trait Embedder: Send + Sync {
    fn name(&self) -> &str;

    async fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, SourceError>;
}

/// Vector similarity search over one corpus (examples, knowledge, ...).
#[async_trait]
pub trait SimilaritySearch: Send + Sync {
    fn name(&self) -> &str;

    async fn search(
        &self,
        query: &SimilarityQuery,
    ) -> std::result::Result<Vec<RetrievedRecord>, SourceError>;
}

/// Single-record business-profile lookup.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn fetch(
        &self,
        tenant: &TenantId,
    ) -> std::result::Result<Option<BusinessProfile>, SourceError>;
}
