//! Scatter-gather retrieval across independent data sources.
//!
//! One mandatory step (the query embedding) followed by up to five
//! concurrent retrievals joined with `tokio::join!`. The join waits for every
//! launched future; a failure in one source never cancels its siblings. Each
//! failure is captured as a [`RetrievalOutcome`], logged, recorded in
//! [`AggregatedContext::degraded_sources`] and replaced by an empty value.
//!
//! | Source              | Query             | On failure |
//! |---------------------|-------------------|------------|
//! | success examples    | k=3, sim >= 0.4   | `[]`       |
//! | failure examples    | k=2, sim >= 0.4   | `[]`       |
//! | knowledge           | k=3, sim >= 0.5   | `[]`       |
//! | business profile    | tenant lookup     | `None`     |
//! | calendar (optional) | next 7 days       | `Some([])` |

use dealdesk_config::{RetrievalConfig, SearchLimit};
use dealdesk_core::calendar::{CalendarEvent, CalendarProvider};
use dealdesk_core::error::{CalendarError, Error, Result, SourceError};
use dealdesk_core::retrieval::{
    BusinessProfile, Embedder, ProfileStore, RetrievedRecord, SimilarityQuery, SimilaritySearch,
    SourceKind,
};
use dealdesk_core::tenant::TenantId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// The collaborators the aggregator fans out to.
#[derive(Clone)]
pub struct RetrievalSources {
    pub embedder: Arc<dyn Embedder>,
    pub success_examples: Arc<dyn SimilaritySearch>,
    pub failure_examples: Arc<dyn SimilaritySearch>,
    pub knowledge: Arc<dyn SimilaritySearch>,
    pub profiles: Arc<dyn ProfileStore>,
    /// `None` when no calendar integration exists; treated as not connected.
    pub calendar: Option<Arc<dyn CalendarProvider>>,
}

/// Why a source produced nothing.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SourceFailure {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Calendar(#[from] CalendarError),
}

/// The settled result of one fan-out task.
#[derive(Debug)]
pub struct RetrievalOutcome<T> {
    pub source: SourceKind,
    pub result: std::result::Result<T, SourceFailure>,
}

impl<T> RetrievalOutcome<T> {
    pub fn new(source: SourceKind, result: std::result::Result<T, impl Into<SourceFailure>>) -> Self {
        Self {
            source,
            result: result.map_err(Into::into),
        }
    }

    pub fn is_fulfilled(&self) -> bool {
        self.result.is_ok()
    }

    /// Take the value, or log the failure, record it and return `None`.
    fn settle(self, tenant: &TenantId, degraded: &mut Vec<DegradedSource>) -> Option<T> {
        match self.result {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(
                    source = %self.source,
                    tenant = %tenant,
                    error = %e,
                    "Retrieval source failed; continuing without it"
                );
                degraded.push(DegradedSource {
                    source: self.source,
                    reason: e.to_string(),
                });
                None
            }
        }
    }
}

/// A source that failed during this request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DegradedSource {
    pub source: SourceKind,
    pub reason: String,
}

/// Everything the fan-out gathered for one request.
///
/// `calendar_events` is `None` when the calendar was never asked for and
/// `Some` (possibly empty) when it was.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AggregatedContext {
    pub success_examples: Vec<RetrievedRecord>,
    pub failure_examples: Vec<RetrievedRecord>,
    pub knowledge_docs: Vec<RetrievedRecord>,
    pub business_profile: Option<BusinessProfile>,
    pub calendar_events: Option<Vec<CalendarEvent>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub degraded_sources: Vec<DegradedSource>,
}

impl AggregatedContext {
    pub fn is_degraded(&self, source: SourceKind) -> bool {
        self.degraded_sources.iter().any(|d| d.source == source)
    }

    /// Calendar retrieval was launched for this request.
    pub fn calendar_attempted(&self) -> bool {
        self.calendar_events.is_some()
    }

    /// Calendar retrieval was launched and succeeded.
    pub fn calendar_available(&self) -> bool {
        self.calendar_attempted() && !self.is_degraded(SourceKind::Calendar)
    }
}

/// Runs the scatter-gather for one query.
pub struct SourceAggregator {
    sources: RetrievalSources,
    settings: RetrievalConfig,
}

impl SourceAggregator {
    pub fn new(sources: RetrievalSources, settings: RetrievalConfig) -> Self {
        Self { sources, settings }
    }

    pub fn settings(&self) -> &RetrievalConfig {
        &self.settings
    }

    /// Embed `query`, then retrieve from every source concurrently.
    ///
    /// Only an embedding failure is returned as an error. Calendar retrieval
    /// is launched only when `needs_calendar` is true.
    pub async fn fan_out(
        &self,
        query: &str,
        tenant: &TenantId,
        user_id: &str,
        needs_calendar: bool,
    ) -> Result<AggregatedContext> {
        let embedding = self.sources.embedder.embed(query).await.map_err(|e| {
            warn!(tenant = %tenant, error = %e, "Query embedding failed");
            Error::EmbeddingGenerationFailed(e)
        })?;

        let success_query = self.query(&embedding, tenant, self.settings.success_examples);
        let failure_query = self.query(&embedding, tenant, self.settings.failure_examples);
        let knowledge_query = self.query(&embedding, tenant, self.settings.knowledge);

        let (success, failure, knowledge, profile, calendar) = tokio::join!(
            async {
                RetrievalOutcome::new(
                    SourceKind::SuccessExamples,
                    self.sources.success_examples.search(&success_query).await,
                )
            },
            async {
                RetrievalOutcome::new(
                    SourceKind::FailureExamples,
                    self.sources.failure_examples.search(&failure_query).await,
                )
            },
            async {
                RetrievalOutcome::new(
                    SourceKind::Knowledge,
                    self.sources.knowledge.search(&knowledge_query).await,
                )
            },
            async {
                RetrievalOutcome::new(
                    SourceKind::BusinessProfile,
                    self.sources.profiles.fetch(tenant).await,
                )
            },
            async {
                if needs_calendar {
                    Some(RetrievalOutcome::new(
                        SourceKind::Calendar,
                        self.fetch_calendar(user_id).await,
                    ))
                } else {
                    None
                }
            },
        );

        let mut degraded = Vec::new();
        let context = AggregatedContext {
            success_examples: success.settle(tenant, &mut degraded).unwrap_or_default(),
            failure_examples: failure.settle(tenant, &mut degraded).unwrap_or_default(),
            knowledge_docs: knowledge.settle(tenant, &mut degraded).unwrap_or_default(),
            business_profile: profile.settle(tenant, &mut degraded).flatten(),
            calendar_events: calendar
                .map(|outcome| outcome.settle(tenant, &mut degraded).unwrap_or_default()),
            degraded_sources: degraded,
        };

        debug!(
            tenant = %tenant,
            success = context.success_examples.len(),
            failure = context.failure_examples.len(),
            knowledge = context.knowledge_docs.len(),
            profile = context.business_profile.is_some(),
            calendar = ?context.calendar_events.as_ref().map(Vec::len),
            degraded = context.degraded_sources.len(),
            "Fan-out complete"
        );

        Ok(context)
    }

    fn query(&self, embedding: &[f32], tenant: &TenantId, limit: SearchLimit) -> SimilarityQuery {
        SimilarityQuery {
            embedding: embedding.to_vec(),
            tenant: tenant.clone(),
            threshold: limit.threshold,
            limit: limit.limit,
        }
    }

    async fn fetch_calendar(
        &self,
        user_id: &str,
    ) -> std::result::Result<Vec<CalendarEvent>, CalendarError> {
        match &self.sources.calendar {
            Some(calendar) => {
                calendar
                    .fetch_events(user_id, self.settings.calendar_days_ahead)
                    .await
            }
            None => Err(CalendarError::NotConnected(user_id.to_string())),
        }
    }
}
