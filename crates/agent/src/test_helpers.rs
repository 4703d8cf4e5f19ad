//! Fake collaborators shared by the agent tests.

use async_trait::async_trait;
use dealdesk_core::calendar::{CalendarEvent, CalendarProvider};
use dealdesk_core::error::{CalendarError, SourceError};
use dealdesk_core::retrieval::{
    BusinessProfile, Embedder, ProfileStore, RetrievedRecord, SimilarityQuery, SimilaritySearch,
};
use dealdesk_core::tenant::TenantId;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::context::aggregator::RetrievalSources;

pub const FIXED_EMBEDDING: [f32; 3] = [0.1, 0.2, 0.3];

pub fn record(id: &str, similarity: f32) -> RetrievedRecord {
    RetrievedRecord::new(id, format!("content of {id}"), similarity)
}

pub fn acme_profile() -> BusinessProfile {
    BusinessProfile {
        company_name: "Acme".into(),
        description: "Industrial anvils".into(),
        products: vec!["Anvil Pro".into()],
        details: Default::default(),
    }
}

pub struct FixedEmbedder;

#[async_trait]
impl Embedder for FixedEmbedder {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>, SourceError> {
        Ok(FIXED_EMBEDDING.to_vec())
    }
}

pub struct FailingEmbedder;

#[async_trait]
impl Embedder for FailingEmbedder {
    fn name(&self) -> &str {
        "failing"
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>, SourceError> {
        Err(SourceError::RateLimited {
            retry_after_secs: 5,
        })
    }
}

/// Similarity search with a canned result, call counting and optional delay.
pub struct ScriptedSearch {
    name: String,
    result: Result<Vec<RetrievedRecord>, SourceError>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    last_query: Mutex<Option<SimilarityQuery>>,
}

impl ScriptedSearch {
    pub fn returning(name: &str, records: Vec<RetrievedRecord>) -> Self {
        Self {
            name: name.into(),
            result: Ok(records),
            delay: None,
            calls: AtomicUsize::new(0),
            last_query: Mutex::new(None),
        }
    }

    pub fn failing(name: &str, error: SourceError) -> Self {
        Self {
            result: Err(error),
            ..Self::returning(name, vec![])
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_query(&self) -> Option<SimilarityQuery> {
        self.last_query.lock().unwrap().clone()
    }
}

#[async_trait]
impl SimilaritySearch for ScriptedSearch {
    fn name(&self) -> &str {
        &self.name
    }

    async fn search(&self, query: &SimilarityQuery) -> Result<Vec<RetrievedRecord>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_query.lock().unwrap() = Some(query.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.result.clone()
    }
}

pub struct FixedProfiles {
    result: Result<Option<BusinessProfile>, SourceError>,
}

impl FixedProfiles {
    pub fn new(profile: Option<BusinessProfile>) -> Self {
        Self {
            result: Ok(profile),
        }
    }

    pub fn failing(error: SourceError) -> Self {
        Self { result: Err(error) }
    }
}

#[async_trait]
impl ProfileStore for FixedProfiles {
    async fn fetch(&self, _tenant: &TenantId) -> Result<Option<BusinessProfile>, SourceError> {
        self.result.clone()
    }
}

/// Calendar that records how often and with what window it was called.
pub struct CountingCalendar {
    result: Result<Vec<CalendarEvent>, CalendarError>,
    calls: AtomicUsize,
    last_days_ahead: Mutex<Option<u32>>,
}

impl CountingCalendar {
    pub fn with_events(events: Vec<CalendarEvent>) -> Self {
        Self {
            result: Ok(events),
            calls: AtomicUsize::new(0),
            last_days_ahead: Mutex::new(None),
        }
    }

    pub fn failing(error: CalendarError) -> Self {
        Self {
            result: Err(error),
            ..Self::with_events(vec![])
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_days_ahead(&self) -> Option<u32> {
        *self.last_days_ahead.lock().unwrap()
    }
}

#[async_trait]
impl CalendarProvider for CountingCalendar {
    fn name(&self) -> &str {
        "counting"
    }

    async fn fetch_events(
        &self,
        _user_id: &str,
        days_ahead: u32,
    ) -> Result<Vec<CalendarEvent>, CalendarError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_days_ahead.lock().unwrap() = Some(days_ahead);
        self.result.clone()
    }
}

/// One healthy collaborator per source; replace fields to inject failures.
pub struct Fixture {
    pub embedder: Arc<dyn Embedder>,
    pub success: Arc<ScriptedSearch>,
    pub failure: Arc<ScriptedSearch>,
    pub knowledge: Arc<ScriptedSearch>,
    pub profiles: Arc<dyn ProfileStore>,
    pub calendar: Arc<CountingCalendar>,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            embedder: Arc::new(FixedEmbedder),
            success: Arc::new(ScriptedSearch::returning(
                "success_examples",
                vec![record("win-1", 0.81)],
            )),
            failure: Arc::new(ScriptedSearch::returning(
                "failure_examples",
                vec![record("loss-1", 0.55)],
            )),
            knowledge: Arc::new(ScriptedSearch::returning(
                "knowledge",
                vec![record("doc-1", 0.72)],
            )),
            profiles: Arc::new(FixedProfiles::new(Some(acme_profile()))),
            calendar: Arc::new(CountingCalendar::with_events(vec![])),
        }
    }

    pub fn sources(&self) -> RetrievalSources {
        RetrievalSources {
            embedder: self.embedder.clone(),
            success_examples: self.success.clone(),
            failure_examples: self.failure.clone(),
            knowledge: self.knowledge.clone(),
            profiles: self.profiles.clone(),
            calendar: Some(self.calendar.clone()),
        }
    }
}
