//! One assistant turn, end to end.
//!
//! ```text
//! classify intent → quota check (gate) → fan-out → availability → compose
//!     → [Responder] → quota commit
//! ```
//!
//! The quota gate runs before any retrieval. Usage is committed only after
//! the responder produced a reply; a failed reply costs nothing.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use dealdesk_availability::{AvailabilityEngine, BusinessHours};
use dealdesk_config::{AppConfig, AvailabilityConfig, ConfigError};
use dealdesk_core::error::{Error, Result};
use dealdesk_core::message::Message;
use dealdesk_core::tenant::TenantId;
use dealdesk_quota::QuotaGovernor;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::context::aggregator::{RetrievalSources, SourceAggregator};
use crate::context::assembler::{ContextAssembler, ContextPayload};
use crate::context::intent::IntentClassifier;

/// Inputs for one turn.
#[derive(Debug, Clone)]
pub struct TurnRequest {
    pub tenant: TenantId,
    /// The seller whose calendar is consulted.
    pub user_id: String,
    /// The current user message.
    pub message: String,
    /// Earlier messages, oldest first.
    pub recent: Vec<Message>,
    /// Wall-clock time in the seller's timezone.
    pub now: DateTime<FixedOffset>,
}

impl TurnRequest {
    pub fn new(
        tenant: impl Into<TenantId>,
        user_id: impl Into<String>,
        message: impl Into<String>,
        now: DateTime<FixedOffset>,
    ) -> Self {
        Self {
            tenant: tenant.into(),
            user_id: user_id.into(),
            message: message.into(),
            recent: Vec::new(),
            now,
        }
    }

    pub fn with_recent(mut self, recent: Vec<Message>) -> Self {
        self.recent = recent;
        self
    }
}

/// The external language-model call.
#[async_trait]
pub trait Responder: Send + Sync {
    async fn respond(
        &self,
        request: &TurnRequest,
        context: &ContextPayload,
    ) -> std::result::Result<String, Box<dyn std::error::Error + Send + Sync>>;
}

/// Result of [`TurnPipeline::prepare`].
#[derive(Debug, Clone)]
pub struct PreparedTurn {
    pub needs_calendar: bool,
    pub payload: ContextPayload,
}

/// Result of [`TurnPipeline::run`].
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub reply: String,
    pub payload: ContextPayload,
    pub credits_charged: f64,
}

pub struct TurnPipeline {
    classifier: IntentClassifier,
    governor: Arc<QuotaGovernor>,
    aggregator: SourceAggregator,
    availability: AvailabilityEngine,
    assembler: ContextAssembler,
    credits_per_reply: f64,
}

impl TurnPipeline {
    pub fn new(
        classifier: IntentClassifier,
        governor: Arc<QuotaGovernor>,
        aggregator: SourceAggregator,
        availability: AvailabilityEngine,
        assembler: ContextAssembler,
        credits_per_reply: f64,
    ) -> Self {
        Self {
            classifier,
            governor,
            aggregator,
            availability,
            assembler,
            credits_per_reply,
        }
    }

    /// Build a pipeline from configuration and injected collaborators.
    pub fn from_config(
        config: &AppConfig,
        sources: RetrievalSources,
        governor: Arc<QuotaGovernor>,
    ) -> std::result::Result<Self, ConfigError> {
        Ok(Self::new(
            IntentClassifier::from_config(&config.intent),
            governor,
            SourceAggregator::new(sources, config.retrieval.clone()),
            AvailabilityEngine::new(business_hours(&config.availability)?),
            ContextAssembler::default(),
            config.quota.credits_per_reply,
        ))
    }

    pub fn governor(&self) -> &Arc<QuotaGovernor> {
        &self.governor
    }

    pub fn assembler(&self) -> &ContextAssembler {
        &self.assembler
    }

    /// Everything up to, not including, the model call.
    pub async fn prepare(&self, request: &TurnRequest) -> Result<PreparedTurn> {
        let tenant = &request.tenant;
        let needs_calendar = self
            .classifier
            .needs_calendar(&request.message, &request.recent);

        let decision = self
            .governor
            .check(tenant, request.now.with_timezone(&Utc))
            .await
            .map_err(|e| {
                warn!(tenant = %tenant, error = %e, "Quota record unavailable");
                Error::QuotaUnavailable(e)
            })?;
        if !decision.allowed {
            return Err(Error::QuotaExceeded {
                tenant: tenant.to_string(),
                remaining: decision.remaining,
            });
        }

        let context = self
            .aggregator
            .fan_out(&request.message, tenant, &request.user_id, needs_calendar)
            .await?;

        let availability = match &context.calendar_events {
            Some(events) if context.calendar_available() => {
                Some(self.availability.report(events, &request.now))
            }
            _ => None,
        };

        let payload = self
            .assembler
            .compose(tenant, decision, context, availability)?;

        debug!(
            tenant = %tenant,
            needs_calendar = needs_calendar,
            degraded = payload.degraded_sources.len(),
            "Turn prepared"
        );
        Ok(PreparedTurn {
            needs_calendar,
            payload,
        })
    }

    /// Prepare, call the responder, and charge the turn if it succeeded.
    pub async fn run(
        &self,
        request: &TurnRequest,
        responder: &dyn Responder,
    ) -> Result<TurnOutcome> {
        let prepared = self.prepare(request).await?;

        let reply = responder
            .respond(request, &prepared.payload)
            .await
            .map_err(|e| {
                warn!(tenant = %request.tenant, error = %e, "Responder failed; turn not charged");
                Error::Responder(e.to_string())
            })?;

        self.governor
            .commit(&request.tenant, self.credits_per_reply)
            .await;
        info!(
            tenant = %request.tenant,
            credits = self.credits_per_reply,
            "Turn completed"
        );

        Ok(TurnOutcome {
            reply,
            payload: prepared.payload,
            credits_charged: self.credits_per_reply,
        })
    }
}

/// Convert the `[availability]` config section into engine bounds.
pub fn business_hours(
    config: &AvailabilityConfig,
) -> std::result::Result<BusinessHours, ConfigError> {
    let hours = BusinessHours {
        day_start: config.day_start_minute()?,
        day_end: config.day_end_minute()?,
        granularity: config.granularity_minutes,
        min_slot: config.min_slot_minutes,
        default_event_minutes: config.default_event_minutes,
        window_days: config.window_days,
    };
    if !hours.is_valid() {
        return Err(ConfigError::ValidationError(
            "availability section does not describe a valid business day".into(),
        ));
    }
    Ok(hours)
}
