//! Quota record and store trait: the tenant's metered monthly allowance.
//!
//! A tenant has an optional base limit (None = unlimited), purchased extra
//! credits, and a fractional usage counter that rolls over when the calendar
//! month changes.

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::QuotaError;
use crate::tenant::TenantId;

/// Persisted usage record for one tenant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotaState {
    /// Monthly allowance. `None` means unlimited.
    pub base_limit: Option<f64>,

    /// Credits consumed in the current period (fractional).
    #[serde(default)]
    pub used: f64,

    /// Extra credits granted on top of the base limit for this period.
    #[serde(default)]
    pub extra: f64,

    /// Start of the current period.
    pub reset_at: DateTime<Utc>,
}

impl QuotaState {
    /// A fresh record with nothing used.
    pub fn new(base_limit: Option<f64>, reset_at: DateTime<Utc>) -> Self {
        Self {
            base_limit,
            used: 0.0,
            extra: 0.0,
            reset_at,
        }
    }

    /// An unlimited record.
    pub fn unlimited(reset_at: DateTime<Utc>) -> Self {
        Self::new(None, reset_at)
    }

    /// True when `now` falls in a different (year, month) than `reset_at`.
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        (self.reset_at.year(), self.reset_at.month()) != (now.year(), now.month())
    }

    /// Start a new period at `now`.
    pub fn reset(&mut self, now: DateTime<Utc>) {
        self.used = 0.0;
        self.extra = 0.0;
        self.reset_at = now;
    }

    /// Credits left in the period; `f64::INFINITY` when unlimited.
    pub fn remaining(&self) -> f64 {
        match self.base_limit {
            Some(limit) => limit + self.extra - self.used,
            None => f64::INFINITY,
        }
    }

    /// Evaluate admission against the current record.
    pub fn decision(&self) -> QuotaDecision {
        let remaining = self.remaining();
        QuotaDecision {
            allowed: remaining > 0.0,
            remaining,
        }
    }
}

/// The admission gate's verdict.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuotaDecision {
    pub allowed: bool,
    /// Remaining credits. `f64::INFINITY` for unlimited tenants.
    pub remaining: f64,
}

impl QuotaDecision {
    pub fn is_unlimited(&self) -> bool {
        self.remaining.is_infinite()
    }
}

/// Persistence for quota records.
///
/// Implementations: SQLite, in-memory (for testing).
#[async_trait]
pub trait QuotaStore: Send + Sync {
    /// The store name (e.g., "sqlite", "in_memory").
    fn name(&self) -> &str;

    /// Load the tenant's record.
    async fn read(&self, tenant: &TenantId) -> std::result::Result<QuotaState, QuotaError>;

    /// Replace the tenant's record.
    async fn write(
        &self,
        tenant: &TenantId,
        state: &QuotaState,
    ) -> std::result::Result<(), QuotaError>;
}
