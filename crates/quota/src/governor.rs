//! Quota admission checks and usage commits.
//!
//! `check` and `commit` are two separate store round-trips. Concurrent turns
//! for the same tenant can both pass `check` before either commits, so a
//! tenant may overshoot its limit by a few in-flight turns. This is a soft
//! limit: there is no lock around the read-modify-write.

use chrono::{DateTime, Utc};
use dealdesk_core::error::QuotaError;
use dealdesk_core::quota::{QuotaDecision, QuotaState, QuotaStore};
use dealdesk_core::tenant::TenantId;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Admission gate and usage recorder over a [`QuotaStore`].
pub struct QuotaGovernor {
    store: Arc<dyn QuotaStore>,
}

impl QuotaGovernor {
    pub fn new(store: Arc<dyn QuotaStore>) -> Self {
        Self { store }
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<dyn QuotaStore> {
        &self.store
    }

    /// Decide whether `tenant` may run a turn at `now`.
    ///
    /// If the stored period began in a different month, the counters are reset
    /// and persisted before the decision is made. A failed reset write is
    /// logged and the decision still uses the reset record.
    pub async fn check(
        &self,
        tenant: &TenantId,
        now: DateTime<Utc>,
    ) -> Result<QuotaDecision, QuotaError> {
        let state = self.load_current(tenant, now).await?;
        let decision = state.decision();

        if decision.allowed {
            debug!(tenant = %tenant, remaining = decision.remaining, "Quota check passed");
        } else {
            info!(
                tenant = %tenant,
                used = state.used,
                limit = state.base_limit.unwrap_or_default() + state.extra,
                "Quota exceeded"
            );
        }
        Ok(decision)
    }

    /// Record `amount` credits of usage after a successful turn.
    ///
    /// Never fails: the user already has their answer, so a bookkeeping error
    /// is logged and swallowed.
    pub async fn commit(&self, tenant: &TenantId, amount: f64) {
        if let Err(e) = self.try_commit(tenant, amount).await {
            warn!(
                tenant = %tenant,
                amount = amount,
                error = %e,
                "Quota commit failed; usage not recorded"
            );
        }
    }

    /// Like [`commit`](Self::commit) but reports the store error.
    pub async fn try_commit(
        &self,
        tenant: &TenantId,
        amount: f64,
    ) -> Result<QuotaState, QuotaError> {
        let mut state = self.store.read(tenant).await?;
        state.used += amount;
        self.store.write(tenant, &state).await?;
        debug!(tenant = %tenant, amount = amount, used = state.used, "Quota usage committed");
        Ok(state)
    }

    /// Grant extra credits for the current period.
    pub async fn grant_extra(
        &self,
        tenant: &TenantId,
        credits: f64,
        now: DateTime<Utc>,
    ) -> Result<QuotaState, QuotaError> {
        let mut state = self.load_current(tenant, now).await?;
        state.extra += credits;
        self.store.write(tenant, &state).await?;
        info!(tenant = %tenant, credits = credits, extra = state.extra, "Extra credits granted");
        Ok(state)
    }

    /// Change the monthly allowance. `None` makes the tenant unlimited.
    pub async fn set_base_limit(
        &self,
        tenant: &TenantId,
        limit: Option<f64>,
    ) -> Result<QuotaState, QuotaError> {
        let mut state = self.store.read(tenant).await?;
        state.base_limit = limit;
        self.store.write(tenant, &state).await?;
        info!(tenant = %tenant, limit = ?limit, "Base limit updated");
        Ok(state)
    }

    /// Current record with the monthly rollover applied.
    pub async fn snapshot(
        &self,
        tenant: &TenantId,
        now: DateTime<Utc>,
    ) -> Result<QuotaState, QuotaError> {
        self.load_current(tenant, now).await
    }

    async fn load_current(
        &self,
        tenant: &TenantId,
        now: DateTime<Utc>,
    ) -> Result<QuotaState, QuotaError> {
        let mut state = self.store.read(tenant).await?;
        if state.is_stale(now) {
            let previous = state.reset_at;
            state.reset(now);
            match self.store.write(tenant, &state).await {
                Ok(()) => info!(tenant = %tenant, previous = %previous, "Quota period reset"),
                Err(e) => warn!(
                    tenant = %tenant,
                    error = %e,
                    "Failed to persist quota reset; evaluating reset record anyway"
                ),
            }
        }
        Ok(state)
    }
}
