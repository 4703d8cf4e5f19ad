//! SQLite quota store.
//!
//! One table, `tenant_quotas`, one row per tenant:
//!
//! | column       | type          | notes                      |
//! |--------------|---------------|----------------------------|
//! | `tenant`     | TEXT PK       |                            |
//! | `base_limit` | REAL NULL     | NULL = unlimited           |
//! | `used`       | REAL          | fractional credits         |
//! | `extra`      | REAL          | granted for this period    |
//! | `reset_at`   | TEXT          | RFC 3339, start of period  |
//!
//! Tenants without a row are provisioned on first read with the store's
//! default limit.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dealdesk_core::error::QuotaError;
use dealdesk_core::quota::{QuotaState, QuotaStore};
use dealdesk_core::tenant::TenantId;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

pub struct SqliteQuotaStore {
    pool: SqlitePool,
    default_limit: Option<f64>,
}

impl SqliteQuotaStore {
    /// Open (or create) the database at a `sqlite:` URL or plain file path.
    pub async fn new(url: &str, default_limit: Option<f64>) -> Result<Self, QuotaError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| QuotaError::Storage(format!("Invalid SQLite path: {e}")))?;
        Self::connect(options, default_limit).await
    }

    /// Open (or create) the database file at `path`.
    pub async fn open(path: &Path, default_limit: Option<f64>) -> Result<Self, QuotaError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    QuotaError::Storage(format!("Failed to create {}: {e}", parent.display()))
                })?;
            }
        }
        let options = SqliteConnectOptions::new().filename(path);
        Self::connect(options, default_limit).await
    }

    async fn connect(
        options: SqliteConnectOptions,
        default_limit: Option<f64>,
    ) -> Result<Self, QuotaError> {
        let options = options
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| QuotaError::Storage(format!("Failed to open SQLite: {e}")))?;

        Self::from_pool(pool, default_limit).await
    }

    /// Create from an existing pool.
    pub async fn from_pool(pool: SqlitePool, default_limit: Option<f64>) -> Result<Self, QuotaError> {
        let store = Self {
            pool,
            default_limit,
        };
        store.run_migrations().await?;
        info!(default_limit = ?default_limit, "SQLite quota store initialized");
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), QuotaError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS tenant_quotas (
                tenant      TEXT PRIMARY KEY NOT NULL,
                base_limit  REAL,
                used        REAL NOT NULL DEFAULT 0.0,
                extra       REAL NOT NULL DEFAULT 0.0,
                reset_at    TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| QuotaError::MigrationFailed(format!("tenant_quotas table: {e}")))?;

        debug!("SQLite quota migrations complete");
        Ok(())
    }

    fn row_to_state(row: &sqlx::sqlite::SqliteRow) -> Result<QuotaState, QuotaError> {
        let base_limit: Option<f64> = row
            .try_get("base_limit")
            .map_err(|e| QuotaError::Storage(format!("base_limit column: {e}")))?;
        let used: f64 = row
            .try_get("used")
            .map_err(|e| QuotaError::Storage(format!("used column: {e}")))?;
        let extra: f64 = row
            .try_get("extra")
            .map_err(|e| QuotaError::Storage(format!("extra column: {e}")))?;
        let reset_at: String = row
            .try_get("reset_at")
            .map_err(|e| QuotaError::Storage(format!("reset_at column: {e}")))?;

        let reset_at = DateTime::parse_from_rfc3339(&reset_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| QuotaError::Storage(format!("reset_at '{reset_at}': {e}")))?;

        Ok(QuotaState {
            base_limit,
            used,
            extra,
            reset_at,
        })
    }

    /// All tenant records, ordered by tenant id.
    pub async fn list(&self) -> Result<Vec<(TenantId, QuotaState)>, QuotaError> {
        let rows = sqlx::query("SELECT * FROM tenant_quotas ORDER BY tenant")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| QuotaError::Storage(format!("List failed: {e}")))?;

        rows.iter()
            .map(|row| {
                let tenant: String = row
                    .try_get("tenant")
                    .map_err(|e| QuotaError::Storage(format!("tenant column: {e}")))?;
                Ok((TenantId::new(tenant), Self::row_to_state(row)?))
            })
            .collect()
    }
}

#[async_trait]
impl QuotaStore for SqliteQuotaStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn read(&self, tenant: &TenantId) -> Result<QuotaState, QuotaError> {
        let row = sqlx::query("SELECT * FROM tenant_quotas WHERE tenant = ?1")
            .bind(tenant.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| QuotaError::Storage(format!("SELECT failed: {e}")))?;

        if let Some(row) = row {
            return Self::row_to_state(&row);
        }

        let state = QuotaState::new(self.default_limit, Utc::now());
        sqlx::query(
            r#"
            INSERT INTO tenant_quotas (tenant, base_limit, used, extra, reset_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(tenant) DO NOTHING
            "#,
        )
        .bind(tenant.as_str())
        .bind(state.base_limit)
        .bind(state.used)
        .bind(state.extra)
        .bind(state.reset_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| QuotaError::Storage(format!("Provisioning failed: {e}")))?;

        info!(tenant = %tenant, base_limit = ?state.base_limit, "Provisioned quota record");
        Ok(state)
    }

    async fn write(&self, tenant: &TenantId, state: &QuotaState) -> Result<(), QuotaError> {
        sqlx::query(
            r#"
            INSERT INTO tenant_quotas (tenant, base_limit, used, extra, reset_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(tenant) DO UPDATE SET
                base_limit = excluded.base_limit,
                used = excluded.used,
                extra = excluded.extra,
                reset_at = excluded.reset_at
            "#,
        )
        .bind(tenant.as_str())
        .bind(state.base_limit)
        .bind(state.used)
        .bind(state.extra)
        .bind(state.reset_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| QuotaError::Storage(format!("UPSERT failed: {e}")))?;

        debug!(tenant = %tenant, used = state.used, "Stored quota record");
        Ok(())
    }
}
