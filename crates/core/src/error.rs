//! Error types for the DealDesk domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum; only the variants of the
//! top-level [`Error`] ever reach a caller of the turn pipeline.

use thiserror::Error;

/// The top-level error type for all DealDesk operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The tenant has used up its monthly allowance. Terminal: clients should
    /// offer an upgrade, not a retry.
    #[error("Quota exceeded for tenant {tenant} (remaining: {remaining:.2})")]
    QuotaExceeded { tenant: String, remaining: f64 },

    /// The query embedding could not be generated. Every similarity search
    /// depends on it, so the whole request is aborted.
    #[error("Embedding generation failed: {0}")]
    EmbeddingGenerationFailed(#[source] SourceError),

    /// The quota record could not be read before admission.
    #[error("Quota store unavailable: {0}")]
    QuotaUnavailable(#[source] QuotaError),

    /// The downstream responder (LLM call) failed. Usage is not committed.
    #[error("Responder failed: {0}")]
    Responder(String),
}

impl Error {
    /// Whether a client may reasonably retry the same request.
    ///
    /// `QuotaExceeded` is never retryable; it must be presented as
    /// "upgrade" rather than "try again".
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::EmbeddingGenerationFailed(_) | Self::QuotaUnavailable(_) | Self::Responder(_)
        )
    }

    /// Whether this is the quota gate refusing the request.
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, Self::QuotaExceeded { .. })
    }
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Failure of a single retrieval collaborator (embedding, search, profile).
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Source not configured: {0}")]
    NotConfigured(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Calendar retrieval failures. All of them collapse to "calendar not
/// available" inside the aggregator.
#[derive(Debug, Clone, Error)]
pub enum CalendarError {
    #[error("Calendar not connected for user {0}")]
    NotConnected(String),

    #[error("Calendar fetch failed: {0}")]
    FetchFailed(String),
}

/// Quota store failures.
#[derive(Debug, Clone, Error)]
pub enum QuotaError {
    #[error("Unknown tenant: {0}")]
    UnknownTenant(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),
}
