//! # DealDesk Core
//!
//! Domain types, collaborator traits, and error definitions for the DealDesk
//! context engine. This crate has **no runtime dependencies** beyond serde,
//! thiserror, chrono and async-trait. It defines the domain model that all other
//! crates implement against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator (embedding provider, similarity search,
//! profile store, calendar, quota store) is a trait here. Implementations
//! live in their respective crates and are injected as `Arc<dyn Trait>`,
//! so each component can be exercised with fakes.

pub mod calendar;
pub mod error;
pub mod message;
pub mod quota;
pub mod retrieval;
pub mod tenant;

// Re-export key types at crate root for ergonomics
pub use calendar::{CalendarEvent, CalendarProvider, EventTime};
pub use error::{CalendarError, Error, QuotaError, Result, SourceError};
pub use message::{Message, Role};
pub use quota::{QuotaDecision, QuotaState, QuotaStore};
pub use retrieval::{
    BusinessProfile, Embedder, ProfileStore, RetrievedRecord, SimilarityQuery, SimilaritySearch,
    SourceKind,
};
pub use tenant::TenantId;
