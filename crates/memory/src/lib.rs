//! Storage collaborators for DealDesk: vector index, profiles, calendars, quota.

pub mod calendar;
pub mod in_memory;
pub mod vector;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use calendar::{JsonFileCalendar, StaticCalendar, load_events, parse_events, within_window};
pub use in_memory::{InMemoryIndex, InMemoryProfileStore, InMemoryQuotaStore};
pub use vector::{EmbeddedRecord, cosine_similarity, vector_search};

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteQuotaStore;
