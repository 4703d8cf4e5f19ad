//! Context gathering and prompt assembly.
//!
//! | Section | Source | Trim strategy |
//! |---------|--------|---------------|
//! | Quota | Governor decision | Never trimmed |
//! | Business profile | Profile store | Whole block or nothing |
//! | Availability | Calendar + slot engine | Whole block or nothing |
//! | Knowledge | Vector store | Lowest similarity dropped |
//! | Success examples | Vector store | Lowest similarity dropped |
//! | Failure examples | Vector store | Lowest similarity dropped |

pub mod aggregator;
pub mod assembler;
pub mod intent;
pub mod token;

pub use aggregator::{
    AggregatedContext, DegradedSource, RetrievalOutcome, RetrievalSources, SourceAggregator,
    SourceFailure,
};
pub use assembler::{
    ContextAssembler, ContextPayload, DropInfo, RenderMetadata, RenderedContext, SectionStats,
    TokenBudget,
};
pub use intent::IntentClassifier;
