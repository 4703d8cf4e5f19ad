//! The per-turn context pipeline.
//!
//! For every seller message the pipeline:
//!
//! 1. **Classifies** whether the message needs the seller's calendar
//! 2. **Gates** on the tenant's monthly credit quota
//! 3. **Fans out** to the vector stores, profile store and (maybe) calendar
//! 4. **Computes** free slots from the calendar events
//! 5. **Composes** a [`ContextPayload`] for the language model
//! 6. **Commits** the turn's credits once a reply was produced

pub mod context;
pub mod turn;

#[cfg(test)]
mod test_helpers;

pub use context::{
    AggregatedContext, ContextAssembler, ContextPayload, DegradedSource, DropInfo,
    IntentClassifier, RenderMetadata, RenderedContext, RetrievalOutcome, RetrievalSources,
    SectionStats, SourceAggregator, SourceFailure, TokenBudget,
};
pub use turn::{PreparedTurn, Responder, TurnOutcome, TurnPipeline, TurnRequest, business_hours};
