//! Embedding provider implementations for DealDesk.
//!
//! All providers implement the `dealdesk_core::Embedder` trait.

pub mod openai_compat;

pub use openai_compat::OpenAiEmbedder;
