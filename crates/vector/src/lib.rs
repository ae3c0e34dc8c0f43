//! Multimodal collections over an external vector store: schema management,
//! batch import, similarity search and retrieval-augmented generation.

pub mod encoder;
pub mod generate;
pub mod generate_ollama;
pub mod import;
pub mod manager;
pub mod rag;
pub mod record;
pub mod schema;
pub mod search;
pub mod store;
#[cfg(any(test, feature = "test-support"))]
pub mod store_memory;
pub mod store_weaviate;

pub use {
    manager::MultimodalManager,
    record::Record,
    search::{SearchQuery, SearchResult},
};
