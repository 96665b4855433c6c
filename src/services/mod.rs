//! Collaborators behind the feature routers and the UI.
//!
//! - [`documents`]: ingestion, listing, deletion and chunk retrieval
//! - [`llm`]: chat completion backend
//! - [`embeddings`]: embedding backend
//! - [`pipeline`]: prompt assembly for chat, completions and summaries

pub mod documents;
pub mod embeddings;
pub mod llm;
pub mod pipeline;

pub use documents::{Chunk, DocumentStore, InMemoryDocumentStore, IngestedDoc};
pub use embeddings::{Embedder, OpenAiCompatibleEmbedder};
pub use llm::{ChatMessage, LlmBackend, OpenAiCompatibleLlm, Role};

use std::sync::Arc;

use crate::config::AppConfig;
use crate::error::ServiceError;

/// Process-wide services, shared by every request context.
#[derive(Debug, Clone)]
pub struct ServiceContainer {
    pub documents: Arc<dyn DocumentStore>,
    pub llm: Arc<dyn LlmBackend>,
    pub embedder: Arc<dyn Embedder>,
    pub settings: Arc<AppConfig>,
}

impl ServiceContainer {
    /// Default collaborators for the given configuration.
    pub fn from_config(settings: Arc<AppConfig>) -> Result<Self, ServiceError> {
        Ok(Self {
            documents: Arc::new(InMemoryDocumentStore::new(settings.ingest.chunk_size)),
            llm: Arc::new(OpenAiCompatibleLlm::new(settings.llm.clone())?),
            embedder: Arc::new(OpenAiCompatibleEmbedder::new(settings.llm.clone())?),
            settings,
        })
    }
}
