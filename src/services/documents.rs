//! Document store collaborator.
//!
//! The default [`InMemoryDocumentStore`] keeps documents for the lifetime of
//! the process. It ranks chunks by query-term overlap, which is enough to
//! drive the API and UI locally; a vector store plugs in behind the same
//! [`DocumentStore`] trait.

use std::collections::HashSet;
use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use text_splitter::{Characters, ChunkConfig, TextSplitter};
use tokio::sync::RwLock;

use crate::error::ServiceError;

/// A document produced by ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestedDoc {
    pub doc_id: String,
    pub file_name: String,
    pub mime_type: String,
    pub ingested_at: DateTime<Utc>,
}

/// A retrieved piece of a document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chunk {
    pub doc: IngestedDoc,
    pub text: String,
    pub score: f32,
    /// Page label when the source format has pages.
    pub page: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_texts: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_texts: Option<Vec<String>>,
}

/// Storage and retrieval of ingested documents.
#[async_trait]
pub trait DocumentStore: Send + Sync + fmt::Debug {
    /// Ingest one file. Returns the documents created for it.
    async fn ingest(&self, file_name: &str, content: &[u8]) -> Result<Vec<IngestedDoc>, ServiceError>;

    /// All documents in ingestion order.
    async fn list(&self) -> Result<Vec<IngestedDoc>, ServiceError>;

    async fn delete(&self, doc_id: &str) -> Result<(), ServiceError>;

    /// Remove every document. Returns how many were removed.
    async fn delete_all(&self) -> Result<usize, ServiceError>;

    /// Best `limit` chunks for `query`, restricted to `filter` doc ids when given.
    async fn retrieve(
        &self,
        query: &str,
        filter: Option<&[String]>,
        limit: usize,
        prev_next_chunks: usize,
    ) -> Result<Vec<Chunk>, ServiceError>;

    /// Full text of the filtered documents, in ingestion order.
    async fn documents_text(&self, filter: Option<&[String]>) -> Result<String, ServiceError>;
}

#[derive(Debug)]
struct StoredDoc {
    doc: IngestedDoc,
    chunks: Vec<String>,
}

/// Process-local [`DocumentStore`].
#[derive(Debug)]
pub struct InMemoryDocumentStore {
    chunk_size: usize,
    docs: RwLock<Vec<StoredDoc>>,
}

impl InMemoryDocumentStore {
    #[must_use]
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size,
            docs: RwLock::new(Vec::new()),
        }
    }

    fn split(&self, text: &str) -> Vec<String> {
        let config = ChunkConfig::new(self.chunk_size)
            .with_sizer(Characters)
            .with_trim(true);
        let splitter = TextSplitter::new(config);
        splitter.chunks(text).map(|s: &str| s.to_string()).collect()
    }
}

fn decode(file_name: &str, mime_type: &str, content: &[u8]) -> Result<String, ServiceError> {
    let textual = mime_type.starts_with("text/")
        || mime_type == "application/json"
        || mime_type == "application/xml";

    if textual {
        return String::from_utf8(content.to_vec())
            .map_err(|e| ServiceError::InvalidInput(format!("'{file_name}' is not valid UTF-8 text: {e}")));
    }

    tracing::warn!(
        file_name,
        mime_type,
        "No extractor for this type, indexing lossy text"
    );
    Ok(String::from_utf8_lossy(content).into_owned())
}

fn terms(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn in_filter(doc: &IngestedDoc, filter: Option<&[String]>) -> bool {
    filter.is_none_or(|ids| ids.iter().any(|id| *id == doc.doc_id))
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn ingest(&self, file_name: &str, content: &[u8]) -> Result<Vec<IngestedDoc>, ServiceError> {
        if file_name.trim().is_empty() {
            return Err(ServiceError::InvalidInput("file name is empty".to_string()));
        }

        let mime_type = mime_guess::from_path(file_name)
            .first_or_octet_stream()
            .to_string();
        let text = decode(file_name, &mime_type, content)?;
        let chunks = self.split(&text);

        let doc = IngestedDoc {
            doc_id: uuid::Uuid::new_v4().to_string(),
            file_name: file_name.to_string(),
            mime_type,
            ingested_at: Utc::now(),
        };

        tracing::info!(
            name: "ingest.completed",
            doc_id = %doc.doc_id,
            file_name,
            chunks = chunks.len(),
            "Document ingested"
        );

        self.docs.write().await.push(StoredDoc {
            doc: doc.clone(),
            chunks,
        });
        Ok(vec![doc])
    }

    async fn list(&self) -> Result<Vec<IngestedDoc>, ServiceError> {
        Ok(self.docs.read().await.iter().map(|d| d.doc.clone()).collect())
    }

    async fn delete(&self, doc_id: &str) -> Result<(), ServiceError> {
        let mut docs = self.docs.write().await;
        let position = docs
            .iter()
            .position(|d| d.doc.doc_id == doc_id)
            .ok_or_else(|| ServiceError::NotFound(doc_id.to_string()))?;
        docs.remove(position);
        Ok(())
    }

    async fn delete_all(&self) -> Result<usize, ServiceError> {
        let mut docs = self.docs.write().await;
        let removed = docs.len();
        docs.clear();
        Ok(removed)
    }

    async fn retrieve(
        &self,
        query: &str,
        filter: Option<&[String]>,
        limit: usize,
        prev_next_chunks: usize,
    ) -> Result<Vec<Chunk>, ServiceError> {
        let wanted = terms(query);
        if wanted.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let docs = self.docs.read().await;
        let mut scored = Vec::new();
        for stored in docs.iter().filter(|d| in_filter(&d.doc, filter)) {
            for (index, text) in stored.chunks.iter().enumerate() {
                let found = terms(text);
                let hits = wanted.iter().filter(|t| found.contains(*t)).count();
                if hits == 0 {
                    continue;
                }
                #[allow(clippy::cast_precision_loss)]
                let score = hits as f32 / wanted.len() as f32;

                let neighbours = |range: std::ops::Range<usize>| {
                    (prev_next_chunks > 0).then(|| stored.chunks[range].to_vec())
                };
                let start = index.saturating_sub(prev_next_chunks);
                let end = (index + 1 + prev_next_chunks).min(stored.chunks.len());

                scored.push(Chunk {
                    doc: stored.doc.clone(),
                    text: text.clone(),
                    score,
                    page: None,
                    previous_texts: neighbours(start..index),
                    next_texts: neighbours(index + 1..end),
                });
            }
        }

        // Stable: equal scores keep ingestion order
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(limit);
        Ok(scored)
    }

    async fn documents_text(&self, filter: Option<&[String]>) -> Result<String, ServiceError> {
        let docs = self.docs.read().await;
        Ok(docs
            .iter()
            .filter(|d| in_filter(&d.doc, filter))
            .flat_map(|d| d.chunks.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join("\n\n"))
    }
}
