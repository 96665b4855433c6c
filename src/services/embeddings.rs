//! Embedding collaborator over `OpenAI`-compatible `/v1/embeddings`.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::LlmSettings;
use crate::error::ServiceError;

#[async_trait]
pub trait Embedder: Send + Sync + fmt::Debug {
    fn model(&self) -> &str;

    /// One vector per input, in input order.
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ServiceError>;
}

#[derive(Clone)]
pub struct OpenAiCompatibleEmbedder {
    http: reqwest::Client,
    settings: LlmSettings,
}

impl fmt::Debug for OpenAiCompatibleEmbedder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiCompatibleEmbedder")
            .field("base_url", &self.settings.base_url)
            .field("model", &self.settings.embedding_model)
            .finish_non_exhaustive()
    }
}

impl OpenAiCompatibleEmbedder {
    pub fn new(settings: LlmSettings) -> Result<Self, ServiceError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;
        Ok(Self { http, settings })
    }
}

#[derive(Deserialize)]
struct EmbeddingList {
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    index: usize,
    embedding: Vec<f32>,
}

#[async_trait]
impl Embedder for OpenAiCompatibleEmbedder {
    fn model(&self) -> &str {
        &self.settings.embedding_model
    }

    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ServiceError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!(
            "{}/v1/embeddings",
            self.settings.base_url.trim_end_matches('/')
        );
        let body = serde_json::json!({
            "model": self.settings.embedding_model,
            "input": inputs,
        });

        let mut rb = self.http.post(&url).json(&body);
        if let Some(k) = &self.settings.api_key {
            rb = rb.bearer_auth(k);
        }

        let mut list: EmbeddingList = rb.send().await?.error_for_status()?.json().await?;
        if list.data.len() != inputs.len() {
            return Err(ServiceError::Upstream(format!(
                "expected {} embeddings, got {}",
                inputs.len(),
                list.data.len()
            )));
        }
        list.data.sort_by_key(|item| item.index);
        Ok(list.data.into_iter().map(|item| item.embedding).collect())
    }
}
