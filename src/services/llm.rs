//! Language-model collaborator.
//!
//! [`OpenAiCompatibleLlm`] talks to any server exposing `/v1/chat/completions`
//! (Ollama, vLLM, llama.cpp server, `OpenAI`).

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::LlmSettings;
use crate::error::ServiceError;

/// Role of a message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Non-streaming chat completion backend.
#[async_trait]
pub trait LlmBackend: Send + Sync + fmt::Debug {
    /// Model identifier reported in responses.
    fn model(&self) -> &str;

    async fn chat(&self, messages: &[ChatMessage]) -> Result<String, ServiceError>;
}

/// Driver for `OpenAI`-compatible Chat Completions endpoints.
#[derive(Clone)]
pub struct OpenAiCompatibleLlm {
    http: reqwest::Client,
    settings: LlmSettings,
}

impl fmt::Debug for OpenAiCompatibleLlm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiCompatibleLlm")
            .field("base_url", &self.settings.base_url)
            .field("model", &self.settings.model)
            .finish_non_exhaustive()
    }
}

impl OpenAiCompatibleLlm {
    pub fn new(settings: LlmSettings) -> Result<Self, ServiceError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;
        Ok(Self { http, settings })
    }
}

#[async_trait]
impl LlmBackend for OpenAiCompatibleLlm {
    fn model(&self) -> &str {
        &self.settings.model
    }

    async fn chat(&self, messages: &[ChatMessage]) -> Result<String, ServiceError> {
        let url = format!(
            "{}/v1/chat/completions",
            self.settings.base_url.trim_end_matches('/')
        );

        let body = serde_json::json!({
            "model": self.settings.model,
            "stream": false,
            "messages": messages,
        });

        let mut rb = self.http.post(&url).json(&body);
        if let Some(k) = &self.settings.api_key {
            rb = rb.bearer_auth(k);
        }

        let v: serde_json::Value = rb.send().await?.error_for_status()?.json().await?;
        v["choices"][0]["message"]["content"]
            .as_str()
            .map(ToString::to_string)
            .ok_or_else(|| ServiceError::Upstream("completion without message content".to_string()))
    }
}
