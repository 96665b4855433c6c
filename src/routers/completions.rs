//! `POST /v1/completions`: single-prompt completion.

use axum::{Json, routing::post};
use serde::Deserialize;

use super::CompletionResponse;
use crate::app::context::RequestContext;
use crate::app::router_spec::{FeatureRouter, RouterSpec};
use crate::error::ApiError;
use crate::services::llm::ChatMessage;
use crate::services::pipeline::{self, ContextFilter};

#[derive(Debug, Deserialize)]
pub struct CompletionsBody {
    pub prompt: String,
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub use_context: bool,
    #[serde(default)]
    pub context_filter: Option<ContextFilter>,
    #[serde(default)]
    pub include_sources: bool,
}

async fn prompt_completion(
    ctx: RequestContext,
    Json(body): Json<CompletionsBody>,
) -> Result<Json<CompletionResponse>, ApiError> {
    let mut messages = Vec::with_capacity(2);
    if let Some(system) = body.system_prompt.filter(|s| !s.trim().is_empty()) {
        messages.push(ChatMessage::system(system));
    }
    messages.push(ChatMessage::user(body.prompt));

    let completion =
        pipeline::chat(&ctx, messages, body.use_context, body.context_filter.as_ref()).await?;
    Ok(Json(CompletionResponse::new(
        &ctx,
        "completion",
        completion,
        body.include_sources,
    )))
}

pub fn router() -> RouterSpec {
    RouterSpec::new(FeatureRouter::Completions).route("/v1/completions", post(prompt_completion))
}
