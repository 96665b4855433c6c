//! `POST /v1/chat/completions`: conversation completion, optionally grounded
//! on ingested documents.

use axum::{Json, routing::post};
use serde::Deserialize;

use super::CompletionResponse;
use crate::app::context::RequestContext;
use crate::app::router_spec::{FeatureRouter, RouterSpec};
use crate::error::ApiError;
use crate::services::llm::ChatMessage;
use crate::services::pipeline::{self, ContextFilter};

#[derive(Debug, Deserialize)]
pub struct ChatBody {
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub use_context: bool,
    #[serde(default)]
    pub context_filter: Option<ContextFilter>,
    #[serde(default)]
    pub include_sources: bool,
}

async fn chat_completion(
    ctx: RequestContext,
    Json(body): Json<ChatBody>,
) -> Result<Json<CompletionResponse>, ApiError> {
    if body.messages.is_empty() {
        return Err(ApiError::BadRequest("`messages` must not be empty".to_string()));
    }
    let completion = pipeline::chat(
        &ctx,
        body.messages,
        body.use_context,
        body.context_filter.as_ref(),
    )
    .await?;
    Ok(Json(CompletionResponse::new(
        &ctx,
        "completion.chunk",
        completion,
        body.include_sources,
    )))
}

pub fn router() -> RouterSpec {
    RouterSpec::new(FeatureRouter::Chat).route("/v1/chat/completions", post(chat_completion))
}
