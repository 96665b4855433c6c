//! `POST /v1/summarize`

use axum::{Json, routing::post};
use serde::{Deserialize, Serialize};

use crate::app::context::RequestContext;
use crate::app::router_spec::{FeatureRouter, RouterSpec};
use crate::error::ApiError;
use crate::services::pipeline::{self, ContextFilter, SummarizeInput};

#[derive(Debug, Deserialize)]
pub struct SummarizeBody {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub use_context: bool,
    #[serde(default)]
    pub context_filter: Option<ContextFilter>,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SummarizeResponse {
    pub summary: String,
}

async fn summarize(
    ctx: RequestContext,
    Json(body): Json<SummarizeBody>,
) -> Result<Json<SummarizeResponse>, ApiError> {
    let summary = pipeline::summarize(
        &ctx,
        SummarizeInput {
            text: body.text,
            use_context: body.use_context,
            filter: body.context_filter,
            prompt: body.prompt,
            instructions: body.instructions,
        },
    )
    .await?;
    Ok(Json(SummarizeResponse { summary }))
}

pub fn router() -> RouterSpec {
    RouterSpec::new(FeatureRouter::Summarize).route("/v1/summarize", post(summarize))
}
