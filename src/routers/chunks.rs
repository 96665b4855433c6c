//! `POST /v1/chunks`: raw retrieval of relevant chunks.

use axum::{Json, routing::post};
use serde::{Deserialize, Serialize};

use crate::app::context::RequestContext;
use crate::app::router_spec::{FeatureRouter, RouterSpec};
use crate::error::ApiError;
use crate::services::Chunk;
use crate::services::pipeline::{self, ContextFilter};

fn default_limit() -> usize {
    10
}

#[derive(Debug, Deserialize)]
pub struct ChunksBody {
    pub text: String,
    #[serde(default)]
    pub context_filter: Option<ContextFilter>,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub prev_next_chunks: usize,
}

#[derive(Debug, Serialize)]
pub struct ChunksResponse {
    pub object: &'static str,
    pub model: &'static str,
    pub data: Vec<Chunk>,
}

async fn chunks_retrieval(
    ctx: RequestContext,
    Json(body): Json<ChunksBody>,
) -> Result<Json<ChunksResponse>, ApiError> {
    if body.limit == 0 {
        return Err(ApiError::BadRequest("`limit` must be at least 1".to_string()));
    }
    let data = pipeline::retrieve(
        &ctx,
        &body.text,
        body.context_filter.as_ref(),
        body.limit,
        body.prev_next_chunks,
    )
    .await?;
    Ok(Json(ChunksResponse {
        object: "list",
        model: "ragdesk",
        data,
    }))
}

pub fn router() -> RouterSpec {
    RouterSpec::new(FeatureRouter::Chunks).route("/v1/chunks", post(chunks_retrieval))
}
