//! `POST /v1/embeddings`

use std::time::Instant;

use axum::{Json, routing::post};
use serde::{Deserialize, Serialize};

use crate::app::context::RequestContext;
use crate::app::router_spec::{FeatureRouter, RouterSpec};
use crate::error::ApiError;
use crate::observability::CallbackEventKind;

/// A single string or a batch.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum EmbeddingsInput {
    One(String),
    Many(Vec<String>),
}

impl EmbeddingsInput {
    fn into_vec(self) -> Vec<String> {
        match self {
            Self::One(text) => vec![text],
            Self::Many(texts) => texts,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingsBody {
    pub input: EmbeddingsInput,
}

#[derive(Debug, Serialize)]
pub struct Embedding {
    pub index: usize,
    pub object: &'static str,
    pub embedding: Vec<f32>,
}

#[derive(Debug, Serialize)]
pub struct EmbeddingsResponse {
    pub object: &'static str,
    pub model: String,
    pub data: Vec<Embedding>,
}

async fn embeddings_generation(
    ctx: RequestContext,
    Json(body): Json<EmbeddingsBody>,
) -> Result<Json<EmbeddingsResponse>, ApiError> {
    let inputs = body.input.into_vec();
    if inputs.is_empty() {
        return Err(ApiError::BadRequest("`input` must not be empty".to_string()));
    }

    let started = Instant::now();
    let vectors = ctx.embedder().embed(&inputs).await?;
    ctx.emit(
        CallbackEventKind::Embedding,
        started,
        serde_json::json!({ "model": ctx.embedder().model(), "inputs": inputs.len() }),
    );

    Ok(Json(EmbeddingsResponse {
        object: "list",
        model: ctx.embedder().model().to_string(),
        data: vectors
            .into_iter()
            .enumerate()
            .map(|(index, embedding)| Embedding {
                index,
                object: "embedding",
                embedding,
            })
            .collect(),
    }))
}

pub fn router() -> RouterSpec {
    RouterSpec::new(FeatureRouter::Embeddings).route("/v1/embeddings", post(embeddings_generation))
}
