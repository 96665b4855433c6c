//! Document ingestion and management.
//!
//! - `POST /v1/ingest/file`: multipart upload, field `file`
//! - `POST /v1/ingest/text`: `{file_name, text}`
//! - `GET /v1/ingest/list`
//! - `DELETE /v1/ingest/{doc_id}`

use axum::{
    Json,
    extract::{Multipart, Path},
    http::StatusCode,
    routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};

use crate::app::context::RequestContext;
use crate::app::router_spec::{FeatureRouter, RouterSpec};
use crate::error::ApiError;
use crate::services::IngestedDoc;
use crate::services::pipeline;

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub object: &'static str,
    pub model: &'static str,
    pub data: Vec<IngestedDoc>,
}

impl IngestResponse {
    fn list(data: Vec<IngestedDoc>) -> Json<Self> {
        Json(Self {
            object: "list",
            model: "ragdesk",
            data,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct IngestTextBody {
    pub file_name: String,
    pub text: String,
}

async fn ingest_file(
    ctx: RequestContext,
    mut multipart: Multipart,
) -> Result<Json<IngestResponse>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::multipart("failed to read multipart field", &e))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| ApiError::BadRequest("`file` field has no file name".to_string()))?;
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::multipart(&format!("failed to read '{file_name}'"), &e))?;

        let docs = pipeline::ingest(&ctx, &file_name, &data).await?;
        return Ok(IngestResponse::list(docs));
    }

    Err(ApiError::BadRequest("missing multipart field `file`".to_string()))
}

async fn ingest_text(
    ctx: RequestContext,
    Json(body): Json<IngestTextBody>,
) -> Result<Json<IngestResponse>, ApiError> {
    if body.text.is_empty() {
        return Err(ApiError::BadRequest("`text` must not be empty".to_string()));
    }
    let docs = pipeline::ingest(&ctx, &body.file_name, body.text.as_bytes()).await?;
    Ok(IngestResponse::list(docs))
}

async fn list_ingested(ctx: RequestContext) -> Result<Json<IngestResponse>, ApiError> {
    Ok(IngestResponse::list(ctx.documents().list().await?))
}

async fn delete_ingested(
    ctx: RequestContext,
    Path(doc_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    ctx.documents().delete(&doc_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> RouterSpec {
    RouterSpec::new(FeatureRouter::Ingest)
        .route("/v1/ingest/file", post(ingest_file))
        .route("/v1/ingest/text", post(ingest_text))
        .route("/v1/ingest/list", get(list_ingested))
        .route("/v1/ingest/{doc_id}", delete(delete_ingested))
}
