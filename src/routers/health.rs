use axum::{Json, routing::get};
use serde::Serialize;

use crate::app::router_spec::{FeatureRouter, RouterSpec};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

pub fn router() -> RouterSpec {
    RouterSpec::new(FeatureRouter::Health).route("/health", get(health))
}
