//! Default feature routers.
//!
//! Each module exposes `router() -> RouterSpec`; the assembler treats them as
//! opaque mount units. Handlers resolve collaborators through the
//! [`RequestContext`] extractor.

pub mod chat;
pub mod chunks;
pub mod completions;
pub mod embeddings;
pub mod health;
pub mod ingest;
pub mod summarize;

use serde::Serialize;
use uuid::Uuid;

use crate::app::context::RequestContext;
use crate::app::router_spec::RouterSpec;
use crate::services::llm::ChatMessage;
use crate::services::pipeline::Completion;
use crate::services::Chunk;

/// The full router set, in declaration order.
pub fn default_routers() -> Vec<RouterSpec> {
    vec![
        completions::router(),
        chat::router(),
        chunks::router(),
        ingest::router(),
        summarize::router(),
        embeddings::router(),
        health::router(),
    ]
}

/// `OpenAI`-style completion body shared by `/v1/completions` and `/v1/chat/completions`.
#[derive(Debug, Serialize)]
pub struct CompletionResponse {
    pub id: String,
    pub object: &'static str,
    pub created: i64,
    pub model: String,
    pub choices: Vec<CompletionChoice>,
}

#[derive(Debug, Serialize)]
pub struct CompletionChoice {
    pub index: u32,
    pub message: ChatMessage,
    pub finish_reason: &'static str,
    /// Present only when the caller asked for sources.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<Chunk>>,
}

impl CompletionResponse {
    fn new(ctx: &RequestContext, object: &'static str, completion: Completion, include_sources: bool) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            object,
            created: ctx.received_at().timestamp(),
            model: ctx.llm().model().to_string(),
            choices: vec![CompletionChoice {
                index: 0,
                message: ChatMessage::assistant(completion.response),
                finish_reason: "stop",
                sources: include_sources.then_some(completion.sources),
            }],
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use axum::Router;

    use crate::app::context::{ContextBinder, bind_request_context};
    use crate::app::router_spec::RouterSpec;
    use crate::observability::CallbackManager;
    use crate::services::ServiceContainer;

    /// A single router wrapped in the context binder, for handler tests.
    pub fn bound(spec: RouterSpec, services: Arc<ServiceContainer>) -> Router {
        let binder = ContextBinder::new(services, Arc::new(CallbackManager::disabled()));
        spec.into_router()
            .layer(axum::middleware::from_fn_with_state(binder, bind_request_context))
    }
}
