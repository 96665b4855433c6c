//! Request-scoped dependency context.
//!
//! [`bind_request_context`] runs in front of every mounted router and inserts
//! a fresh [`RequestContext`] into the request extensions. Handlers take it as
//! an extractor. The context wraps the process-wide [`ServiceContainer`] and
//! [`CallbackManager`]; only the context itself is per request.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderValue, request::Parts},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::error::ApiError;
use crate::observability::{CallbackEvent, CallbackEventKind, CallbackManager};
use crate::services::{DocumentStore, Embedder, LlmBackend, ServiceContainer};

/// Response header carrying the request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Dependencies visible to one request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    inner: Arc<ContextInner>,
}

#[derive(Debug)]
struct ContextInner {
    request_id: Uuid,
    received_at: DateTime<Utc>,
    services: Arc<ServiceContainer>,
    callbacks: Arc<CallbackManager>,
}

impl RequestContext {
    fn new(services: Arc<ServiceContainer>, callbacks: Arc<CallbackManager>) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                request_id: Uuid::new_v4(),
                received_at: Utc::now(),
                services,
                callbacks,
            }),
        }
    }

    pub fn request_id(&self) -> Uuid {
        self.inner.request_id
    }

    pub fn received_at(&self) -> DateTime<Utc> {
        self.inner.received_at
    }

    pub fn services(&self) -> &Arc<ServiceContainer> {
        &self.inner.services
    }

    pub fn documents(&self) -> &dyn DocumentStore {
        self.inner.services.documents.as_ref()
    }

    pub fn llm(&self) -> &dyn LlmBackend {
        self.inner.services.llm.as_ref()
    }

    pub fn embedder(&self) -> &dyn Embedder {
        self.inner.services.embedder.as_ref()
    }

    pub fn settings(&self) -> &AppConfig {
        &self.inner.services.settings
    }

    pub fn callbacks(&self) -> &Arc<CallbackManager> {
        &self.inner.callbacks
    }

    /// Report a finished pipeline step to the global callback sink.
    pub fn emit(&self, kind: CallbackEventKind, started: Instant, payload: serde_json::Value) {
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.inner.callbacks.emit(&CallbackEvent {
            kind,
            request_id: self.inner.request_id,
            elapsed_ms,
            payload,
        });
    }
}

/// Produces one [`RequestContext`] per inbound request.
#[derive(Debug, Clone)]
pub struct ContextBinder {
    services: Arc<ServiceContainer>,
    callbacks: Arc<CallbackManager>,
}

impl ContextBinder {
    pub fn new(services: Arc<ServiceContainer>, callbacks: Arc<CallbackManager>) -> Self {
        Self {
            services,
            callbacks,
        }
    }

    /// Fresh context sharing this binder's services.
    pub fn bind(&self) -> RequestContext {
        RequestContext::new(Arc::clone(&self.services), Arc::clone(&self.callbacks))
    }
}

/// Middleware attaching a fresh [`RequestContext`] to the request.
///
/// The inner response is returned as is; router errors pass through untouched.
pub async fn bind_request_context(
    State(binder): State<ContextBinder>,
    mut request: Request,
    next: Next,
) -> Response {
    let context = binder.bind();
    let request_id = context.request_id();
    request.extensions_mut().insert(context);

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequestContext>()
            .cloned()
            .ok_or(ApiError::MissingContext)
    }
}
