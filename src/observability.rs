//! Process-wide callback sink for pipeline events.
//!
//! The [`CallbackManager`] is built once at startup (see
//! [`create_global_handler`]) and handed to the assembler, which makes it
//! reachable from every request through the request context. Nothing here is
//! stored in a global.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::error::ConfigError;

/// Pipeline stage a callback event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CallbackEventKind {
    /// Chunks were retrieved from the document store.
    Retrieve,
    /// A model completion finished.
    Llm,
    /// Embeddings were computed.
    Embedding,
    /// Documents were ingested or deleted.
    Ingest,
    /// A summary was produced.
    Summarize,
}

impl CallbackEventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Retrieve => "retrieve",
            Self::Llm => "llm",
            Self::Embedding => "embedding",
            Self::Ingest => "ingest",
            Self::Summarize => "summarize",
        }
    }
}

/// One observed pipeline step.
#[derive(Debug, Clone, Serialize)]
pub struct CallbackEvent {
    pub kind: CallbackEventKind,
    /// Request that triggered the step.
    pub request_id: Uuid,
    pub elapsed_ms: u64,
    pub payload: serde_json::Value,
}

/// Receiver of pipeline events.
pub trait CallbackHandler: Send + Sync + fmt::Debug {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Called synchronously for every emitted event. Must not block.
    fn on_event(&self, event: &CallbackEvent);
}

/// Logs each event through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SimpleHandler;

impl CallbackHandler for SimpleHandler {
    fn name(&self) -> &'static str {
        "simple"
    }

    fn on_event(&self, event: &CallbackEvent) {
        tracing::info!(
            name: "callback.event",
            kind = event.kind.as_str(),
            request_id = %event.request_id,
            elapsed_ms = event.elapsed_ms,
            payload = %event.payload,
            "Pipeline event"
        );
    }
}

/// Fan-out over the installed handlers.
#[derive(Debug, Default, Clone)]
pub struct CallbackManager {
    handlers: Vec<Arc<dyn CallbackHandler>>,
}

impl CallbackManager {
    #[must_use]
    pub fn new(handlers: Vec<Arc<dyn CallbackHandler>>) -> Self {
        Self { handlers }
    }

    /// Manager with no handlers; events are dropped.
    #[must_use]
    pub fn disabled() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_handler(mut self, handler: Arc<dyn CallbackHandler>) -> Self {
        self.handlers.push(handler);
        self
    }

    pub fn handler_names(&self) -> Vec<&'static str> {
        self.handlers.iter().map(|h| h.name()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn emit(&self, event: &CallbackEvent) {
        for handler in &self.handlers {
            handler.on_event(event);
        }
    }
}

/// Build the callback manager named by `observability.global_handler`.
pub fn create_global_handler(kind: &str) -> Result<CallbackManager, ConfigError> {
    match kind.trim().to_ascii_lowercase().as_str() {
        "simple" => Ok(CallbackManager::disabled().with_handler(Arc::new(SimpleHandler))),
        "none" | "" => Ok(CallbackManager::disabled()),
        other => Err(ConfigError::UnknownGlobalHandler(other.to_string())),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::{CallbackEvent, CallbackHandler};
    use std::sync::Mutex;

    /// Records every event it receives.
    #[derive(Debug, Default)]
    pub struct RecordingHandler {
        pub events: Mutex<Vec<CallbackEvent>>,
    }

    impl CallbackHandler for RecordingHandler {
        fn name(&self) -> &'static str {
            "recording"
        }

        fn on_event(&self, event: &CallbackEvent) {
            self.events.lock().unwrap().push(event.clone());
        }
    }
}
