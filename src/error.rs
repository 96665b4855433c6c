//! Error taxonomy.
//!
//! - [`ConfigError`]: fatal, raised while loading configuration or assembling
//!   the application. The process does not start.
//! - [`ServiceError`]: a collaborator (document store, LLM, embedder) failed.
//! - [`ApiError`]: a per-request failure inside a feature router, rendered as
//!   a JSON error body.
//! - [`UiError`]: a UI event could not be applied to its session.

use axum::{
    Json,
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// Startup-time configuration and assembly errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Two mount units declare the same route.
    #[error("route `{path}` is declared by both `{first}` and `{second}`")]
    RouteCollision {
        /// Normalized route path.
        path: String,
        /// Unit that declared the route first.
        first: String,
        /// Unit that declared it again.
        second: String,
    },

    /// The same feature router was handed to the assembler twice.
    #[error("the `{0}` router was supplied more than once")]
    DuplicateRouter(&'static str),

    /// The UI is enabled but was compiled out or could not be resolved.
    #[error("UI dependencies not found: {0}")]
    UiUnavailable(String),

    /// The UI mount path cannot be used as a mount point.
    #[error("invalid UI mount path `{path}`: {reason}")]
    InvalidUiPath {
        /// Configured path.
        path: String,
        /// What is wrong with it.
        reason: &'static str,
    },

    /// A CORS policy field does not parse.
    #[error("malformed CORS policy: {0}")]
    MalformedCors(String),

    /// `observability.global_handler` names an unknown handler.
    #[error("unknown global handler `{0}` (expected `simple` or `none`)")]
    UnknownGlobalHandler(String),

    /// A setting holds a value outside its domain.
    #[error("invalid setting `{key}`: {reason}")]
    InvalidSetting {
        /// Dotted configuration key.
        key: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// Configuration sources could not be read or deserialized.
    #[error(transparent)]
    Load(#[from] config::ConfigError),
}

/// Failures reported by an external collaborator.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The referenced document does not exist.
    #[error("document `{0}` not found")]
    NotFound(String),

    /// The request was rejected before reaching the backend.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The upstream model server failed or returned garbage.
    #[error("upstream error: {0}")]
    Upstream(String),

    /// HTTP transport failure talking to the model server.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Any other backend failure.
    #[error("backend error: {0}")]
    Backend(String),
}

/// JSON body returned for failed API requests.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Human-readable message.
    pub error: String,
    /// Stable machine-readable code.
    pub code: &'static str,
}

/// Per-request error raised by a feature router.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed request payload.
    #[error("{0}")]
    BadRequest(String),

    /// The request body exceeds `ingest.max_upload_bytes`.
    #[error("{0}")]
    PayloadTooLarge(String),

    /// A collaborator call failed.
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// The request context was not bound to this request.
    #[error("request context missing")]
    MissingContext,
}

/// Whether a multipart read failed on the request body limit.
fn over_body_limit(err: &MultipartError) -> bool {
    err.status() == StatusCode::PAYLOAD_TOO_LARGE
}

impl ApiError {
    /// Multipart read failure; the body limit maps to 413, anything else to 400.
    pub fn multipart(what: &str, err: &MultipartError) -> Self {
        if over_body_limit(err) {
            Self::PayloadTooLarge(format!("{what}: {err}"))
        } else {
            Self::BadRequest(format!("{what}: {err}"))
        }
    }

    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::PayloadTooLarge(_) => (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE"),
            Self::BadRequest(_) | Self::Service(ServiceError::InvalidInput(_)) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST")
            }
            Self::Service(ServiceError::NotFound(_)) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Service(ServiceError::Upstream(_) | ServiceError::Http(_)) => {
                (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR")
            }
            Self::Service(ServiceError::Backend(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "BACKEND_ERROR")
            }
            Self::MissingContext => (StatusCode::INTERNAL_SERVER_ERROR, "MISSING_CONTEXT"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!(name: "api.error", code, error = %self, "Request failed");
        }
        (
            status,
            Json(ErrorBody {
                error: self.to_string(),
                code,
            }),
        )
            .into_response()
    }
}

/// UI event dispatch errors.
#[cfg(feature = "ui")]
#[derive(Debug, Error)]
pub enum UiError {
    /// No binding exists for this control and event.
    #[error("no transition is bound to `{event}` on `{control}`")]
    UnboundEvent {
        control: crate::ui::layout::Control,
        event: crate::ui::layout::UiEventKind,
    },

    /// The control is currently disabled or hidden.
    #[error("`{0}` is not interactive in the current state")]
    ControlDisabled(crate::ui::layout::Control),

    /// The event payload does not fit the bound transition.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// The upload exceeds `ingest.max_upload_bytes`.
    #[error("upload too large: {0}")]
    PayloadTooLarge(String),

    /// The referenced file is not in the session's file list.
    #[error("file `{0}` is not in the ingested list")]
    UnknownFile(String),

    /// A backend call failed; the session was left unchanged.
    #[error(transparent)]
    Collaborator(#[from] ServiceError),

    #[error("UI session `{0}` not found")]
    SessionNotFound(String),

    #[error("template rendering failed: {0}")]
    Render(#[from] minijinja::Error),
}

#[cfg(feature = "ui")]
impl UiError {
    pub fn multipart(what: &str, err: &MultipartError) -> Self {
        if over_body_limit(err) {
            Self::PayloadTooLarge(format!("{what}: {err}"))
        } else {
            Self::InvalidPayload(format!("{what}: {err}"))
        }
    }
}

#[cfg(feature = "ui")]
impl IntoResponse for UiError {
    fn into_response(self) -> Response {
        let (status, code) = match self {
            Self::Collaborator(inner) => return ApiError::Service(inner).into_response(),
            Self::ControlDisabled(_) => (StatusCode::CONFLICT, "CONTROL_DISABLED"),
            Self::SessionNotFound(_) => (StatusCode::NOT_FOUND, "SESSION_NOT_FOUND"),
            Self::PayloadTooLarge(_) => (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE"),
            Self::Render(ref err) => {
                tracing::error!(name: "ui.render_failed", error = %err, "Template rendering failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "RENDER_ERROR")
            }
            Self::UnboundEvent { .. } | Self::InvalidPayload(_) | Self::UnknownFile(_) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST")
            }
        };
        (
            status,
            Json(ErrorBody {
                error: self.to_string(),
                code,
            }),
        )
            .into_response()
    }
}
