//! HTTP surface of the UI.
//!
//! - `GET /`: new session, full page
//! - `POST /sessions`: new session, JSON layout
//! - `GET /sessions/{id}`: JSON layout
//! - `POST /sessions/{id}/events`: `{control, event, payload?}`
//! - `POST /sessions/{id}/upload`: multipart, field `files`
//!
//! Event endpoints answer JSON, or out-of-band HTML fragments for HTMX.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Multipart, Path, State},
    http::HeaderMap,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use minijinja::{Environment, context};
use serde::{Deserialize, Serialize};

use super::dispatch::{DispatchOutcome, Payload, UiEvent, dispatch};
use super::layout::{self, Control, ControlView, LayoutView, UiEventKind};
use super::session::{DocumentFileBackend, Upload};
use super::store::{SharedSession, UiSessionStore};
use crate::app::context::RequestContext;
use crate::app::normalize_mount_path;
use crate::config::UiSettings;
use crate::error::{ConfigError, UiError};

/// Paths served, relative to the mount point.
pub const PATHS: [&str; 5] = [
    "/",
    "/sessions",
    "/sessions/{id}",
    "/sessions/{id}/events",
    "/sessions/{id}/upload",
];

#[derive(Debug, Clone)]
struct UiState {
    store: Arc<UiSessionStore>,
    templates: Arc<Environment<'static>>,
    /// Mount path without trailing slash; empty at the root.
    base: Arc<str>,
}

#[derive(Debug, Deserialize)]
struct EventRequest {
    control: Control,
    event: UiEventKind,
    #[serde(default)]
    payload: Option<String>,
}

/// Control view plus the CSS its emphasis maps to.
#[derive(Debug, Serialize)]
struct ControlHtml<'a> {
    view: &'a ControlView,
    classes: &'static str,
}

impl<'a> From<&'a ControlView> for ControlHtml<'a> {
    fn from(view: &'a ControlView) -> Self {
        Self {
            view,
            classes: view.emphasis.map_or("", layout::Emphasis::classes),
        }
    }
}

fn templates() -> Result<Environment<'static>, minijinja::Error> {
    let mut env = Environment::new();
    env.add_template("page.html", include_str!("templates/page.html"))?;
    env.add_template("sidebar.html", include_str!("templates/sidebar.html"))?;
    env.add_template("control.html", include_str!("templates/control.html"))?;
    env.add_template("fragment.html", include_str!("templates/fragment.html"))?;
    Ok(env)
}

pub(super) fn router(settings: &UiSettings) -> Result<Router, ConfigError> {
    let mount = normalize_mount_path(&settings.path)?;
    let templates = templates()
        .map_err(|e| ConfigError::UiUnavailable(format!("UI templates failed to load: {e}")))?;

    let state = UiState {
        store: Arc::new(UiSessionStore::default()),
        templates: Arc::new(templates),
        base: Arc::from(if mount == "/" { "" } else { mount.as_str() }),
    };

    Ok(Router::new()
        .route(PATHS[0], get(index))
        .route(PATHS[1], post(create_session))
        .route(PATHS[2], get(session_layout))
        .route(PATHS[3], post(session_event))
        .route(PATHS[4], post(session_upload))
        .with_state(state))
}

impl UiState {
    fn urls(&self, session_id: &str) -> (String, String) {
        let session = format!("{}/sessions/{session_id}", self.base);
        (format!("{session}/events"), format!("{session}/upload"))
    }

    async fn session(&self, id: String) -> Result<SharedSession, UiError> {
        self.store
            .get(&id)
            .await
            .ok_or(UiError::SessionNotFound(id))
    }

    /// New session with the backend's current file list.
    async fn open(&self, ctx: &RequestContext) -> Result<SharedSession, UiError> {
        let shared = self.store.create().await;
        shared
            .lock()
            .await
            .refresh_files(&DocumentFileBackend::new(ctx.clone()))
            .await?;
        Ok(shared)
    }

    fn render_page(&self, view: &LayoutView) -> Result<String, UiError> {
        let find = |control| view.control(control).map(ControlHtml::from);
        let sidebar_controls: Vec<ControlHtml<'_>> = view
            .controls
            .iter()
            .filter(|v| v.control.in_sidebar())
            .map(ControlHtml::from)
            .collect();
        let (events_url, upload_url) = self.urls(&view.session_id);

        Ok(self.templates.get_template("page.html")?.render(context! {
            session_id => &view.session_id,
            events_url,
            upload_url,
            toggle => find(Control::SidebarToggle),
            sidebar => find(Control::Sidebar),
            chat => find(Control::Chat),
            sidebar_controls,
        })?)
    }

    fn render_fragment(
        &self,
        outcome: &DispatchOutcome,
        full: Option<&LayoutView>,
        session_id: &str,
    ) -> Result<String, UiError> {
        let updates: Vec<ControlHtml<'_>> = outcome
            .updates
            .iter()
            .filter(|v| v.control != Control::Sidebar)
            .map(ControlHtml::from)
            .collect();
        let sidebar = full.and_then(|view| view.control(Control::Sidebar).map(ControlHtml::from));
        let sidebar_controls: Vec<ControlHtml<'_>> = full
            .map(|view| {
                view.controls
                    .iter()
                    .filter(|v| v.control.in_sidebar())
                    .map(ControlHtml::from)
                    .collect()
            })
            .unwrap_or_default();
        let (events_url, upload_url) = self.urls(session_id);

        Ok(self.templates.get_template("fragment.html")?.render(context! {
            session_id,
            events_url,
            upload_url,
            updates,
            sidebar,
            sidebar_controls,
            oob => true,
            notice => &outcome.notice,
        })?)
    }
}

fn is_htmx(headers: &HeaderMap) -> bool {
    headers.contains_key("hx-request")
}

async fn index(State(state): State<UiState>, ctx: RequestContext) -> Result<Html<String>, UiError> {
    let shared = state.open(&ctx).await?;
    let session = shared.lock().await;
    let view = layout::render(&session, ctx.llm().model());
    Ok(Html(state.render_page(&view)?))
}

async fn create_session(
    State(state): State<UiState>,
    ctx: RequestContext,
) -> Result<Json<LayoutView>, UiError> {
    let shared = state.open(&ctx).await?;
    let session = shared.lock().await;
    Ok(Json(layout::render(&session, ctx.llm().model())))
}

async fn session_layout(
    State(state): State<UiState>,
    ctx: RequestContext,
    Path(id): Path<String>,
) -> Result<Json<LayoutView>, UiError> {
    let shared = state.session(id).await?;
    let session = shared.lock().await;
    Ok(Json(layout::render(&session, ctx.llm().model())))
}

async fn run_event(
    state: &UiState,
    ctx: &RequestContext,
    headers: &HeaderMap,
    id: String,
    event: UiEvent,
) -> Result<Response, UiError> {
    let shared = state.session(id).await?;
    let mut session = shared.lock().await;
    let backend = DocumentFileBackend::new(ctx.clone());
    let outcome = dispatch(&mut session, event, &backend, ctx).await?;

    if !is_htmx(headers) {
        return Ok(Json(outcome).into_response());
    }
    let full = outcome
        .updates
        .iter()
        .any(|v| v.control == Control::Sidebar)
        .then(|| layout::render(&session, ctx.llm().model()));
    let html = state.render_fragment(&outcome, full.as_ref(), session.id())?;
    Ok(Html(html).into_response())
}

async fn session_event(
    State(state): State<UiState>,
    ctx: RequestContext,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(request): Json<EventRequest>,
) -> Result<Response, UiError> {
    let event = UiEvent {
        control: request.control,
        event: request.event,
        payload: request.payload.map_or(Payload::None, Payload::Text),
    };
    run_event(&state, &ctx, &headers, id, event).await
}

async fn session_upload(
    State(state): State<UiState>,
    ctx: RequestContext,
    Path(id): Path<String>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Response, UiError> {
    let mut uploads = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| UiError::multipart("failed to read multipart field", &e))?
    {
        if field.name() != Some("files") {
            continue;
        }
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let content = field
            .bytes()
            .await
            .map_err(|e| UiError::multipart(&format!("failed to read '{file_name}'"), &e))?;
        uploads.push(Upload {
            file_name,
            content: content.to_vec(),
        });
    }

    let event = UiEvent {
        control: Control::UploadButton,
        event: UiEventKind::Upload,
        payload: Payload::Uploads(uploads),
    };
    run_event(&state, &ctx, &headers, id, event).await
}
