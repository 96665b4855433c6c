//! Application assembly.
//!
//! [`assemble`] is the one-shot, init-time construction of the HTTP
//! application:
//!
//! 1. feature routers are mounted in [`FeatureRouter::MOUNT_ORDER`], after
//!    checking that no two mount units declare the same route;
//! 2. the UI sub-application is resolved and mounted when enabled;
//! 3. the request body limit and the request context binder wrap every route;
//! 4. the CORS layer is attached when the policy is enabled.
//!
//! Any failure is a [`ConfigError`] and no handle is produced.

pub mod context;
pub mod cors;
pub mod router_spec;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::UiSettings;
use crate::error::ConfigError;
use crate::observability::CallbackManager;
use crate::services::ServiceContainer;

use context::{ContextBinder, bind_request_context};
use cors::CorsPolicy;
use router_spec::{FeatureRouter, RouteTable, RouterSpec};

/// Owner name used for UI routes in collision reports.
const UI_OWNER: &str = "ui";

/// A resolved UI sub-application.
#[derive(Debug)]
pub struct UiApp {
    /// Paths served, relative to the mount point (`/` is the mount point itself).
    pub paths: Vec<String>,
    pub router: Router,
}

/// Produces the UI sub-application, or explains why it cannot.
pub trait UiResolver {
    fn resolve(&self, settings: &UiSettings) -> Result<UiApp, ConfigError>;
}

/// The UI compiled into this crate behind the `ui` feature.
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinUi;

#[cfg(feature = "ui")]
impl UiResolver for BuiltinUi {
    fn resolve(&self, settings: &UiSettings) -> Result<UiApp, ConfigError> {
        crate::ui::build(settings)
    }
}

#[cfg(not(feature = "ui"))]
impl UiResolver for BuiltinUi {
    fn resolve(&self, _settings: &UiSettings) -> Result<UiApp, ConfigError> {
        Err(ConfigError::UiUnavailable(
            "this binary was built without the `ui` feature; rebuild with `--features ui` \
             or set `ui.enabled: false`"
                .to_string(),
        ))
    }
}

/// Everything the assembler consumes.
#[derive(Debug)]
pub struct Assembly {
    /// Any order; mounting follows [`FeatureRouter::MOUNT_ORDER`].
    pub routers: Vec<RouterSpec>,
    pub cors: CorsPolicy,
    pub ui: UiSettings,
    /// The global callback sink, installed once for the handle's lifetime.
    pub callbacks: CallbackManager,
    pub services: Arc<ServiceContainer>,
}

/// The assembled application.
#[derive(Debug)]
pub struct ApplicationHandle {
    router: Router,
    mounted: Vec<FeatureRouter>,
    cors: Option<CorsPolicy>,
    ui_path: Option<String>,
    callbacks: Arc<CallbackManager>,
    services: Arc<ServiceContainer>,
}

impl ApplicationHandle {
    /// Feature routers in the order they were mounted.
    pub fn mounted_routers(&self) -> &[FeatureRouter] {
        &self.mounted
    }

    pub fn cors_attached(&self) -> bool {
        self.cors.is_some()
    }

    pub fn cors_policy(&self) -> Option<&CorsPolicy> {
        self.cors.as_ref()
    }

    /// Where the UI is served, if it is.
    pub fn ui_path(&self) -> Option<&str> {
        self.ui_path.as_deref()
    }

    pub fn callbacks(&self) -> &Arc<CallbackManager> {
        &self.callbacks
    }

    pub fn services(&self) -> &Arc<ServiceContainer> {
        &self.services
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn into_router(self) -> Router {
        self.router
    }
}

/// Validate a UI mount path and strip any trailing slash.
pub fn normalize_mount_path(path: &str) -> Result<String, ConfigError> {
    let invalid = |reason| ConfigError::InvalidUiPath {
        path: path.to_string(),
        reason,
    };

    if !path.starts_with('/') {
        return Err(invalid("must start with `/`"));
    }
    if path.contains(['{', '}', '*']) {
        return Err(invalid("must not contain route parameters or wildcards"));
    }
    if path.contains("//") {
        return Err(invalid("must not contain empty segments"));
    }

    let trimmed = path.trim_end_matches('/');
    Ok(if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    })
}

fn mounted_path(mount: &str, path: &str) -> String {
    match (mount, path) {
        ("/", p) => p.to_string(),
        (m, "/") => m.to_string(),
        (m, p) => format!("{m}{p}"),
    }
}

/// Assemble the application. See the module docs for the steps.
pub fn assemble(assembly: Assembly, ui: &dyn UiResolver) -> Result<ApplicationHandle, ConfigError> {
    let Assembly {
        mut routers,
        cors,
        ui: ui_settings,
        callbacks,
        services,
    } = assembly;

    routers.sort_by_key(RouterSpec::feature);
    if let Some(pair) = routers.windows(2).find(|w| w[0].feature() == w[1].feature()) {
        return Err(ConfigError::DuplicateRouter(pair[0].feature().name()));
    }

    let mut table = RouteTable::default();
    for spec in &routers {
        table.claim(spec.feature().name(), spec.paths().iter().map(String::as_str))?;
    }

    // Resolve everything fallible before building anything.
    let cors_layer = if cors.enabled {
        Some(cors.layer()?)
    } else {
        None
    };

    let ui_mount = if ui_settings.enabled {
        let mount = normalize_mount_path(&ui_settings.path)?;
        let ui_app = ui.resolve(&ui_settings)?;
        let full_paths: Vec<String> = ui_app
            .paths
            .iter()
            .map(|p| mounted_path(&mount, p))
            .collect();
        table.claim(UI_OWNER, full_paths.iter().map(String::as_str))?;
        Some((mount, ui_app.router))
    } else {
        None
    };

    let mut app = Router::new();
    let mut mounted = Vec::with_capacity(routers.len());
    for spec in routers {
        let feature = spec.feature();
        info!(
            name: "router.mounted",
            router = feature.name(),
            routes = spec.paths().len(),
            "Router mounted"
        );
        app = app.merge(spec.into_router());
        mounted.push(feature);
    }

    let ui_path = match ui_mount {
        Some((mount, ui_router)) => {
            app = if mount == "/" {
                app.merge(ui_router)
            } else {
                app.nest(&mount, ui_router)
            };
            info!(name: "ui.mounted", path = %mount, "UI mounted");
            Some(mount)
        }
        None => None,
    };

    let callbacks = Arc::new(callbacks);
    info!(
        name: "callbacks.installed",
        handlers = ?callbacks.handler_names(),
        "Global callback handler installed"
    );

    let body_limit = services.settings.ingest.max_upload_bytes;
    let binder = ContextBinder::new(Arc::clone(&services), Arc::clone(&callbacks));
    let mut app = app
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(axum::middleware::from_fn_with_state(
            binder,
            bind_request_context,
        ))
        .layer(TraceLayer::new_for_http());

    if let Some(layer) = cors_layer {
        info!(
            name: "cors.attached",
            origins = ?cors.allow_origins,
            credentials = cors.allow_credentials,
            "CORS middleware attached"
        );
        app = app.layer(layer);
    }

    info!(
        name: "app.assembled",
        routes = table.len(),
        body_limit,
        "Application assembled"
    );

    Ok(ApplicationHandle {
        router: app,
        mounted,
        cors: cors.enabled.then_some(cors),
        ui_path,
        callbacks,
        services,
    })
}
