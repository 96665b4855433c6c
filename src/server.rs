use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use crate::app::{ApplicationHandle, Assembly, BuiltinUi, UiResolver, assemble};
use crate::config::AppConfig;
use crate::observability::create_global_handler;
use crate::routers::default_routers;
use crate::services::ServiceContainer;

/// Build the application from configuration: services, callback sink, routers, UI.
pub fn build_application(
    config: Arc<AppConfig>,
    ui: &dyn UiResolver,
) -> anyhow::Result<ApplicationHandle> {
    info!(
        name: "llm.config.loaded",
        base_url = %config.llm.base_url,
        model = %config.llm.model,
        embedding_model = %config.llm.embedding_model,
        "LLM configuration loaded"
    );

    let services = Arc::new(
        ServiceContainer::from_config(Arc::clone(&config))
            .context("failed to construct services")?,
    );
    let callbacks = create_global_handler(&config.observability.global_handler)?;

    let handle = assemble(
        Assembly {
            routers: default_routers(),
            cors: config.cors.clone(),
            ui: config.ui.clone(),
            callbacks,
            services,
        },
        ui,
    )?;
    Ok(handle)
}

/// Start the Axum server with the provided configuration.
pub async fn start_server(config: Arc<AppConfig>) -> anyhow::Result<()> {
    let handle = build_application(Arc::clone(&config), &BuiltinUi)?;
    let ui_path = handle.ui_path().map(str::to_string);
    let app = handle.into_router();

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!(
        name: "server.started",
        address = %format!("http://{addr}"),
        ui = ?ui_path,
        "Server started"
    );

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!(name: "server.stopped", "Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}
