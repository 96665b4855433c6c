//! ragdesk server.
//!
//! Entry point for the local document chat application.

use std::sync::Arc;

use mimalloc::MiMalloc;

/// Global allocator for improved performance (M-MIMALLOC-APPS).
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use ragdesk::config::AppConfig;
use ragdesk::{server, telemetry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env (if present)
    let _ = dotenvy::dotenv();

    telemetry::init();

    let config = Arc::new(AppConfig::load()?);
    server::start_server(config).await
}
