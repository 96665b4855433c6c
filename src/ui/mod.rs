//! Browser UI.
//!
//! # Structure
//!
//! - [`session`]: per-session state machine (mode, files, selection, sidebar)
//! - [`layout`]: controls, `(control, event) -> transition` bindings, render rules
//! - [`dispatch`]: applies one event to one session
//! - [`store`]: keyed session store
//! - [`mode`] / [`source`]: interaction modes and citation records
//!
//! Pages are rendered server-side with `minijinja` and driven by HTMX.

pub mod dispatch;
pub mod layout;
pub mod mode;
mod routes;
pub mod session;
pub mod source;
pub mod store;

pub use dispatch::{DispatchOutcome, Payload, UiEvent, dispatch};
pub use layout::{Control, LayoutView, UiEventKind};
pub use mode::Mode;
pub use session::{FileBackend, IngestedFile, Selection, UiSession, Upload};
pub use source::Source;

use crate::app::UiApp;
use crate::config::UiSettings;
use crate::error::ConfigError;

/// Build the UI sub-application for mounting at `settings.path`.
pub fn build(settings: &UiSettings) -> Result<UiApp, ConfigError> {
    Ok(UiApp {
        paths: routes::PATHS.iter().map(|p| (*p).to_string()).collect(),
        router: routes::router(settings)?,
    })
}
