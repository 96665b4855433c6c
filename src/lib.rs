//! ragdesk
//!
//! A local retrieval-augmented chat server: an HTTP API assembled from
//! independent feature routers, plus an optional browser UI for document
//! ingestion and chat in four modes.
//!
//! # Modules
//!
//! - [`app`]: application assembly, request context binding, CORS policy
//! - [`routers`]: default feature routers (completions, chat, chunks, ingest,
//!   summarize, embeddings, health)
//! - [`services`]: document store, LLM and embedding collaborators
//! - [`observability`]: global callback sink
//! - [`config`]: layered configuration
//! - `ui` (feature `ui`): session state machine, layout bindings, HTML surface

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::default_trait_access)]
#![allow(clippy::unused_async)]

pub mod app;
pub mod config;
pub mod error;
pub mod observability;
pub mod routers;
pub mod server;
pub mod services;
pub mod telemetry;
#[cfg(feature = "ui")]
pub mod ui;
