//! Mountable feature routers and route collision detection.

use std::collections::BTreeMap;
use std::fmt;

use axum::{Router, routing::MethodRouter};
use serde::Serialize;

use crate::error::ConfigError;

/// The fixed set of feature routers, declared in mount order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureRouter {
    Completions,
    Chat,
    Chunks,
    Ingest,
    Summarize,
    Embeddings,
    Health,
}

impl FeatureRouter {
    pub const MOUNT_ORDER: [Self; 7] = [
        Self::Completions,
        Self::Chat,
        Self::Chunks,
        Self::Ingest,
        Self::Summarize,
        Self::Embeddings,
        Self::Health,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Completions => "completions",
            Self::Chat => "chat",
            Self::Chunks => "chunks",
            Self::Ingest => "ingest",
            Self::Summarize => "summarize",
            Self::Embeddings => "embeddings",
            Self::Health => "health",
        }
    }
}

impl fmt::Display for FeatureRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A feature router together with the paths it declares.
///
/// Paths are recorded as routes are added so that collisions can be detected
/// before anything is merged.
#[derive(Debug)]
pub struct RouterSpec {
    feature: FeatureRouter,
    paths: Vec<String>,
    router: Router,
}

impl RouterSpec {
    pub fn new(feature: FeatureRouter) -> Self {
        Self {
            feature,
            paths: Vec::new(),
            router: Router::new(),
        }
    }

    /// Add a route. Each path may be given once per router; chain methods on the
    /// `MethodRouter` instead of repeating the path.
    #[must_use]
    pub fn route(mut self, path: &str, method_router: MethodRouter) -> Self {
        self.paths.push(path.to_string());
        self.router = self.router.route(path, method_router);
        self
    }

    pub fn feature(&self) -> FeatureRouter {
        self.feature
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    pub(crate) fn into_router(self) -> Router {
        self.router
    }
}

/// Reduce `{param}` segments to `{}` so that `/a/{id}` and `/a/{doc}` compare equal.
pub fn normalize_path(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if segment.starts_with('{') && segment.ends_with('}') {
                if segment.starts_with("{*") { "{*}" } else { "{}" }
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Tracks which mount unit owns each normalized path.
#[derive(Debug, Default)]
pub struct RouteTable {
    owners: BTreeMap<String, String>,
}

impl RouteTable {
    /// Record `paths` for `owner`, failing on the first path already taken by
    /// a different owner.
    pub fn claim<'a>(
        &mut self,
        owner: &str,
        paths: impl IntoIterator<Item = &'a str>,
    ) -> Result<(), ConfigError> {
        for path in paths {
            let key = normalize_path(path);
            match self.owners.get(&key) {
                Some(first) if first != owner => {
                    return Err(ConfigError::RouteCollision {
                        path: path.to_string(),
                        first: first.clone(),
                        second: owner.to_string(),
                    });
                }
                Some(_) => {}
                None => {
                    self.owners.insert(key, owner.to_string());
                }
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mount_order_matches_enum_order() {
        let mut sorted = FeatureRouter::MOUNT_ORDER;
        sorted.sort();
        assert_eq!(sorted, FeatureRouter::MOUNT_ORDER);
    }

    #[test]
    fn parameter_names_do_not_matter_for_collisions() {
        assert_eq!(
            normalize_path("/v1/ingest/{doc_id}"),
            normalize_path("/v1/ingest/{id}")
        );
        assert_ne!(
            normalize_path("/v1/ingest/list"),
            normalize_path("/v1/ingest/{id}")
        );
    }

    #[test]
    fn claiming_a_taken_path_reports_both_owners() {
        let mut table = RouteTable::default();
        table.claim("health", ["/health"]).unwrap();
        let err = table.claim("chat", ["/v1/chat", "/health"]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::RouteCollision { ref first, ref second, .. }
                if first == "health" && second == "chat"
        ));
    }

    #[test]
    fn same_owner_may_repeat_a_path() {
        let mut table = RouteTable::default();
        table.claim("ingest", ["/v1/ingest", "/v1/ingest"]).unwrap();
        assert_eq!(table.len(), 1);
    }
}
