//! Cross-origin policy and its `tower-http` layer.

use axum::http::{HeaderName, HeaderValue, Method, request::Parts};
use regex::Regex;
use serde::Deserialize;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};

use crate::error::ConfigError;

const WILDCARD: &str = "*";

/// `cors.*` settings, read once at assembly.
///
/// Field semantics follow the usual browser-facing CORS knobs: `*` in a list
/// means "any". Combined with `allow_credentials`, a wildcard is answered by
/// echoing the request's own origin, method or headers, since browsers reject
/// a literal `*` on credentialed requests.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct CorsPolicy {
    pub enabled: bool,
    pub allow_credentials: bool,
    pub allow_origins: Vec<String>,
    /// Matched against the whole `Origin` header value.
    pub allow_origin_regex: Option<String>,
    pub allow_methods: Vec<String>,
    pub allow_headers: Vec<String>,
}

impl Default for CorsPolicy {
    fn default() -> Self {
        Self {
            enabled: false,
            allow_credentials: false,
            allow_origins: Vec::new(),
            allow_origin_regex: None,
            allow_methods: vec!["GET".to_string()],
            allow_headers: Vec::new(),
        }
    }
}

impl CorsPolicy {
    /// Policy that permits every origin, method and header.
    #[must_use]
    pub fn permissive() -> Self {
        Self {
            enabled: true,
            allow_credentials: false,
            allow_origins: vec![WILDCARD.to_string()],
            allow_origin_regex: None,
            allow_methods: vec![WILDCARD.to_string()],
            allow_headers: vec![WILDCARD.to_string()],
        }
    }

    /// Build the middleware layer. Fails on any field that does not parse.
    pub fn layer(&self) -> Result<CorsLayer, ConfigError> {
        Ok(CorsLayer::new()
            .allow_origin(self.origins()?)
            .allow_methods(self.methods()?)
            .allow_headers(self.headers()?)
            .allow_credentials(self.allow_credentials))
    }

    fn origins(&self) -> Result<AllowOrigin, ConfigError> {
        if is_wildcard(&self.allow_origins) {
            return Ok(if self.allow_credentials {
                AllowOrigin::mirror_request()
            } else {
                AllowOrigin::any()
            });
        }

        let listed = self
            .allow_origins
            .iter()
            .map(|origin| {
                HeaderValue::from_str(origin)
                    .map_err(|e| ConfigError::MalformedCors(format!("origin `{origin}`: {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let Some(pattern) = &self.allow_origin_regex else {
            return Ok(AllowOrigin::list(listed));
        };

        let regex = Regex::new(&format!("^(?:{pattern})$")).map_err(|e| {
            ConfigError::MalformedCors(format!("allow_origin_regex `{pattern}`: {e}"))
        })?;

        Ok(AllowOrigin::predicate(move |origin: &HeaderValue, _: &Parts| {
            listed.contains(origin) || origin.to_str().is_ok_and(|value| regex.is_match(value))
        }))
    }

    fn methods(&self) -> Result<AllowMethods, ConfigError> {
        if is_wildcard(&self.allow_methods) {
            return Ok(if self.allow_credentials {
                AllowMethods::mirror_request()
            } else {
                AllowMethods::any()
            });
        }

        let methods = self
            .allow_methods
            .iter()
            .map(|method| {
                Method::from_bytes(method.to_ascii_uppercase().as_bytes())
                    .map_err(|e| ConfigError::MalformedCors(format!("method `{method}`: {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(AllowMethods::list(methods))
    }

    fn headers(&self) -> Result<AllowHeaders, ConfigError> {
        if is_wildcard(&self.allow_headers) {
            return Ok(if self.allow_credentials {
                AllowHeaders::mirror_request()
            } else {
                AllowHeaders::any()
            });
        }

        let headers = self
            .allow_headers
            .iter()
            .map(|header| {
                HeaderName::from_bytes(header.as_bytes())
                    .map_err(|e| ConfigError::MalformedCors(format!("header `{header}`: {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(AllowHeaders::list(headers))
    }
}

fn is_wildcard(values: &[String]) -> bool {
    values.iter().any(|v| v == WILDCARD)
}
