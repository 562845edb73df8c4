//! Origin allow-listing for HTTP and WebSocket clients

use axum::http::header::ORIGIN;
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue, Method};
use std::sync::Arc;
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};

/// Origins accepted by the relay, matched by prefix
///
/// Requests without an `Origin` header (native clients, curl) are allowed.
#[derive(Debug, Clone, Default)]
pub struct OriginPolicy {
    prefixes: Vec<String>,
}

impl OriginPolicy {
    pub fn new(prefixes: Vec<String>) -> Self {
        Self { prefixes }
    }

    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    /// Whether a request with this `Origin` value may proceed
    pub fn allows(&self, origin: Option<&str>) -> bool {
        match origin {
            None => true,
            Some(origin) => self.prefixes.iter().any(|p| origin.starts_with(p.as_str())),
        }
    }

    /// Check the `Origin` header of a request
    ///
    /// A header that is not valid UTF-8 is refused.
    pub fn allows_headers(&self, headers: &HeaderMap) -> bool {
        match headers.get(ORIGIN) {
            None => true,
            Some(value) => value.to_str().is_ok_and(|origin| self.allows(Some(origin))),
        }
    }

    /// CORS layer answering preflights for allowed origins, with credentials
    pub fn cors_layer(self: &Arc<Self>) -> CorsLayer {
        let policy = Arc::clone(self);

        CorsLayer::new()
            .allow_origin(AllowOrigin::predicate(
                move |origin: &HeaderValue, _parts: &Parts| {
                    let allowed = origin
                        .to_str()
                        .is_ok_and(|origin| policy.allows(Some(origin)));
                    if !allowed {
                        tracing::info!(origin = ?origin, "CORS blocked origin");
                    }
                    allowed
                },
            ))
            .allow_methods([
                Method::GET,
                Method::HEAD,
                Method::PUT,
                Method::PATCH,
                Method::POST,
                Method::DELETE,
            ])
            .allow_headers(AllowHeaders::mirror_request())
            .allow_credentials(true)
    }
}
