//! REST exposure: liveness endpoints for load balancers

use axum::{Json, Router, routing::get};
use chrono::Utc;
use serde_json::{Value, json};

/// REST API exposure implementation
///
/// Only health checks live here; relaying happens on the WebSocket exposure.
pub struct RestExposure;

impl RestExposure {
    /// Build the REST router
    ///
    /// # Arguments
    ///
    /// * `custom_routes` - Additional custom routes to merge
    pub fn build_router(custom_routes: Vec<Router>) -> Router {
        let mut app = Self::health_routes();

        for custom_router in custom_routes {
            app = app.merge(custom_router);
        }

        app
    }

    /// Build health check routes
    fn health_routes() -> Router {
        Router::new()
            .route("/health", get(Self::health_check))
            .route("/healthz", get(Self::health_check))
    }

    /// Health check endpoint handler
    async fn health_check() -> Json<Value> {
        Json(json!({
            "status": "healthy",
            "timestamp": Utc::now().to_rfc3339(),
        }))
    }
}
