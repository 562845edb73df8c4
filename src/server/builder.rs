//! ServerBuilder for fluent API to build the relay server

use super::exposure::{RestExposure, WebSocketExposure};
use super::host::RelayHost;
use crate::config::RelayConfig;
use crate::core::LinkRegistry;
use anyhow::Result;
use axum::Router;
use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{Request, header::ORIGIN};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::{Level, Span};

/// Builder for the relay HTTP + WebSocket server
///
/// # Example
///
/// ```ignore
/// ServerBuilder::new()
///     .with_config(RelayConfig::load()?)
///     .with_registry(InMemoryLinkRegistry::new())
///     .serve()
///     .await?;
/// ```
pub struct ServerBuilder {
    config: RelayConfig,
    registry: Option<Arc<dyn LinkRegistry>>,
    custom_routes: Vec<Router>,
}

impl ServerBuilder {
    /// Create a new ServerBuilder with the default configuration
    pub fn new() -> Self {
        Self {
            config: RelayConfig::default(),
            registry: None,
            custom_routes: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: RelayConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the link registry (required)
    pub fn with_registry(mut self, registry: impl LinkRegistry + 'static) -> Self {
        self.registry = Some(Arc::new(registry));
        self
    }

    /// Add custom routes next to `/health` and `/ws`
    pub fn with_custom_routes(mut self, routes: Router) -> Self {
        self.custom_routes.push(routes);
        self
    }

    /// Build the transport-agnostic host
    pub fn build_host(mut self) -> Result<RelayHost> {
        let registry = self
            .registry
            .take()
            .ok_or_else(|| anyhow::anyhow!("LinkRegistry is required. Call .with_registry()"))?;

        RelayHost::from_builder_components(self.config, registry)
    }

    /// Build the final router
    ///
    /// Health routes, the `/ws` relay endpoint and custom routes, behind the
    /// CORS and request tracing layers.
    pub fn build(mut self) -> Result<Router> {
        let custom_routes = std::mem::take(&mut self.custom_routes);
        let host = Arc::new(self.build_host()?);
        Self::router_for(host, custom_routes)
    }

    fn router_for(host: Arc<RelayHost>, custom_routes: Vec<Router>) -> Result<Router> {
        let cors = host.origins.cors_layer();

        let app = RestExposure::build_router(custom_routes)
            .merge(WebSocketExposure::build_router(host)?)
            .layer(cors)
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(request_span)
                    .on_request(DefaultOnRequest::new().level(Level::INFO))
                    .on_response(DefaultOnResponse::new().level(Level::INFO)),
            );

        Ok(app)
    }

    /// Serve on the configured address with graceful shutdown
    pub async fn serve(mut self) -> Result<()> {
        let custom_routes = std::mem::take(&mut self.custom_routes);
        let host = Arc::new(self.build_host()?);
        let addr = host.config.bind_address();
        let app = Self::router_for(host, custom_routes)?;

        let listener = TcpListener::bind(&addr).await?;

        tracing::info!("Listening on {}", listener.local_addr()?);

        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Span for one HTTP request, also covering WebSocket upgrades
fn request_span(request: &Request<Body>) -> Span {
    tracing::info_span!(
        "http_request",
        method = %request.method(),
        uri = %request.uri(),
        origin = ?request.headers().get(ORIGIN),
        remote = ?request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|info| info.0),
    )
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal, initiating graceful shutdown...");
        },
    }
}
