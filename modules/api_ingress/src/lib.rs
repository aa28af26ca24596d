use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use arc_swap::ArcSwap;
use axum::{
    extract::DefaultBodyLimit, http::StatusCode, middleware::from_fn, routing::get, Router,
};
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tower_http::{
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
};
use utoipa::openapi::{InfoBuilder, OpenApi, OpenApiBuilder};

mod config;
pub mod request_id;
mod web;

pub use config::ApiIngressConfig;

/// A module that mounts REST routes on the host router and contributes its
/// operations to the OpenAPI document.
pub trait RestfulModule: Send + Sync {
    fn register_rest(&self, router: Router, ingress: &ApiIngress) -> Result<Router>;
}

/// HTTP host: owns the middleware stack, host endpoints and the merged
/// OpenAPI document, and runs the server until shutdown.
pub struct ApiIngress {
    config: ArcSwap<ApiIngressConfig>,
    bind_addr: String,
    request_timeout: Option<Duration>,
    openapi: Mutex<OpenApi>,
}

impl ApiIngress {
    /// `server` supplies the bind address and the request timeout (0 disables it).
    pub fn new(config: ApiIngressConfig, server: &runtime::ServerConfig) -> Self {
        let request_timeout =
            (server.timeout_sec > 0).then(|| Duration::from_secs(server.timeout_sec));
        Self {
            config: ArcSwap::from_pointee(config),
            bind_addr: format!("{}:{}", server.host, server.port),
            request_timeout,
            openapi: Mutex::new(base_openapi()),
        }
    }

    /// Get the current configuration (cheap clone from ArcSwap)
    pub fn get_config(&self) -> ApiIngressConfig {
        (**self.config.load()).clone()
    }

    pub fn bind_addr(&self) -> &str {
        &self.bind_addr
    }

    /// Merge a module's OpenAPI paths and components into the served document.
    pub fn register_openapi(&self, doc: OpenApi) {
        tracing::debug!(paths = doc.paths.paths.len(), "Registered API paths");
        self.openapi.lock().merge(doc);
    }

    pub fn build_openapi(&self) -> OpenApi {
        let doc = self.openapi.lock().clone();
        tracing::info!(
            "Building OpenAPI: found {} registered paths",
            doc.paths.paths.len()
        );
        doc
    }

    /// Build the full router: host endpoints, every module's routes, the
    /// 404 fallback and the middleware stack.
    pub fn build_router(&self, modules: &[&dyn RestfulModule]) -> Result<Router> {
        tracing::debug!("Building router");
        let mut router = Router::new().route("/health", get(web::health_check));

        for module in modules {
            router = module.register_rest(router, self)?;
        }

        let config = self.get_config();
        if config.enable_docs {
            // Serialized once; served as a static document
            let doc = Arc::new(
                serde_json::to_value(self.build_openapi())
                    .context("failed to serialize OpenAPI document")?,
            );
            router = router
                .route(
                    "/openapi.json",
                    get(move || {
                        let doc = doc.clone();
                        async move { web::openapi_json(doc) }
                    }),
                )
                .route("/docs", get(web::serve_docs));
        }

        router = router.fallback(web::not_found);
        Ok(self.apply_middleware(router, &config))
    }

    /// Layers are added innermost first, so the resulting order from the
    /// outside in is: SetRequestId -> PropagateRequestId -> Trace ->
    /// push_req_id_to_extensions -> Timeout -> CORS -> BodyLimit.
    fn apply_middleware(&self, mut router: Router, config: &ApiIngressConfig) -> Router {
        let x_request_id = request_id::header();

        router = router
            .layer(RequestBodyLimitLayer::new(config.body_limit_bytes))
            .layer(DefaultBodyLimit::disable());

        if config.cors_enabled {
            router = router.layer(CorsLayer::permissive());
        }

        if let Some(timeout) = self.request_timeout {
            router = router.layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                timeout,
            ));
        }

        router
            .layer(from_fn(request_id::push_req_id_to_extensions))
            .layer(request_id::create_trace_layer())
            .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
            .layer(SetRequestIdLayer::new(x_request_id, request_id::MakeReqId))
    }

    /// Bind the configured `host:port`; host names are resolved.
    pub async fn bind(&self) -> Result<TcpListener> {
        TcpListener::bind(self.bind_addr.as_str())
            .await
            .with_context(|| format!("failed to bind '{}'", self.bind_addr))
    }

    /// Serve until `shutdown` resolves, then drain in-flight requests.
    pub async fn serve<F>(&self, listener: TcpListener, router: Router, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let local = listener.local_addr()?;
        tracing::info!("HTTP server bound on {}", local);

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await
            .context("HTTP server failed")?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

fn base_openapi() -> OpenApi {
    OpenApiBuilder::new()
        .info(
            InfoBuilder::new()
                .title("Grouper API")
                .version(env!("CARGO_PKG_VERSION"))
                .description(Some("Users, groups and their memberships"))
                .build(),
        )
        .build()
}
