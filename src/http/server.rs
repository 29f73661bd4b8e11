//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, limits, request ID, timeout)
//! - Serve the storage directory under its public prefix
//! - Bind server to listener and run background tasks (reaper)

use std::sync::Arc;
use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::services::ServeDir;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::ServiceConfig;
use crate::http::request::{request_span, MakeRequestUuidV4};
use crate::http::upload::upload_handler;
use crate::render::{ChromeRenderer, RenderPool, Renderer};
use crate::storage::{Clock, Reaper, RetainedInputs, SystemClock, UploadStore};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<UploadStore>,
    pub pool: Arc<RenderPool>,
    pub retained: Arc<RetainedInputs>,
    pub retain_failed_inputs: bool,
}

/// HTTP server for the conversion service.
pub struct HttpServer {
    router: Router,
    config: ServiceConfig,
    store: Arc<UploadStore>,
    retained: Arc<RetainedInputs>,
}

impl HttpServer {
    /// Create a server rendering with headless Chromium.
    pub fn new(config: ServiceConfig) -> Self {
        let renderer = Arc::new(ChromeRenderer::new(config.renderer.clone()));
        Self::with_parts(config, renderer, Arc::new(SystemClock))
    }

    /// Create a server with a specific renderer and clock.
    pub fn with_parts(
        config: ServiceConfig,
        renderer: Arc<dyn Renderer>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let store = Arc::new(UploadStore::new(config.storage.directory.clone(), clock));
        let pool = Arc::new(RenderPool::from_config(renderer, &config.renderer));
        let retained = Arc::new(RetainedInputs::new());

        let state = AppState {
            store: store.clone(),
            pool,
            retained: retained.clone(),
            retain_failed_inputs: config.storage.retain_failed_inputs,
        };

        let router = Self::build_router(&config, state);
        Self {
            router,
            config,
            store,
            retained,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ServiceConfig, state: AppState) -> Router {
        let prefix = config.storage.public_prefix.trim_end_matches('/');
        let files = ServeDir::new(&config.storage.directory);

        Router::new()
            .route("/upload", post(upload_handler))
            .route("/health", get(health))
            .with_state(state)
            .nest_service(prefix, files)
            .layer(DefaultBodyLimit::max(config.storage.max_upload_bytes))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV4))
                    .layer(TraceLayer::new_for_http().make_span_with(request_span))
                    .layer(PropagateRequestIdLayer::x_request_id()),
            )
    }

    /// Router with all routes and middleware, for serving elsewhere.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Registry of inputs retained after failed conversions.
    pub fn retained(&self) -> Arc<RetainedInputs> {
        self.retained.clone()
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        self.store.ensure_root().await?;

        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            storage = %self.store.root().display(),
            "HTTP server starting"
        );

        let reaper_config = &self.config.storage.reaper;
        if reaper_config.enabled {
            let reaper = Reaper::new(
                self.store.root(),
                self.retained.clone(),
                reaper_config.clone(),
            );
            tokio::spawn(reaper.run(shutdown.resubscribe()));
        }

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
