//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with every `/api` handler
//! - Wire up middleware (metrics, timeout, body limit, request ID, tracing)
//! - Bind the server to a listener and stop it on shutdown
//! - Drain provisioning workers before returning

use axum::{
    body::Body,
    extract::{DefaultBodyLimit, State},
    http::Request,
    middleware,
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::ForgeConfig;
use crate::http::request::{propagate_request_id_layer, set_request_id_layer, X_REQUEST_ID};
use crate::http::{machine, records};
use crate::lifecycle::wait_for_shutdown;
use crate::observability::metrics;
use crate::provisioning::drivers::dispatcher_from_config;
use crate::provisioning::{ProviderDispatcher, Provisioner, TaskStore};
use crate::records::{MemoryRecordStore, RecordStore};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub provisioner: Arc<Provisioner>,
    pub records: Arc<dyn RecordStore>,
}

/// HTTP server for the provisioning and record APIs.
pub struct HttpServer {
    router: Router,
    config: ForgeConfig,
    state: AppState,
}

impl HttpServer {
    /// Create a server around an explicit dispatcher and record store.
    pub fn new(config: ForgeConfig, dispatcher: ProviderDispatcher, records: Arc<dyn RecordStore>) -> Self {
        let provisioner = Arc::new(Provisioner::new(Arc::new(TaskStore::new()), Arc::new(dispatcher)));
        let state = AppState { provisioner, records };

        let router = Self::build_router(&config, state.clone());
        Self { router, config, state }
    }

    /// Create a server with the configured provider drivers and an in-memory record store.
    pub fn from_config(config: ForgeConfig) -> Self {
        let dispatcher = dispatcher_from_config(&config.providers);
        Self::new(config, dispatcher, Arc::new(MemoryRecordStore::new()))
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ForgeConfig, state: AppState) -> Router {
        let api = Router::new()
            .route("/health", get(health))
            .route("/create-machine", post(machine::create_machine))
            .route("/task-status", get(machine::task_status))
            .route("/rpcs", get(records::list_rpcs).post(records::create_rpc))
            .route("/rpcs/{id}", delete(records::delete_rpc))
            .route("/nodes", get(records::list_nodes).post(records::create_node))
            .route("/nodes/{id}", delete(records::delete_node))
            .route_layer(middleware::from_fn(metrics::track_http));

        Router::new()
            .nest("/api", api)
            .with_state(state)
            .layer(DefaultBodyLimit::disable())
            .layer(
                ServiceBuilder::new()
                    .layer(set_request_id_layer())
                    .layer(TraceLayer::new_for_http().make_span_with(request_span))
                    .layer(propagate_request_id_layer())
                    .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
                    .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs))),
            )
    }

    /// Run the server until `shutdown` fires, then drain provisioning workers.
    pub async fn run(self, listener: TcpListener, shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            cloud_types = ?self.state.provisioner.dispatcher().cloud_types(),
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(wait_for_shutdown(shutdown))
            .await?;

        let grace = Duration::from_secs(self.config.provisioning.drain_timeout_secs);
        let aborted = self.state.provisioner.drain(grace).await;
        tracing::info!(aborted_workers = aborted, "HTTP server stopped");
        Ok(())
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ForgeConfig {
        &self.config
    }
}

/// `GET /api/health`
async fn health(State(state): State<AppState>) -> Json<Value> {
    let store = state.provisioner.store();
    Json(json!({
        "status": "ok",
        "tasks": {
            "total": store.len(),
            "pending": store.pending(),
        }
    }))
}

fn request_span(request: &Request<Body>) -> tracing::Span {
    let request_id = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");
    tracing::info_span!(
        "http_request",
        method = %request.method(),
        uri = %request.uri(),
        request_id = %request_id,
    )
}
