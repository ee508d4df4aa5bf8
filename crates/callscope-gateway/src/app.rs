use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use callscope_core::CallscopeConfig;
use callscope_ingress::IngressAdapter;

use crate::lifecycle::ConnectionLifecycle;

/// Central shared state — passed as Arc<AppState> to all Axum handlers.
pub struct AppState {
    pub config: CallscopeConfig,
    pub ingress: IngressAdapter,
    pub lifecycle: ConnectionLifecycle,
}

impl AppState {
    pub fn new(
        config: CallscopeConfig,
        ingress: IngressAdapter,
        lifecycle: ConnectionLifecycle,
    ) -> Self {
        Self {
            config,
            ingress,
            lifecycle,
        }
    }
}

/// Assemble the full Axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(crate::http::health::health_handler))
        .route("/ws", get(crate::ws::connection::ws_handler))
        .route("/events", post(crate::http::ingest::ingest_handler))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
