//! Event ingress endpoint — POST /events.
//!
//! The upstream channel boundary: accepts one raw analytics event per
//! request and hands it to the ingress adapter. An event without a
//! discriminant is tolerated and forwarded as a generic notification; only
//! a body that is not JSON at all is rejected.

use axum::{body::Bytes, extract::State, http::StatusCode, Json};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::warn;

use callscope_protocol::EventEnvelope;

use crate::app::AppState;

/// POST /events
///
/// Returns 202 once the event is on the dispatch bus, 400 for non-JSON
/// bodies, 500 when the bus is unavailable.
pub async fn ingest_handler(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)> {
    let raw: Value = serde_json::from_slice(&body).map_err(|e| {
        warn!(error = %e, "invalid JSON in event body");
        (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "invalid JSON body"})),
        )
    })?;

    let envelope = EventEnvelope::from_raw(raw);
    state.ingress.ingest(envelope).await.map_err(|e| {
        warn!(error = %e, "failed to accept event");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": "internal error"})),
        )
    })?;

    Ok((StatusCode::ACCEPTED, Json(json!({"ok": true}))))
}
