//! Building query endpoint.
//!
//! `GET /api/building` returns the latest reading. Everything else is a
//! JSON 404. All responses carry CORS headers so kiosk pages served from any
//! configured origin can poll the relay.

use super::RelayState;
use crate::config::{ConfigError, BUILDING_FEED_PATH};
use crate::sensor::SensorReading;
use axum::{
    extract::State,
    http::{header, HeaderValue, Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};

/// Body of every 404 response.
#[derive(Debug, Serialize)]
pub struct NotFoundResponse {
    pub message: &'static str,
}

/// GET /api/building
async fn current_building(State(state): State<Arc<RelayState>>) -> Json<SensorReading> {
    Json(state.store().snapshot())
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(NotFoundResponse {
            message: "Not Found",
        }),
    )
}

/// CORS policy for the configured origin; `*` allows any origin.
pub fn cors_layer(origin: &str) -> Result<CorsLayer, ConfigError> {
    let allow_origin = if origin.trim() == "*" {
        AllowOrigin::any()
    } else {
        let value = HeaderValue::from_str(origin.trim()).map_err(|e| ConfigError::Invalid {
            key: "CORS_ORIGIN",
            value: origin.to_string(),
            reason: e.to_string(),
        })?;
        AllowOrigin::exact(value)
    };

    Ok(CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]))
}

/// Router serving the building feed.
pub fn router(state: Arc<RelayState>, cors_origin: &str) -> Result<Router, ConfigError> {
    Ok(Router::new()
        .route(BUILDING_FEED_PATH, get(current_building).fallback(not_found))
        .fallback(not_found)
        .layer(cors_layer(cors_origin)?)
        .with_state(state))
}
