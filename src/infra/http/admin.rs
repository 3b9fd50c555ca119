use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;

use crate::application::{
    error::HttpError,
    invalidation::{CacheAdminService, describe_keys},
    repos::HealthRepo,
};

use super::{
    db_health_response,
    middleware::{log_responses, set_request_context},
};

#[derive(Clone)]
pub struct AdminState {
    pub cache_admin: Arc<CacheAdminService>,
    pub health: Arc<dyn HealthRepo>,
}

pub fn build_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/_health/db", get(admin_health))
        .route("/cache/clear", post(clear_cache))
        .route("/cache/clear/{identifier}", post(clear_identity))
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

#[derive(Debug, Serialize)]
struct ClearedKeys {
    invalidated: Vec<String>,
}

async fn admin_health(State(state): State<AdminState>) -> Response {
    db_health_response(state.health.ping().await)
}

async fn clear_cache(State(state): State<AdminState>) -> Response {
    match state.cache_admin.invalidate_all().await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => HttpError::from(err).into_response(),
    }
}

async fn clear_identity(
    State(state): State<AdminState>,
    Path(identifier): Path<String>,
) -> Response {
    match state.cache_admin.invalidate_identity(&identifier).await {
        Ok(keys) => Json(ClearedKeys {
            invalidated: describe_keys(&keys),
        })
        .into_response(),
        Err(err) => HttpError::from(err).into_response(),
    }
}
