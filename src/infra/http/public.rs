use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;

use crate::application::{
    capes::{CapeDetail, CapeService, CapeView},
    content::{CacheMode, ContentService},
    descriptor::DescriptorService,
    error::{HttpError, Missing, ResolveError},
    repos::HealthRepo,
};
use crate::domain::{entities::CapeRecord, identifier::classify};

use super::{
    content::content_response,
    db_health_response,
    middleware::{log_responses, set_request_context},
};

#[derive(Clone)]
pub struct HttpState {
    pub capes: Arc<CapeService>,
    pub content: Arc<ContentService>,
    pub descriptors: Arc<DescriptorService>,
    pub health: Arc<dyn HealthRepo>,
}

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/_health/db", get(public_health))
        .route("/file/{file_id}", get(serve_file))
        .route("/cape/byid/{cape_id}", get(uploaded_texture))
        .route("/cape/byid/{cape_id}/render", get(uploaded_render))
        .route("/cape/byuser/{identifier}", get(equipped_texture))
        .route("/cape/byuser/{identifier}/render", get(equipped_render))
        .route("/{identifier}", get(describe))
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DeliveryQuery {
    bypass_cache: bool,
}

impl DeliveryQuery {
    fn mode(&self) -> CacheMode {
        CacheMode::from_bypass_flag(self.bypass_cache)
    }
}

async fn public_health(State(state): State<HttpState>) -> Response {
    db_health_response(state.health.ping().await)
}

async fn serve_file(
    State(state): State<HttpState>,
    Path(file_id): Path<String>,
    Query(query): Query<DeliveryQuery>,
) -> Response {
    deliver(&state, &file_id, query.mode()).await
}

async fn uploaded_texture(
    State(state): State<HttpState>,
    Path(cape_id): Path<String>,
    Query(query): Query<DeliveryQuery>,
) -> Response {
    match state.capes.resolve_uploaded_cape(&cape_id).await {
        Ok(record) => deliver(&state, &record.texture, query.mode()).await,
        Err(err) => HttpError::from(err).into_response(),
    }
}

async fn uploaded_render(
    State(state): State<HttpState>,
    Path(cape_id): Path<String>,
    Query(query): Query<DeliveryQuery>,
) -> Response {
    let render = state
        .capes
        .resolve_uploaded_cape(&cape_id)
        .await
        .and_then(render_file);
    match render {
        Ok(file_id) => deliver(&state, &file_id, query.mode()).await,
        Err(err) => HttpError::from(err).into_response(),
    }
}

async fn equipped_texture(
    State(state): State<HttpState>,
    Path(identifier): Path<String>,
    Query(query): Query<DeliveryQuery>,
) -> Response {
    let texture = match classify(&identifier) {
        Ok(id) => state
            .capes
            .resolve_cape(&id, CapeDetail::TextureOnly)
            .await
            .map(CapeView::into_texture),
        Err(err) => Err(err.into()),
    };
    match texture {
        Ok(file_id) => deliver(&state, &file_id, query.mode()).await,
        Err(err) => HttpError::from(err).into_response(),
    }
}

async fn equipped_render(
    State(state): State<HttpState>,
    Path(identifier): Path<String>,
    Query(query): Query<DeliveryQuery>,
) -> Response {
    let render = match classify(&identifier) {
        Ok(id) => state
            .capes
            .resolve_full(&id)
            .await
            .and_then(|cape| render_file(cape.record)),
        Err(err) => Err(err.into()),
    };
    match render {
        Ok(file_id) => deliver(&state, &file_id, query.mode()).await,
        Err(err) => HttpError::from(err).into_response(),
    }
}

async fn describe(State(state): State<HttpState>, Path(identifier): Path<String>) -> Response {
    let descriptor = match classify(descriptor_identifier(&identifier)) {
        Ok(id) => state.descriptors.describe(&id).await,
        Err(err) => Err(err.into()),
    };
    match descriptor {
        Ok(descriptor) => Json(descriptor).into_response(),
        Err(err) => HttpError::from(err).into_response(),
    }
}

async fn deliver(state: &HttpState, file_id: &str, mode: CacheMode) -> Response {
    match state.content.deliver(file_id, mode).await {
        Ok(payload) => content_response(payload),
        Err(err) => HttpError::from(err).into_response(),
    }
}

fn render_file(record: CapeRecord) -> Result<String, ResolveError> {
    record.render.ok_or(ResolveError::NotFound(Missing::File))
}

/// Drops a `.json` suffix from the already-decoded path segment.
fn descriptor_identifier(segment: &str) -> &str {
    segment.strip_suffix(".json").unwrap_or(segment)
}
