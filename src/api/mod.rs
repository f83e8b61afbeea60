pub mod dto;
pub mod errors;
pub mod handlers;

use axum::{routing::get, Router};
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;

use handlers::ApiDoc;

use crate::{
    health::ReadinessEvaluator, metrics::Metrics, storage::SnapshotWriter,
    temperature::TemperatureService,
};

/// Everything a request handler may touch. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub temperature: TemperatureService,
    pub readiness: ReadinessEvaluator,
    pub snapshots: SnapshotWriter,
    pub metrics: Metrics,
}

pub fn router(state: AppState) -> Router {
    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .route("/temperature", get(handlers::get_temperature))
        .route("/store", get(handlers::store_temperature))
        .route("/readyz", get(handlers::readyz))
        .route("/metrics", get(handlers::metrics))
        .with_state(state)
        .split_for_parts();

    router
        .route("/version", get(handlers::version))
        .route("/health", get(handlers::health))
        .route(
            "/api-docs/openapi.json",
            get(move || async move { axum::Json(api) }),
        )
}
