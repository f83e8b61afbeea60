use axum::{extract::State, http::header, http::StatusCode, response::IntoResponse, Json};
use tracing::error;
use utoipa::OpenApi;

use super::{
    dto::{ErrorDto, StoreDto, TemperatureDto},
    errors::AppError,
    AppState,
};
use crate::{
    health::{ReadinessStatus, ReadinessVerdict},
    temperature::TemperatureStatus,
};

// ---------------------------------------------------------------------------
// Temperature
// ---------------------------------------------------------------------------

/// Average temperature across all senseBoxes, served from cache when fresh.
#[utoipa::path(
    get,
    path = "/temperature",
    responses(
        (status = 200, description = "Aggregate temperature and its band", body = TemperatureDto),
        (status = 404, description = "No temperature sensor reported a value", body = ErrorDto),
        (status = 500, description = "openSenseMap unavailable or returned bad data", body = ErrorDto),
    ),
    tag = "temperature"
)]
pub async fn get_temperature(State(state): State<AppState>) -> Result<Json<TemperatureDto>, AppError> {
    let t = state.temperature.current().await?;
    Ok(Json(t.into()))
}

/// Read the current temperature and write one snapshot immediately.
///
/// Snapshot failures are logged and reported as `object_name: null`.
#[utoipa::path(
    get,
    path = "/store",
    responses(
        (status = 200, description = "Temperature read; snapshot attempted", body = StoreDto),
        (status = 404, description = "No temperature sensor reported a value", body = ErrorDto),
        (status = 500, description = "openSenseMap unavailable or returned bad data", body = ErrorDto),
    ),
    tag = "temperature"
)]
pub async fn store_temperature(State(state): State<AppState>) -> Result<Json<StoreDto>, AppError> {
    let t = state.temperature.current().await?;
    let object_name = match state.snapshots.write(t.value).await {
        Ok(name) => Some(name),
        Err(e) => {
            error!(error = %e, "Direct snapshot write failed");
            None
        }
    };
    Ok(Json(StoreDto { temperature: t.value, object_name }))
}

// ---------------------------------------------------------------------------
// System
// ---------------------------------------------------------------------------

/// `200` when the cache is fresh or most senseBoxes are reachable, `503` otherwise.
#[utoipa::path(
    get,
    path = "/readyz",
    responses(
        (status = 200, description = "Application is ready", body = ReadinessVerdict),
        (status = 503, description = "Upstream unhealthy or check failed", body = ReadinessVerdict),
    ),
    tag = "system"
)]
pub async fn readyz(State(state): State<AppState>) -> (StatusCode, Json<ReadinessVerdict>) {
    let verdict = state.readiness.evaluate().await;
    (verdict.http_status(), Json(verdict))
}

/// Prometheus text exposition.
#[utoipa::path(
    get,
    path = "/metrics",
    responses(
        (status = 200, description = "Prometheus metrics", content_type = "text/plain"),
    ),
    tag = "system"
)]
pub async fn metrics(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let body = state.metrics.render()?;
    Ok(([(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)], body))
}

/// Application version.
#[utoipa::path(
    get,
    path = "/version",
    responses(
        (status = 200, description = "Semantic version", body = String),
    ),
    tag = "system"
)]
pub async fn version() -> Json<&'static str> {
    Json(env!("CARGO_PKG_VERSION"))
}

/// Returns `200 OK` with `{"status":"ok"}` when the server is running.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is alive"),
    ),
    tag = "system"
)]
pub async fn health() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({ "status": "ok" }))
}

// ---------------------------------------------------------------------------
// OpenAPI spec
// ---------------------------------------------------------------------------

#[derive(OpenApi)]
#[openapi(
    paths(get_temperature, store_temperature, readyz, metrics, version, health),
    components(schemas(
        TemperatureDto,
        TemperatureStatus,
        StoreDto,
        ErrorDto,
        ReadinessVerdict,
        ReadinessStatus
    )),
    tags(
        (name = "temperature", description = "Aggregate senseBox temperature"),
        (name = "system",      description = "Operational endpoints"),
    ),
    info(
        title = "senseBox Temperature API",
        version = "0.0.1",
        description = "Average ambient temperature from openSenseMap"
    )
)]
pub struct ApiDoc;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use axum_test::TestServer;
    use serde_json::{json, Value};

    use crate::{
        api::{router, AppState},
        cache::{MemoryStore, TemperatureCache},
        health::{AvailabilitySampler, ReadinessEvaluator},
        metrics::Metrics,
        storage::SnapshotWriter,
        temperature::TemperatureService,
        test_support::{box_with, FakeSource, RecordingStore},
    };

    const TTL: Duration = Duration::from_secs(300);

    struct Fixture {
        server: TestServer,
        source: Arc<FakeSource>,
        cache: TemperatureCache,
        store: Arc<RecordingStore>,
    }

    fn fixture(source: FakeSource, store: RecordingStore) -> Fixture {
        let source = Arc::new(source);
        let store = Arc::new(store);
        let metrics = Metrics::new().unwrap();
        let cache = TemperatureCache::new(Arc::new(MemoryStore::new()), TTL);
        let state = AppState {
            temperature: TemperatureService::new(source.clone(), cache.clone(), metrics.clone()),
            readiness: ReadinessEvaluator::new(
                cache.clone(),
                AvailabilitySampler::new(source.clone(), 4),
            ),
            snapshots: SnapshotWriter::new(store.clone(), "temperature-data"),
            metrics,
        };
        Fixture {
            server: TestServer::new(router(state)).unwrap(),
            source,
            cache,
            store,
        }
    }

    // -----------------------------------------------------------------------
    // GET /temperature
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn temperature_cache_hit_skips_upstream() {
        let f = fixture(FakeSource::with_boxes(vec![box_with("a", &["99"])]), RecordingStore::default());
        f.cache.put(20).await.unwrap();

        let resp = f.server.get("/temperature").await;
        resp.assert_status_ok();
        let body: Value = resp.json();
        assert_eq!(body, json!({ "temperature": 20, "status": "Good" }));
        assert_eq!(f.source.fetch_calls(), 0);
    }

    #[tokio::test]
    async fn temperature_cache_miss_fetches_and_caches() {
        let f = fixture(FakeSource::with_boxes(vec![box_with("a", &["20"])]), RecordingStore::default());

        let resp = f.server.get("/temperature").await;
        resp.assert_status_ok();
        let body: Value = resp.json();
        assert_eq!(body, json!({ "temperature": 20, "status": "Good" }));
        assert_eq!(f.cache.get().await.unwrap(), Some(20));
    }

    #[tokio::test]
    async fn temperature_without_sensors_is_404() {
        let f = fixture(FakeSource::with_boxes(vec![]), RecordingStore::default());

        let resp = f.server.get("/temperature").await;
        resp.assert_status(axum::http::StatusCode::NOT_FOUND);
        let body: Value = resp.json();
        assert_eq!(body["detail"], "No temperature data found");
    }

    #[tokio::test]
    async fn temperature_upstream_failure_is_500() {
        let f = fixture(FakeSource::unavailable("connection refused"), RecordingStore::default());

        let resp = f.server.get("/temperature").await;
        resp.assert_status(axum::http::StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = resp.json();
        assert!(body["detail"].as_str().unwrap().contains("connection refused"));
    }

    // -----------------------------------------------------------------------
    // GET /store
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn store_writes_snapshot() {
        let f = fixture(FakeSource::with_boxes(vec![box_with("a", &["7"])]), RecordingStore::default());

        let resp = f.server.get("/store").await;
        resp.assert_status_ok();
        let body: Value = resp.json();
        assert_eq!(body["temperature"], 7);

        let objects = f.store.objects();
        assert_eq!(objects.len(), 1);
        assert_eq!(body["object_name"], objects[0].1.as_str());
    }

    #[tokio::test]
    async fn store_swallows_snapshot_failure() {
        let f = fixture(FakeSource::with_boxes(vec![box_with("a", &["7"])]), RecordingStore::failing());

        let resp = f.server.get("/store").await;
        resp.assert_status_ok();
        let body: Value = resp.json();
        assert_eq!(body["temperature"], 7);
        assert!(body["object_name"].is_null());
        assert_eq!(f.store.put_calls(), 1);
    }

    // -----------------------------------------------------------------------
    // GET /readyz
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn readyz_ready_when_boxes_reachable() {
        let f = fixture(FakeSource::fleet(10, 0), RecordingStore::default());

        let resp = f.server.get("/readyz").await;
        resp.assert_status_ok();
        let body: Value = resp.json();
        assert_eq!(body, json!({ "status": "ready", "message": "Application is ready" }));
    }

    #[tokio::test]
    async fn readyz_unavailable_when_majority_down() {
        let f = fixture(FakeSource::fleet(10, 6), RecordingStore::default());

        let resp = f.server.get("/readyz").await;
        resp.assert_status(axum::http::StatusCode::SERVICE_UNAVAILABLE);
        let body: Value = resp.json();
        assert_eq!(body["status"], "unavailable");
        assert!(body["message"].as_str().unwrap().contains("50%"));
    }

    #[tokio::test]
    async fn readyz_error_when_no_boxes() {
        let f = fixture(FakeSource::with_boxes(vec![]), RecordingStore::default());

        let resp = f.server.get("/readyz").await;
        resp.assert_status(axum::http::StatusCode::SERVICE_UNAVAILABLE);
        let body: Value = resp.json();
        assert_eq!(body, json!({ "status": "error", "message": "No senseBoxes found" }));
    }

    // -----------------------------------------------------------------------
    // GET /metrics, /version, /health, /api-docs/openapi.json
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn metrics_reflect_cache_activity() {
        let f = fixture(FakeSource::with_boxes(vec![box_with("a", &["20"])]), RecordingStore::default());
        f.server.get("/temperature").await.assert_status_ok();
        f.server.get("/temperature").await.assert_status_ok();

        let resp = f.server.get("/metrics").await;
        resp.assert_status_ok();
        let text = resp.text();
        assert!(text.contains("cache_miss_total 1"));
        assert!(text.contains("cache_hit_total 1"));
        assert!(text.contains("api_response_time_seconds_count 1"));
    }

    #[tokio::test]
    async fn version_returns_package_version() {
        let f = fixture(FakeSource::fleet(1, 0), RecordingStore::default());
        let resp = f.server.get("/version").await;
        resp.assert_status_ok();
        let body: Value = resp.json();
        assert_eq!(body, json!("0.0.1"));
    }

    #[tokio::test]
    async fn health_returns_ok() {
        let f = fixture(FakeSource::fleet(1, 0), RecordingStore::default());
        let resp = f.server.get("/health").await;
        resp.assert_status_ok();
        let body: Value = resp.json();
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn openapi_spec_is_served() {
        let f = fixture(FakeSource::fleet(1, 0), RecordingStore::default());
        let resp = f.server.get("/api-docs/openapi.json").await;
        resp.assert_status_ok();
        let body: Value = resp.json();
        assert_eq!(body["info"]["title"], "senseBox Temperature API");
        assert!(body["paths"]["/readyz"].is_object());
    }
}
