use crate::auth::{require_bearer, ApiKeyAuth};
use crate::config::Config;
use crate::errors::Error;
use crate::metrics::{self, BATCHES_TOTAL, KNOWN_DEVICES, READINGS_TOTAL, VALIDATION_FAILURES_TOTAL};
use crate::model::{BatchPayload, BatchReceipt, ReadingPayload};
use crate::query::DeviceQueries;
use crate::response::{self, Meta};
use crate::store::TelemetryStore;
use crate::validate::{validate_batch, validate_reading};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<TelemetryStore>,
    pub queries: DeviceQueries,
    pub auth: ApiKeyAuth,
    pub server_name: Arc<str>,
    pub environment: Arc<str>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: &Config, store: Arc<TelemetryStore>) -> Self {
        Self {
            queries: DeviceQueries::new(store.clone()),
            store,
            auth: ApiKeyAuth::new(&config.api_key),
            server_name: Arc::from(config.server_name.as_str()),
            environment: Arc::from(config.environment.as_str()),
            started_at: Instant::now(),
        }
    }

    /// Wraps an error so it renders with this server's envelope.
    pub fn reject(&self, error: Error) -> AppError {
        AppError {
            server: self.server_name.clone(),
            error,
        }
    }

    fn refresh_device_gauge(&self) {
        KNOWN_DEVICES.set(self.store.device_count() as f64);
    }
}

pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/sensor-data", post(receive_reading))
        .route("/sensor-data/batch", post(receive_batch))
        .route("/devices", get(list_devices))
        .route("/devices/:device_id/latest", get(latest_reading))
        .route("/devices/:device_id/status", get(device_status))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_bearer));

    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics_handler))
        .nest("/api/v1", api)
        .fallback(not_found)
        .layer(
            TraceLayer::new_for_http().make_span_with(|req: &axum::http::Request<_>| {
                let request_id = req
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");
                tracing::info_span!(
                    "http",
                    %request_id,
                    method = %req.method(),
                    uri = %req.uri(),
                )
            }),
        )
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .with_state(state)
}

async fn receive_reading(
    State(state): State<AppState>,
    payload: Result<Json<ReadingPayload>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(payload) = payload.map_err(|e| {
        warn!("Failed to parse sensor data JSON: {}", e.body_text());
        state.reject(Error::InvalidJson(e.body_text()))
    })?;

    let reading = validate_reading(payload, state.store.now()).map_err(|e| {
        VALIDATION_FAILURES_TOTAL.inc();
        warn!(error = %e, "sensor data validation failed");
        state.reject(e)
    })?;

    state.store.store_reading(reading.clone()).map_err(|e| {
        error!(device_id = %reading.device_id, error = %e, "failed to store sensor reading");
        state.reject(e)
    })?;
    READINGS_TOTAL.inc();
    state.refresh_device_gauge();

    info!(
        device_id = %reading.device_id,
        temperature = reading.temperature,
        humidity = reading.humidity,
        timestamp = %reading.timestamp,
        "sensor data received"
    );

    Ok(response::success(
        &state.server_name,
        StatusCode::CREATED,
        "Sensor data received successfully",
        reading,
    ))
}

async fn receive_batch(
    State(state): State<AppState>,
    payload: Result<Json<BatchPayload>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(payload) = payload.map_err(|e| {
        warn!("Failed to parse batch sensor data JSON: {}", e.body_text());
        state.reject(Error::InvalidJson(e.body_text()))
    })?;

    let batch = validate_batch(payload, state.store.now()).map_err(|e| {
        VALIDATION_FAILURES_TOTAL.inc();
        warn!(error = %e, "batch sensor data validation failed");
        state.reject(e)
    })?;

    let device_id = batch.device_id;
    let count = batch.readings.len();
    state
        .store
        .store_batch(&device_id, batch.readings)
        .map_err(|e| {
            error!(device_id = %device_id, error = %e, "failed to store batch readings");
            state.reject(e)
        })?;
    READINGS_TOTAL.inc_by(count as f64);
    BATCHES_TOTAL.inc();
    state.refresh_device_gauge();

    info!(device_id = %device_id, readings_count = count, "batch sensor data received");

    Ok(response::success_with_meta(
        &state.server_name,
        StatusCode::CREATED,
        "Batch data processed successfully",
        BatchReceipt {
            device_id,
            readings_saved: count,
        },
        Meta {
            count: Some(count),
            processed_at: Some(response::now_rfc3339()),
            ..Default::default()
        },
    ))
}

async fn latest_reading(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
) -> Result<Response, AppError> {
    let reading = state
        .queries
        .latest_reading(&device_id)
        .map_err(|e| state.reject(e))?;

    info!(device_id = %device_id, "latest reading retrieved");
    Ok(response::success(
        &state.server_name,
        StatusCode::OK,
        "Latest reading retrieved successfully",
        reading,
    ))
}

async fn device_status(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
) -> Result<Response, AppError> {
    let status = state
        .queries
        .device_status(&device_id)
        .map_err(|e| state.reject(e))?;

    info!(device_id = %device_id, status = %status.status, "device status retrieved");
    Ok(response::success(
        &state.server_name,
        StatusCode::OK,
        "Device status retrieved successfully",
        status,
    ))
}

async fn list_devices(State(state): State<AppState>) -> Response {
    let mut devices = state.queries.all_devices();
    devices.sort_by(|a, b| a.device_id.cmp(&b.device_id));
    let total = devices.len();

    info!(devices = total, "device list retrieved");
    response::success_with_meta(
        &state.server_name,
        StatusCode::OK,
        "Devices retrieved successfully",
        devices,
        Meta {
            count: Some(total),
            total: Some(total),
            ..Default::default()
        },
    )
}

#[derive(Debug, Serialize)]
struct HealthData {
    status: &'static str,
    version: &'static str,
    uptime: String,
    environment: String,
    system: SystemInfo,
}

#[derive(Debug, Serialize)]
struct SystemInfo {
    os: &'static str,
    arch: &'static str,
}

async fn health(State(state): State<AppState>) -> Response {
    let data = HealthData {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        uptime: format_uptime(state.started_at.elapsed().as_secs()),
        environment: state.environment.to_string(),
        system: SystemInfo {
            os: std::env::consts::OS,
            arch: std::env::consts::ARCH,
        },
    };
    response::success(
        &state.server_name,
        StatusCode::OK,
        "Sensor ingestor is healthy",
        data,
    )
}

async fn metrics_handler() -> String {
    metrics::gather_metrics()
}

async fn not_found(State(state): State<AppState>) -> Response {
    response::failure(
        &state.server_name,
        StatusCode::NOT_FOUND,
        "NOT_FOUND",
        "Resource not found",
        None,
    )
}

fn format_uptime(total_secs: u64) -> String {
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    if hours > 0 {
        format!("{}h{}m{}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m{}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

pub struct AppError {
    server: Arc<str>,
    error: Error,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message, details) = match &self.error {
            Error::Validation(violations) => (
                StatusCode::BAD_REQUEST,
                "Validation failed",
                Some(violations.join("; ")),
            ),
            Error::InvalidJson(reason) => (
                StatusCode::BAD_REQUEST,
                "Invalid request data",
                Some(format!("Invalid JSON format: {}", reason)),
            ),
            Error::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "Valid Bearer token required",
                Some("Authorization header must contain 'Bearer <token>'".to_string()),
            ),
            Error::DeviceNotFound(device_id) => {
                warn!(device_id = %device_id, "device not found");
                (
                    StatusCode::NOT_FOUND,
                    "Resource not found",
                    Some(format!("Device: {}", device_id)),
                )
            }
            Error::Internal(_) | Error::Config(_) => {
                error!("API error: {}", self.error);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error",
                    Some("Failed to process request".to_string()),
                )
            }
        };

        response::failure(&self.server, status, self.error.code(), message, details)
    }
}
