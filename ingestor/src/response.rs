use axum::{http::StatusCode, response::IntoResponse, Json};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Envelope shared by every JSON response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
    pub server: String,
    pub timestamp: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Meta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<String>,
}

pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn success<T: Serialize>(
    server: &str,
    status: StatusCode,
    message: &str,
    data: T,
) -> axum::response::Response {
    respond(
        status,
        ApiResponse {
            success: true,
            message: message.to_string(),
            data: Some(data),
            error: None,
            meta: None,
            server: server.to_string(),
            timestamp: now_rfc3339(),
        },
    )
}

pub fn success_with_meta<T: Serialize>(
    server: &str,
    status: StatusCode,
    message: &str,
    data: T,
    meta: Meta,
) -> axum::response::Response {
    respond(
        status,
        ApiResponse {
            success: true,
            message: message.to_string(),
            data: Some(data),
            error: None,
            meta: Some(meta),
            server: server.to_string(),
            timestamp: now_rfc3339(),
        },
    )
}

pub fn failure(
    server: &str,
    status: StatusCode,
    code: &str,
    message: &str,
    details: Option<String>,
) -> axum::response::Response {
    respond::<()>(
        status,
        ApiResponse {
            success: false,
            message: message.to_string(),
            data: None,
            error: Some(ErrorInfo {
                code: code.to_string(),
                message: message.to_string(),
                details,
            }),
            meta: None,
            server: server.to_string(),
            timestamp: now_rfc3339(),
        },
    )
}

fn respond<T: Serialize>(status: StatusCode, body: ApiResponse<T>) -> axum::response::Response {
    (status, Json(body)).into_response()
}
