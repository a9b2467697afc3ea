use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::{
    models::document::DocumentFormat,
    services::extract_service::{is_format_available, ExtractService},
    AppState,
};

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is up", body = Json<serde_json::Value>),
    ),
)]
#[axum::debug_handler]
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let body = json!({
        "status": "ok",
        "remote_configured": state.quiz_service.remote().is_configured(),
    });
    (StatusCode::OK, Json(body))
}

#[utoipa::path(
    get,
    path = "/api/remote/status",
    responses(
        (status = 200, description = "Remote generator connection check", body = Json<serde_json::Value>),
    ),
)]
#[axum::debug_handler]
pub async fn remote_status(State(state): State<AppState>) -> impl IntoResponse {
    let remote = state.quiz_service.remote();
    if !remote.is_configured() {
        return Json(json!({ "configured": false, "reachable": false }));
    }

    let check = tokio::time::timeout(remote.timeout(), remote.ping()).await;
    let (reachable, error) = match check {
        Ok(Ok(())) => (true, None),
        Ok(Err(e)) => (false, Some(e.to_string())),
        Err(_) => (false, Some(format!("timed out after {} seconds", remote.timeout().as_secs()))),
    };
    if let Some(error) = &error {
        tracing::warn!(%error, "Remote connection check failed");
    }

    Json(json!({
        "configured": true,
        "reachable": reachable,
        "model": remote.model(),
        "error": error,
    }))
}

#[utoipa::path(
    get,
    path = "/api/formats",
    responses(
        (status = 200, description = "Upload formats and whether this build can read them", body = Json<serde_json::Value>),
    ),
)]
#[axum::debug_handler]
pub async fn list_formats(State(state): State<AppState>) -> impl IntoResponse {
    let formats: Vec<_> = DocumentFormat::ALL
        .into_iter()
        .map(|f| {
            json!({
                "format": f.as_str(),
                "label": f.label(),
                "available": is_format_available(f),
            })
        })
        .collect();
    Json(json!({
        "formats": formats,
        "supported": ExtractService::supported_formats(),
        "min_content_length": state.extract_service.min_content_length(),
    }))
}
