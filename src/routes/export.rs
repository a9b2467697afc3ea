use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
};
use uuid::Uuid;

use crate::{
    dto::quiz_dto::ExportQuery,
    error::Result,
    services::export_service::{ExportFormat, ExportService},
    AppState,
};

/// Download the session's quiz with its answer key.
#[utoipa::path(
    get,
    path = "/api/sessions/{id}/export",
    params(
        ("id" = Uuid, Path, description = "Session ID"),
        ("format" = Option<String>, Query, description = "text (default), docx or xlsx")
    ),
    responses(
        (status = 200, description = "Quiz file"),
        (status = 400, description = "Unknown export format"),
        (status = 404, description = "Session not found")
    )
)]
#[axum::debug_handler]
pub async fn export_quiz(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<ExportQuery>,
) -> Result<impl IntoResponse> {
    let format = ExportFormat::parse(query.format.as_deref())?;
    let session = state.sessions.get(id)?;

    let artifact = tokio::task::spawn_blocking(move || ExportService::export(&session, format))
        .await
        .map_err(|e| crate::error::Error::Internal(format!("Export task failed: {}", e)))??;

    let disposition = format!("attachment; filename=\"{}\"", artifact.file_name);

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, artifact.content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        artifact.bytes,
    ))
}
