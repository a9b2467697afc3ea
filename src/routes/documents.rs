use axum::{
    extract::{Multipart, Path, State},
    response::{IntoResponse, Json},
};
use bytes::Bytes;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::quiz_dto::{ExtractionResponse, PasteTextPayload},
    error::{Error, ExtractionError, Result},
    models::document::{DocumentFormat, SourceDocument},
    services::extract_service::content_stats,
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/sessions/{id}/documents",
    params(
        ("id" = Uuid, Path, description = "Session ID")
    ),
    responses(
        (status = 200, description = "Text extracted and stored on the session", body = Json<ExtractionResponse>),
        (status = 400, description = "Missing file field"),
        (status = 404, description = "Session not found"),
        (status = 422, description = "Unreadable, empty, unsupported or too short")
    )
)]
#[axum::debug_handler]
pub async fn upload_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse> {
    state.sessions.get(id)?;

    let mut file: Option<(String, Bytes)> = None;
    let mut declared_format: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        tracing::error!("Failed to get next field: {}", e);
        Error::BadRequest(e.to_string())
    })? {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let data = field.bytes().await?;
                file = Some((file_name, data));
            }
            "format" => declared_format = Some(field.text().await?),
            _ => {}
        }
    }

    let (file_name, data) =
        file.ok_or_else(|| Error::BadRequest("Multipart field 'file' is required".to_string()))?;

    let format = match declared_format.as_deref().map(str::trim).filter(|f| !f.is_empty()) {
        Some(declared) => DocumentFormat::from_extension(declared)
            .ok_or_else(|| ExtractionError::UnsupportedFormat(declared.to_string()))?,
        None => DocumentFormat::from_file_name(&file_name)
            .ok_or_else(|| ExtractionError::UnsupportedFormat(file_name.clone()))?,
    };

    tracing::info!(session_id = %id, file_name = %file_name, format = format.as_str(), bytes = data.len(), "Document upload received");

    let source = SourceDocument::file(file_name, format, data);
    store_extraction(&state, id, source).await
}

#[utoipa::path(
    post,
    path = "/api/sessions/{id}/text",
    params(
        ("id" = Uuid, Path, description = "Session ID")
    ),
    request_body = PasteTextPayload,
    responses(
        (status = 200, description = "Text stored on the session", body = Json<ExtractionResponse>),
        (status = 404, description = "Session not found"),
        (status = 422, description = "Text is empty or too short")
    )
)]
#[axum::debug_handler]
pub async fn paste_text(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<PasteTextPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    state.sessions.get(id)?;

    let label = payload
        .label
        .filter(|l| !l.trim().is_empty())
        .unwrap_or_else(|| "Pasted text".to_string());
    let source = SourceDocument::pasted(label, payload.text);
    store_extraction(&state, id, source).await
}

async fn store_extraction(
    state: &AppState,
    id: Uuid,
    source: SourceDocument,
) -> Result<Json<ExtractionResponse>> {
    let extractor = state.extract_service.clone();
    let extracted = tokio::task::spawn_blocking(move || extractor.extract(&source))
        .await
        .map_err(|e| Error::Internal(format!("Extraction task failed: {}", e)))??;

    let response = ExtractionResponse::new(&extracted, content_stats(&extracted.text));
    state.sessions.with_session(id, |session| {
        session.set_extracted(extracted);
        Ok(())
    })?;

    Ok(Json(response))
}
