use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use uuid::Uuid;

use crate::{dto::quiz_dto::SessionResponse, error::Result, AppState};

#[utoipa::path(
    post,
    path = "/api/sessions",
    responses(
        (status = 201, description = "Empty quiz session created", body = Json<SessionResponse>),
    )
)]
#[axum::debug_handler]
pub async fn create_session(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let session = state.sessions.create()?;
    Ok((StatusCode::CREATED, Json(SessionResponse::from(&session))))
}

#[utoipa::path(
    get,
    path = "/api/sessions/{id}",
    params(
        ("id" = Uuid, Path, description = "Session ID")
    ),
    responses(
        (status = 200, description = "Session state", body = Json<SessionResponse>),
        (status = 404, description = "Session not found")
    )
)]
#[axum::debug_handler]
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let session = state.sessions.get(id)?;
    Ok(Json(SessionResponse::from(&session)))
}

#[utoipa::path(
    delete,
    path = "/api/sessions/{id}",
    params(
        ("id" = Uuid, Path, description = "Session ID")
    ),
    responses(
        (status = 204, description = "Session destroyed"),
        (status = 404, description = "Session not found")
    )
)]
#[axum::debug_handler]
pub async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    if !state.sessions.delete(id)? {
        return Err(crate::error::Error::NotFound(format!("Session {} not found", id)));
    }
    Ok(StatusCode::NO_CONTENT)
}
