use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::quiz_dto::{
        CreateQuestion, GenerateQuizPayload, GenerateQuizResponse, ReorderPayload, ScorePayload,
        UpdateQuestionPayload,
    },
    error::{Error, Result},
    models::quiz_session::GenerationParams,
    services::grading_service::GradingService,
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/sessions/{id}/generate",
    params(
        ("id" = Uuid, Path, description = "Session ID")
    ),
    request_body = GenerateQuizPayload,
    responses(
        (status = 200, description = "Questions generated, remote or local", body = Json<GenerateQuizResponse>),
        (status = 400, description = "No extracted text on the session"),
        (status = 404, description = "Session not found"),
        (status = 422, description = "Invalid counts or content too thin for any question")
    )
)]
#[axum::debug_handler]
pub async fn generate_quiz(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<GenerateQuizPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let params = GenerationParams::from(&payload);

    let text = state
        .sessions
        .get(id)?
        .extracted
        .map(|e| e.text)
        .ok_or_else(|| {
            Error::BadRequest("Upload a document or paste text before generating a quiz".to_string())
        })?;

    let output = state.quiz_service.generate(&text, &params).await?;
    tracing::info!(
        session_id = %id,
        source = ?output.source,
        count = output.questions.len(),
        "Quiz generated"
    );

    let source = output.source;
    let questions = state.sessions.with_session(id, |session| {
        session
            .replace_questions(output.questions, params.clone(), source)
            .map(<[_]>::to_vec)
    })?;

    Ok(Json(GenerateQuizResponse {
        source,
        requested: params,
        questions,
        logs: output.logs,
    }))
}

#[utoipa::path(
    get,
    path = "/api/sessions/{id}/questions",
    params(
        ("id" = Uuid, Path, description = "Session ID")
    ),
    responses(
        (status = 200, description = "Questions in display order", body = Json<serde_json::Value>),
        (status = 404, description = "Session not found")
    )
)]
#[axum::debug_handler]
pub async fn list_questions(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let session = state.sessions.get(id)?;
    Ok(Json(session.questions))
}

#[utoipa::path(
    post,
    path = "/api/sessions/{id}/questions",
    params(
        ("id" = Uuid, Path, description = "Session ID")
    ),
    request_body = CreateQuestion,
    responses(
        (status = 201, description = "Question appended", body = Json<serde_json::Value>),
        (status = 404, description = "Session not found"),
        (status = 422, description = "Question breaks an invariant")
    )
)]
#[axum::debug_handler]
pub async fn add_question(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CreateQuestion>,
) -> Result<impl IntoResponse> {
    let question = state.sessions.with_session(id, |session| session.add(payload))?;
    Ok((StatusCode::CREATED, Json(question)))
}

#[utoipa::path(
    patch,
    path = "/api/sessions/{id}/questions/{question_id}",
    params(
        ("id" = Uuid, Path, description = "Session ID"),
        ("question_id" = Uuid, Path, description = "Question ID")
    ),
    request_body = UpdateQuestionPayload,
    responses(
        (status = 200, description = "Question updated", body = Json<serde_json::Value>),
        (status = 404, description = "Session or question not found"),
        (status = 422, description = "Edit would break an invariant; nothing was changed")
    )
)]
#[axum::debug_handler]
pub async fn update_question(
    State(state): State<AppState>,
    Path((id, question_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateQuestionPayload>,
) -> Result<impl IntoResponse> {
    let question = state
        .sessions
        .with_session(id, |session| session.update(question_id, payload))?;
    Ok(Json(question))
}

#[utoipa::path(
    delete,
    path = "/api/sessions/{id}/questions/{question_id}",
    params(
        ("id" = Uuid, Path, description = "Session ID"),
        ("question_id" = Uuid, Path, description = "Question ID")
    ),
    responses(
        (status = 204, description = "Question removed, or was already absent"),
        (status = 404, description = "Session not found")
    )
)]
#[axum::debug_handler]
pub async fn delete_question(
    State(state): State<AppState>,
    Path((id, question_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse> {
    let removed = state
        .sessions
        .with_session(id, |session| Ok(session.remove(question_id)))?;
    tracing::debug!(session_id = %id, %question_id, removed, "Question delete");
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    put,
    path = "/api/sessions/{id}/questions/order",
    params(
        ("id" = Uuid, Path, description = "Session ID")
    ),
    request_body = ReorderPayload,
    responses(
        (status = 200, description = "Questions in their new order", body = Json<serde_json::Value>),
        (status = 400, description = "Ids are not a permutation of the session's questions"),
        (status = 404, description = "Session not found")
    )
)]
#[axum::debug_handler]
pub async fn reorder_questions(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReorderPayload>,
) -> Result<impl IntoResponse> {
    let questions = state.sessions.with_session(id, |session| {
        session.reorder(&payload.ids)?;
        Ok(session.list().to_vec())
    })?;
    Ok(Json(questions))
}

#[utoipa::path(
    post,
    path = "/api/sessions/{id}/score",
    params(
        ("id" = Uuid, Path, description = "Session ID")
    ),
    request_body = ScorePayload,
    responses(
        (status = 200, description = "Per-question results and overall grade", body = Json<serde_json::Value>),
        (status = 404, description = "Session not found")
    )
)]
#[axum::debug_handler]
pub async fn score_quiz(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ScorePayload>,
) -> Result<impl IntoResponse> {
    let session = state.sessions.get(id)?;
    let report = GradingService::score(session.list(), &payload.answers);
    tracing::info!(
        session_id = %id,
        correct = report.correct,
        total = report.total,
        "Quiz scored"
    );
    Ok(Json(report))
}
