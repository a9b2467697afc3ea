pub mod documents;
pub mod export;
pub mod health;
pub mod quiz;
pub mod sessions;

use axum::{
    routing::{get, patch, post, put},
    Router,
};

use crate::AppState;

pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/remote/status", get(health::remote_status))
        .route("/api/formats", get(health::list_formats))
        .route("/api/sessions", post(sessions::create_session))
        .route(
            "/api/sessions/:id",
            get(sessions::get_session).delete(sessions::delete_session),
        )
        .route("/api/sessions/:id/documents", post(documents::upload_document))
        .route("/api/sessions/:id/text", post(documents::paste_text))
        .route("/api/sessions/:id/generate", post(quiz::generate_quiz))
        .route(
            "/api/sessions/:id/questions",
            get(quiz::list_questions).post(quiz::add_question),
        )
        .route(
            "/api/sessions/:id/questions/order",
            put(quiz::reorder_questions),
        )
        .route(
            "/api/sessions/:id/questions/:question_id",
            patch(quiz::update_question).delete(quiz::delete_question),
        )
        .route("/api/sessions/:id/score", post(quiz::score_quiz))
        .route("/api/sessions/:id/export", get(export::export_quiz))
}
