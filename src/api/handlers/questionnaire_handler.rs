//! Questionnaire API Handlers

use axum::{
    Json,
    extract::{Extension, State},
    response::IntoResponse,
};
use tracing::debug;

use crate::{
    api::{app_state::AppState, dto::questionnaire_dto::*},
    error::AppError,
    security::{ValidatedJson, auth::Claims},
};

/// GET /api/v1/questions
pub async fn list_questions(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let questions = state.questionnaire_service.questions().await?;
    Ok(Json(questions))
}

/// GET /api/v1/questionnaire/answers
pub async fn get_answers(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let answers = state.questionnaire_service.answers(claims.user_id()).await?;
    Ok(Json(answers))
}

/// Save answers, overwriting earlier answers to the same question
///
/// PUT /api/v1/questionnaire/answers
pub async fn save_answers(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ValidatedJson(request): ValidatedJson<SaveAnswersRequest>,
) -> Result<impl IntoResponse, AppError> {
    debug!(
        "Saving {} answers for user: {}",
        request.answers.len(),
        claims.sub
    );

    let saved = state
        .questionnaire_service
        .save_answers(claims.user_id(), &request.answers)
        .await?;

    Ok(Json(saved))
}

/// GET /api/v1/questionnaire/status
pub async fn get_status(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let status = state.questionnaire_service.status(claims.user_id()).await?;
    Ok(Json(QuestionnaireStatusResponse::from(status)))
}
