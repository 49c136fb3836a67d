//! Match API Handlers

use axum::{
    Json,
    extract::{Extension, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::debug;

use crate::{
    api::{app_state::AppState, dto::match_dto::*},
    error::AppError,
    security::{ValidatedJson, auth::Claims},
};

/// Create a pending match with another user
///
/// POST /api/v1/matches
pub async fn create_match(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ValidatedJson(request): ValidatedJson<CreateMatchRequest>,
) -> Result<impl IntoResponse, AppError> {
    debug!(
        "User {} creating match with {}",
        claims.sub, request.other_user_id
    );

    let created = state
        .match_service
        .create_match(claims.user_id(), &request.other_user_id, request.match_score)
        .await?;

    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/v1/matches
pub async fn list_matches(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let matches = state.match_service.list(claims.user_id()).await?;
    Ok(Json(matches))
}

/// GET /api/v1/matches/favorites
pub async fn list_favorites(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let favorites = state.match_service.favorites(claims.user_id()).await?;
    Ok(Json(favorites))
}

/// POST /api/v1/matches/:id/accept
pub async fn accept_match(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    debug!("User {} accepting match {}", claims.sub, id);
    let updated = state.match_service.accept(claims.user_id(), id).await?;
    Ok(Json(updated))
}

/// POST /api/v1/matches/:id/reject
pub async fn reject_match(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    debug!("User {} rejecting match {}", claims.sub, id);
    let updated = state.match_service.reject(claims.user_id(), id).await?;
    Ok(Json(updated))
}
