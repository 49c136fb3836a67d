//! Profile API Handlers
//!
//! HTTP handlers for profile reads, updates and avatar uploads.

use axum::{
    Json,
    body::Bytes,
    extract::{Extension, Path, State},
    http::{HeaderMap, header},
    response::IntoResponse,
};
use tracing::debug;

use crate::{
    api::{app_state::AppState, dto::profile_dto::*},
    error::AppError,
    models::{ImageUpload, ProfileUpdate},
    security::{ValidatedJson, auth::Claims},
};

/// Get the caller's profile
///
/// GET /api/v1/profiles/me
pub async fn get_my_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    debug!("Getting profile for user: {}", claims.sub);

    // 老账号可能没有资料空壳
    let profile = state
        .profile_service
        .ensure_profile(claims.user_id(), claims.email.as_deref(), None)
        .await?;

    Ok(Json(profile))
}

/// Get a profile by user ID
///
/// GET /api/v1/profiles/:id
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    debug!("User {} reading profile {}", claims.sub, id);

    let profile = state
        .profile_service
        .get(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Profile {} not found", id)))?;

    Ok(Json(profile))
}

/// Update the caller's profile
///
/// PUT /api/v1/profiles/me
pub async fn update_my_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ValidatedJson(request): ValidatedJson<UpdateProfileRequest>,
) -> Result<impl IntoResponse, AppError> {
    debug!("Updating profile for user: {}", claims.sub);

    let update = ProfileUpdate::from(request);
    let profile = state
        .profile_service
        .update(claims.user_id(), &update)
        .await?;

    Ok(Json(profile))
}

/// Which required profile fields are still missing
///
/// GET /api/v1/profiles/me/completion
pub async fn get_completion(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let completion = state.profile_service.completion(claims.user_id()).await?;
    Ok(Json(completion))
}

/// Upload a new avatar; the request body is the raw image
///
/// POST /api/v1/profiles/me/avatar
pub async fn upload_avatar(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let Some(subtype) = content_type.strip_prefix("image/") else {
        return Err(AppError::Validation(
            "Avatar must be uploaded with an image/* content type".to_string(),
        ));
    };
    if body.is_empty() {
        return Err(AppError::Validation("Avatar body is empty".to_string()));
    }
    debug!(
        "Uploading {} byte avatar for user: {}",
        body.len(),
        claims.sub
    );

    let extension = match subtype.split(';').next().unwrap_or_default().trim() {
        "jpeg" => "jpg",
        "svg+xml" => "svg",
        other => other,
    };
    let image = ImageUpload::from_file_name(
        &format!("avatar.{}", extension),
        content_type,
        body.to_vec(),
    );
    let profile = state
        .profile_service
        .upload_avatar(claims.user_id(), image)
        .await?;

    Ok(Json(profile))
}

/// Other users the caller could match with
///
/// GET /api/v1/profiles/potential
pub async fn potential_matches(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let profiles = state
        .profile_service
        .potential_matches(claims.user_id())
        .await?;
    Ok(Json(profiles))
}
