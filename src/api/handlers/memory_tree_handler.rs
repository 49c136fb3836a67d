//! Memory Tree API Handlers
//!
//! 回忆树按两人配对懒创建；分支和回忆只允许树的参与者写入。

use axum::{
    Json,
    extract::{Extension, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::debug;

use crate::{
    api::{app_state::AppState, dto::memory_tree_dto::*},
    error::AppError,
    security::{ValidatedJson, auth::Claims},
};

/// Get or create the tree shared with another user
///
/// GET /api/v1/memory-trees/:user_id
pub async fn open_tree(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(other_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    debug!("User {} opening memory tree with {}", claims.sub, other_id);
    let tree = state
        .memory_tree_service
        .open(claims.user_id(), &other_id)
        .await?;
    Ok(Json(tree))
}

/// POST /api/v1/memory-trees/:tree_id/branches
pub async fn add_branch(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(tree_id): Path<String>,
    ValidatedJson(request): ValidatedJson<AddBranchRequest>,
) -> Result<impl IntoResponse, AppError> {
    let branch = state
        .memory_tree_service
        .add_branch(claims.user_id(), &tree_id, &request.name)
        .await?;
    Ok((StatusCode::CREATED, Json(branch)))
}

/// POST /api/v1/memory-trees/:tree_id/branches/:branch_id/memories
pub async fn add_memory(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((tree_id, branch_id)): Path<(String, String)>,
    ValidatedJson(request): ValidatedJson<AddMemoryRequest>,
) -> Result<impl IntoResponse, AppError> {
    debug!(
        "User {} adding memory to {}/{}",
        claims.sub, tree_id, branch_id
    );

    let memory = request.into_new_memory()?;
    let saved = state
        .memory_tree_service
        .add_memory(claims.user_id(), &tree_id, &branch_id, memory)
        .await?;

    Ok((StatusCode::CREATED, Json(saved)))
}
