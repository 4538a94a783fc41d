/// Task CRUD endpoints
///
/// Every handler runs behind the JWT middleware and scopes its queries to the
/// caller's account, resolved fresh from the store on each request. A task id
/// belonging to another account behaves exactly like a missing task.
///
/// # Endpoints
///
/// - `GET    /v1/tasks` - List the caller's tasks
/// - `POST   /v1/tasks` - Create a task
/// - `GET    /v1/tasks/:id` - Fetch one task
/// - `PUT    /v1/tasks/:id` - Replace a task
/// - `PATCH  /v1/tasks/:id` - Update provided fields only
/// - `DELETE /v1/tasks/:id` - Delete a task
use crate::{
    app::{AppState, AuthContext},
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use taskhive_shared::db::tasks::{CreateTask, PatchTask, ReplaceTask, Task};

/// Resolves the caller's owner id from the authenticated username
///
/// The token can outlive the account, so a vanished credential is a 401.
async fn owner_id(state: &AppState, ctx: &AuthContext) -> ApiResult<i64> {
    let credential = state.auth.resolve_account(&ctx.username).await?;
    Ok(credential.id)
}

/// List the caller's tasks, newest first
pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> ApiResult<Json<Vec<Task>>> {
    let owner = owner_id(&state, &ctx).await?;
    let tasks = Task::list(&state.db, owner).await?;
    Ok(Json(tasks))
}

/// Create a task for the caller
///
/// # Errors
///
/// - `401 Unauthorized`: Missing or invalid token
/// - `500 Internal Server Error`: Server error
pub async fn create_task(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Json(req): Json<CreateTask>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    let owner = owner_id(&state, &ctx).await?;
    let task = Task::create(&state.db, owner, req).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

/// Fetch one of the caller's tasks
///
/// # Errors
///
/// - `404 Not Found`: Task does not exist or belongs to someone else
pub async fn get_task(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(task_id): Path<i64>,
) -> ApiResult<Json<Task>> {
    let owner = owner_id(&state, &ctx).await?;
    let task = Task::find(&state.db, owner, task_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;
    Ok(Json(task))
}

/// Replace every mutable field of a task (PUT semantics)
///
/// # Errors
///
/// - `404 Not Found`: Task does not exist or belongs to someone else
pub async fn replace_task(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(task_id): Path<i64>,
    Json(req): Json<ReplaceTask>,
) -> ApiResult<Json<Task>> {
    let owner = owner_id(&state, &ctx).await?;
    let task = Task::replace(&state.db, owner, task_id, req)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;
    Ok(Json(task))
}

/// Update only the provided fields of a task (PATCH semantics)
///
/// # Errors
///
/// - `404 Not Found`: Task does not exist or belongs to someone else
pub async fn patch_task(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(task_id): Path<i64>,
    Json(req): Json<PatchTask>,
) -> ApiResult<Json<Task>> {
    let owner = owner_id(&state, &ctx).await?;
    let task = Task::patch(&state.db, owner, task_id, req)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;
    Ok(Json(task))
}

/// Delete one of the caller's tasks
///
/// # Errors
///
/// - `404 Not Found`: Task does not exist or belongs to someone else
pub async fn delete_task(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(task_id): Path<i64>,
) -> ApiResult<StatusCode> {
    let owner = owner_id(&state, &ctx).await?;
    let deleted = Task::delete(&state.db, owner, task_id).await?;

    if !deleted {
        return Err(ApiError::NotFound("Task not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}
