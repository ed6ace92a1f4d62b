/// Task endpoints
///
/// Tasks sit in a list on a board; access follows the board's team.
/// Managers and admins create, edit, assign and move tasks. Only the assignee
/// completes a task, which credits its story points exactly once.
///
/// # Endpoints
///
/// - `GET /api/tasks?list_id=` - Tasks of a list
/// - `POST /api/tasks` - Create a task
/// - `GET /api/tasks/:id` - Get a task
/// - `PUT|PATCH /api/tasks/:id` - Partial update
/// - `DELETE /api/tasks/:id` - Delete a task
/// - `PATCH /api/tasks/:id/assign` - Set or clear the assignee
/// - `PATCH /api/tasks/:id/move` - Move to another list
/// - `PATCH /api/tasks/:id/complete` - Complete and credit points

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{clearable, double_option, lists::load_list, trimmed, trimmed_option},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use gello_shared::{
    auth::permissions::{can_manage_tasks, require_assignee, require_capability, AuthContext},
    models::{
        board::Board,
        list::List,
        task::{CompletionOutcome, CreateTask, Task, UpdateTask},
        MAX_POSITION,
    },
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Largest story-point estimate
pub const MAX_STORY_POINTS: i32 = 1000;

#[derive(Debug, Deserialize)]
pub struct ListTasksQuery {
    pub list_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListTasksResponse {
    pub tasks: Vec<Task>,
}

/// Create task request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaskRequest {
    pub list_id: Uuid,

    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,

    #[validate(length(max = 5000, message = "Description must be at most 5000 characters"))]
    pub description: Option<String>,

    #[validate(range(min = 0, max = MAX_STORY_POINTS, message = "Story points must be between 0 and 1000"))]
    pub story_points: Option<i32>,

    /// Must be a member of the board's team
    pub assigned_to: Option<Uuid>,

    #[validate(range(min = 0, max = MAX_POSITION, message = "Position must be between 0 and 1000000"))]
    pub position: Option<i32>,

    pub due_date: Option<DateTime<Utc>>,
}

/// Partial task update
///
/// An empty `description` clears it; `"due_date": null` clears the due date.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTaskRequest {
    #[serde(default, deserialize_with = "trimmed_option")]
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: Option<String>,

    #[validate(length(max = 5000, message = "Description must be at most 5000 characters"))]
    pub description: Option<String>,

    #[validate(range(min = 0, max = MAX_STORY_POINTS, message = "Story points must be between 0 and 1000"))]
    pub story_points: Option<i32>,

    #[validate(range(min = 0, max = MAX_POSITION, message = "Position must be between 0 and 1000000"))]
    pub position: Option<i32>,

    #[serde(default, deserialize_with = "double_option")]
    pub due_date: Option<Option<DateTime<Utc>>>,
}

/// Assign request; `null` unassigns
#[derive(Debug, Deserialize)]
pub struct AssignTaskRequest {
    #[serde(default)]
    pub assigned_to: Option<Uuid>,
}

/// Move request
#[derive(Debug, Deserialize, Validate)]
pub struct MoveTaskRequest {
    pub list_id: Uuid,

    /// Defaults to the end of the target list
    #[validate(range(min = 0, max = MAX_POSITION, message = "Position must be between 0 and 1000000"))]
    pub position: Option<i32>,
}

/// Completion response
#[derive(Debug, Serialize, Deserialize)]
pub struct CompleteTaskResponse {
    pub task: Task,

    /// Points credited by this call (0 on repeat calls)
    pub points_awarded: i64,

    /// Assignee's balance after the call
    pub total_points: i64,

    /// True when the task was completed before this call
    pub already_completed: bool,
}

fn not_found() -> ApiError {
    ApiError::NotFound("Task not found".to_string())
}

/// Loads a task with its list and board, checking the caller may see the board
async fn load_task(
    state: &AppState,
    auth: &AuthContext,
    id: Uuid,
) -> ApiResult<(Task, List, Board)> {
    let task = state.store.find_task(id).await?.ok_or_else(not_found)?;
    let (list, board) = load_list(state, auth, task.list_id).await?;

    Ok((task, list, board))
}

/// Checks that `user_id` may be given tasks on `board`
async fn check_assignee(state: &AppState, board: &Board, user_id: Uuid) -> ApiResult<()> {
    let user = state
        .store
        .find_user(user_id)
        .await?
        .ok_or_else(|| ApiError::invalid_field("assigned_to", "Assignee does not exist"))?;

    if user.team_id != Some(board.team_id) {
        return Err(ApiError::invalid_field(
            "assigned_to",
            "Assignee must be a member of the board's team",
        ));
    }

    Ok(())
}

/// Tasks of a list, by position
pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<ListTasksQuery>,
) -> ApiResult<Json<ListTasksResponse>> {
    load_list(&state, &auth, query.list_id).await?;

    let tasks = state.store.list_tasks(query.list_id).await?;

    Ok(Json(ListTasksResponse { tasks }))
}

/// Create a task
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed or assignee outside the team
/// - `403 Forbidden`: Role can't manage tasks
/// - `404 Not Found`: List missing or on another team's board
pub async fn create_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    req.validate()?;
    require_capability(&auth, can_manage_tasks, "manage tasks")?;

    let (_, board) = load_list(&state, &auth, req.list_id).await?;

    if let Some(assignee) = req.assigned_to {
        check_assignee(&state, &board, assignee).await?;
    }

    let task = state
        .store
        .create_task(CreateTask {
            list_id: req.list_id,
            title: req.title,
            description: clearable(req.description).flatten(),
            story_points: req.story_points.unwrap_or(0),
            assigned_to: req.assigned_to,
            position: req.position,
            due_date: req.due_date,
            created_by: Some(auth.user_id),
        })
        .await?;

    tracing::debug!(task_id = %task.id, list_id = %task.list_id, "Task created");

    Ok((StatusCode::CREATED, Json(task)))
}

/// Get a task
pub async fn get_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Task>> {
    let (task, _, _) = load_task(&state, &auth, id).await?;
    Ok(Json(task))
}

/// Partially update a task
///
/// Story points of a completed task are frozen: they've already been
/// credited.
pub async fn update_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateTaskRequest>,
) -> ApiResult<Json<Task>> {
    req.validate()?;
    require_capability(&auth, can_manage_tasks, "manage tasks")?;

    let (task, _, _) = load_task(&state, &auth, id).await?;

    if task.is_completed() && req.story_points.is_some_and(|p| p != task.story_points) {
        return Err(ApiError::BadRequest(
            "Story points of a completed task cannot be changed".to_string(),
        ));
    }

    let update = UpdateTask {
        title: req.title,
        description: clearable(req.description),
        story_points: req.story_points,
        position: req.position,
        due_date: req.due_date,
    };

    if update.is_empty() {
        return Err(ApiError::BadRequest("No fields to update".to_string()));
    }

    let task = state.store.update_task(id, update).await?.ok_or_else(not_found)?;

    Ok(Json(task))
}

/// Delete a task
pub async fn delete_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    require_capability(&auth, can_manage_tasks, "manage tasks")?;
    load_task(&state, &auth, id).await?;

    if !state.store.delete_task(id).await? {
        return Err(not_found());
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Set or clear a task's assignee
///
/// Completed tasks keep the assignee that was credited.
pub async fn assign_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<AssignTaskRequest>,
) -> ApiResult<Json<Task>> {
    require_capability(&auth, can_manage_tasks, "manage tasks")?;

    let (task, _, board) = load_task(&state, &auth, id).await?;

    if task.is_completed() {
        return Err(ApiError::BadRequest(
            "A completed task cannot be reassigned".to_string(),
        ));
    }

    if let Some(assignee) = req.assigned_to {
        check_assignee(&state, &board, assignee).await?;
    }

    let task = state
        .store
        .assign_task(id, req.assigned_to)
        .await?
        .ok_or_else(not_found)?;

    tracing::debug!(task_id = %id, assigned_to = ?task.assigned_to, "Task assigned");

    Ok(Json(task))
}

/// Move a task to another list of the same team
pub async fn move_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<MoveTaskRequest>,
) -> ApiResult<Json<Task>> {
    req.validate()?;
    require_capability(&auth, can_manage_tasks, "manage tasks")?;

    let (_, _, source_board) = load_task(&state, &auth, id).await?;
    let (_, target_board) = load_list(&state, &auth, req.list_id).await?;

    if target_board.team_id != source_board.team_id {
        return Err(ApiError::BadRequest(
            "Tasks can only move between boards of the same team".to_string(),
        ));
    }

    let task = state
        .store
        .move_task(id, req.list_id, req.position)
        .await?
        .ok_or_else(not_found)?;

    Ok(Json(task))
}

/// Complete a task and credit its story points to the assignee
///
/// # Endpoint
///
/// ```text
/// PATCH /api/tasks/:id/complete
/// ```
///
/// # Response
///
/// ```json
/// {
///   "task": { "id": "uuid", "completed_at": "2025-01-03T12:00:00Z", ... },
///   "points_awarded": 5,
///   "total_points": 42,
///   "already_completed": false
/// }
/// ```
///
/// Repeat calls answer 200 with `points_awarded: 0` and the original
/// `completed_at`. Concurrent calls credit the points once.
///
/// # Errors
///
/// - `400 Bad Request`: Task has no assignee
/// - `403 Forbidden`: Caller isn't the assignee (managers and admins included)
/// - `404 Not Found`: Task doesn't exist
pub async fn complete_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<CompleteTaskResponse>> {
    let task = state.store.find_task(id).await?.ok_or_else(not_found)?;
    let assignee = require_assignee(&auth, &task)?;

    let outcome = state
        .store
        .complete_task(id, assignee)
        .await?
        .ok_or_else(not_found)?;

    let response = match outcome {
        CompletionOutcome::Completed {
            task,
            points_awarded,
            total_points,
        } => {
            tracing::info!(
                task_id = %task.id,
                user_id = %assignee,
                points_awarded,
                total_points,
                "Task completed"
            );

            CompleteTaskResponse {
                task,
                points_awarded,
                total_points,
                already_completed: false,
            }
        }
        CompletionOutcome::AlreadyCompleted { task } => {
            let total_points = state
                .store
                .find_user(assignee)
                .await?
                .map(|user| user.total_points)
                .unwrap_or_default();

            CompleteTaskResponse {
                task,
                points_awarded: 0,
                total_points,
                already_completed: true,
            }
        }
        CompletionOutcome::AssigneeMismatch { .. } => {
            return Err(ApiError::Forbidden(
                "Only the assigned user can complete this task".to_string(),
            ));
        }
    };

    Ok(Json(response))
}
