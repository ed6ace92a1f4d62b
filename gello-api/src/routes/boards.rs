/// Board endpoints
///
/// Boards belong to exactly one team. Admins see every board; everyone else
/// sees their own team's boards only, and gets 404 for the rest.
///
/// # Endpoints
///
/// - `GET /api/boards` - List visible boards
/// - `POST /api/boards` - Create a board (manager, admin)
/// - `GET /api/boards/:id` - Get a board
/// - `PUT /api/boards/:id` - Update a board (manager, admin)
/// - `DELETE /api/boards/:id` - Delete a board with its lists and tasks (manager, admin)

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{clearable, trimmed, trimmed_option},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use gello_shared::{
    auth::permissions::{
        can_manage_boards, can_view_all_teams, require_capability, require_team_access,
        AuthContext,
    },
    models::board::{Board, CreateBoard, UpdateBoard},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// List boards query
#[derive(Debug, Deserialize)]
pub struct ListBoardsQuery {
    /// Only boards of this team
    pub team_id: Option<Uuid>,
}

/// List boards response
#[derive(Debug, Serialize, Deserialize)]
pub struct ListBoardsResponse {
    pub boards: Vec<Board>,
}

/// Create board request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateBoardRequest {
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    #[validate(length(max = 1000, message = "Description must be at most 1000 characters"))]
    pub description: Option<String>,

    /// Defaults to the caller's team
    pub team_id: Option<Uuid>,
}

/// Update board request
///
/// An empty `description` clears it.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateBoardRequest {
    #[serde(default, deserialize_with = "trimmed_option")]
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,

    #[validate(length(max = 1000, message = "Description must be at most 1000 characters"))]
    pub description: Option<String>,
}

/// Loads a board the caller may see
///
/// Missing and hidden boards both answer 404.
pub(crate) async fn load_board(state: &AppState, auth: &AuthContext, id: Uuid) -> ApiResult<Board> {
    let board = state
        .store
        .find_board(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Board not found".to_string()))?;

    require_team_access(auth, board.team_id)?;

    Ok(board)
}

/// List boards
///
/// Admins may filter by `team_id`; other callers always get their own team's
/// boards, or none without a team.
pub async fn list_boards(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<ListBoardsQuery>,
) -> ApiResult<Json<ListBoardsResponse>> {
    let boards = if can_view_all_teams(&auth.role) {
        state.store.list_boards(query.team_id).await?
    } else {
        match auth.team_id {
            Some(team_id) if query.team_id.map_or(true, |t| t == team_id) => {
                state.store.list_boards(Some(team_id)).await?
            }
            _ => Vec::new(),
        }
    };

    Ok(Json(ListBoardsResponse { boards }))
}

/// Create a board
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed, or no team given and the caller has none
/// - `403 Forbidden`: Role can't manage boards, or the team isn't the caller's
pub async fn create_board(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateBoardRequest>,
) -> ApiResult<(StatusCode, Json<Board>)> {
    req.validate()?;
    require_capability(&auth, can_manage_boards, "manage boards")?;

    let team_id = req
        .team_id
        .or(auth.team_id)
        .ok_or_else(|| ApiError::BadRequest("A team is required to create a board".to_string()))?;

    if !auth.is_admin() && auth.team_id != Some(team_id) {
        return Err(ApiError::Forbidden(
            "Boards can only be created in your own team".to_string(),
        ));
    }

    let board = state
        .store
        .create_board(CreateBoard {
            name: req.name,
            description: clearable(req.description).flatten(),
            team_id,
            created_by: Some(auth.user_id),
        })
        .await?;

    tracing::debug!(board_id = %board.id, team_id = %team_id, "Board created");

    Ok((StatusCode::CREATED, Json(board)))
}

/// Get a board
pub async fn get_board(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Board>> {
    Ok(Json(load_board(&state, &auth, id).await?))
}

/// Update a board
pub async fn update_board(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateBoardRequest>,
) -> ApiResult<Json<Board>> {
    req.validate()?;
    require_capability(&auth, can_manage_boards, "manage boards")?;
    load_board(&state, &auth, id).await?;

    if req.name.is_none() && req.description.is_none() {
        return Err(ApiError::BadRequest("No fields to update".to_string()));
    }

    let board = state
        .store
        .update_board(
            id,
            UpdateBoard {
                name: req.name,
                description: clearable(req.description),
            },
        )
        .await?
        .ok_or_else(|| ApiError::NotFound("Board not found".to_string()))?;

    Ok(Json(board))
}

/// Delete a board
///
/// Lists and tasks on the board go with it. Points already credited stay in
/// the ledger.
pub async fn delete_board(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    require_capability(&auth, can_manage_boards, "manage boards")?;
    load_board(&state, &auth, id).await?;

    if !state.store.delete_board(id).await? {
        return Err(ApiError::NotFound("Board not found".to_string()));
    }

    tracing::info!(board_id = %id, user_id = %auth.user_id, "Board deleted");

    Ok(StatusCode::NO_CONTENT)
}
