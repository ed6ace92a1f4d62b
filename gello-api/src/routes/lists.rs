/// List endpoints
///
/// Lists are columns on a board, ordered by `position`. Access follows the
/// board's team.
///
/// # Endpoints
///
/// - `GET /api/lists?board_id=` - Lists of a board
/// - `POST /api/lists` - Create a list (manager, admin)
/// - `GET /api/lists/:id` - Get a list
/// - `PUT /api/lists/:id` - Rename a list (manager, admin)
/// - `DELETE /api/lists/:id` - Delete a list with its tasks (manager, admin)
/// - `PATCH /api/lists/:id/reorder` - Move a list (manager, admin)

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{boards::load_board, trimmed, trimmed_option},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use gello_shared::{
    auth::permissions::{can_manage_lists, require_capability, AuthContext},
    models::{
        board::Board,
        list::{CreateList, List},
        MAX_POSITION,
    },
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize)]
pub struct ListListsQuery {
    pub board_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListListsResponse {
    pub lists: Vec<List>,
}

/// Create list request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateListRequest {
    pub board_id: Uuid,

    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    /// Defaults to the end of the board
    #[validate(range(min = 0, max = MAX_POSITION, message = "Position must be between 0 and 1000000"))]
    pub position: Option<i32>,
}

/// Rename list request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateListRequest {
    #[serde(default, deserialize_with = "trimmed_option")]
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,
}

/// Reorder list request
#[derive(Debug, Deserialize, Validate)]
pub struct ReorderListRequest {
    #[validate(range(min = 0, max = MAX_POSITION, message = "Position must be between 0 and 1000000"))]
    pub position: i32,
}

/// Loads a list and its board, checking the caller may see the board
pub(crate) async fn load_list(
    state: &AppState,
    auth: &AuthContext,
    id: Uuid,
) -> ApiResult<(List, Board)> {
    let list = state
        .store
        .find_list(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("List not found".to_string()))?;

    let board = load_board(state, auth, list.board_id).await?;

    Ok((list, board))
}

/// Lists of a board, by position
pub async fn list_lists(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<ListListsQuery>,
) -> ApiResult<Json<ListListsResponse>> {
    load_board(&state, &auth, query.board_id).await?;

    let lists = state.store.list_lists(query.board_id).await?;

    Ok(Json(ListListsResponse { lists }))
}

/// Create a list
pub async fn create_list(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateListRequest>,
) -> ApiResult<(StatusCode, Json<List>)> {
    req.validate()?;
    require_capability(&auth, can_manage_lists, "manage lists")?;
    load_board(&state, &auth, req.board_id).await?;

    let list = state
        .store
        .create_list(CreateList {
            board_id: req.board_id,
            name: req.name,
            position: req.position,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(list)))
}

/// Get a list
pub async fn get_list(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<List>> {
    let (list, _) = load_list(&state, &auth, id).await?;
    Ok(Json(list))
}

/// Rename a list
pub async fn update_list(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateListRequest>,
) -> ApiResult<Json<List>> {
    req.validate()?;
    require_capability(&auth, can_manage_lists, "manage lists")?;
    load_list(&state, &auth, id).await?;

    let name = req
        .name
        .ok_or_else(|| ApiError::BadRequest("No fields to update".to_string()))?;

    let list = state
        .store
        .rename_list(id, &name)
        .await?
        .ok_or_else(|| ApiError::NotFound("List not found".to_string()))?;

    Ok(Json(list))
}

/// Delete a list and its tasks
pub async fn delete_list(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    require_capability(&auth, can_manage_lists, "manage lists")?;
    load_list(&state, &auth, id).await?;

    if !state.store.delete_list(id).await? {
        return Err(ApiError::NotFound("List not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Move a list to another position on its board
pub async fn reorder_list(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<ReorderListRequest>,
) -> ApiResult<Json<List>> {
    req.validate()?;
    require_capability(&auth, can_manage_lists, "manage lists")?;
    load_list(&state, &auth, id).await?;

    let list = state
        .store
        .reorder_list(id, req.position)
        .await?
        .ok_or_else(|| ApiError::NotFound("List not found".to_string()))?;

    Ok(Json(list))
}
