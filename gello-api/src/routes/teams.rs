/// Team endpoints
///
/// Any user can list teams and join one (a user is in at most one team).
/// Managers manage their own team; admins manage every team.
///
/// # Endpoints
///
/// - `GET /api/teams` - All teams
/// - `POST /api/teams` - Create a team (manager, admin)
/// - `GET /api/teams/:id` - Team with members
/// - `PUT /api/teams/:id` - Rename
/// - `DELETE /api/teams/:id` - Delete with its boards
/// - `POST /api/teams/:id/join` - Join (or switch to) a team
/// - `POST /api/teams/:id/members` - Add a user
/// - `DELETE /api/teams/:id/members/:user_id` - Remove a user

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{trimmed, trimmed_option},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use gello_shared::{
    auth::permissions::{can_manage_team, require_capability, require_team_management, AuthContext},
    models::{
        team::{CreateTeam, Team, UpdateTeam},
        user::User,
    },
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize)]
pub struct ListTeamsResponse {
    pub teams: Vec<Team>,
}

/// Team with its members
#[derive(Debug, Serialize, Deserialize)]
pub struct TeamDetailResponse {
    pub team: Team,
    pub members: Vec<User>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTeamRequest {
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTeamRequest {
    #[serde(default, deserialize_with = "trimmed_option")]
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddMemberRequest {
    pub user_id: Uuid,
}

fn team_not_found() -> ApiError {
    ApiError::NotFound("Team not found".to_string())
}

async fn load_team(state: &AppState, id: Uuid) -> ApiResult<Team> {
    state.store.find_team(id).await?.ok_or_else(team_not_found)
}

/// All teams
pub async fn list_teams(State(state): State<AppState>) -> ApiResult<Json<ListTeamsResponse>> {
    let teams = state.store.list_teams().await?;
    Ok(Json(ListTeamsResponse { teams }))
}

/// Create a team
///
/// A creator without a team joins the new one.
pub async fn create_team(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateTeamRequest>,
) -> ApiResult<(StatusCode, Json<Team>)> {
    req.validate()?;
    require_capability(&auth, can_manage_team, "manage teams")?;

    let team = state
        .store
        .create_team(CreateTeam {
            name: req.name,
        })
        .await?;

    if auth.team_id.is_none() {
        state.store.set_user_team(auth.user_id, Some(team.id)).await?;
    }

    tracing::info!(team_id = %team.id, user_id = %auth.user_id, "Team created");

    Ok((StatusCode::CREATED, Json(team)))
}

/// Team with members
pub async fn get_team(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<TeamDetailResponse>> {
    let team = load_team(&state, id).await?;
    let members = state.store.list_team_members(id).await?;

    Ok(Json(TeamDetailResponse { team, members }))
}

/// Rename a team
pub async fn update_team(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateTeamRequest>,
) -> ApiResult<Json<Team>> {
    req.validate()?;
    require_team_management(&auth, id)?;

    let name = req
        .name
        .ok_or_else(|| ApiError::BadRequest("No fields to update".to_string()))?;

    let team = state
        .store
        .update_team(
            id,
            UpdateTeam {
                name: Some(name),
            },
        )
        .await?
        .ok_or_else(team_not_found)?;

    Ok(Json(team))
}

/// Delete a team
///
/// Boards go with it; members are left without a team.
pub async fn delete_team(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    require_team_management(&auth, id)?;

    if !state.store.delete_team(id).await? {
        return Err(team_not_found());
    }

    tracing::info!(team_id = %id, user_id = %auth.user_id, "Team deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// Join a team, leaving any previous one
pub async fn join_team(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<User>> {
    load_team(&state, id).await?;

    let user = state
        .store
        .set_user_team(auth.user_id, Some(id))
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    tracing::info!(team_id = %id, user_id = %user.id, "User joined team");

    Ok(Json(user))
}

/// Add a user to a team
pub async fn add_member(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<AddMemberRequest>,
) -> ApiResult<Json<User>> {
    require_team_management(&auth, id)?;
    load_team(&state, id).await?;

    let user = state
        .store
        .set_user_team(req.user_id, Some(id))
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    tracing::info!(team_id = %id, user_id = %user.id, added_by = %auth.user_id, "Member added");

    Ok(Json(user))
}

/// Remove a user from a team
pub async fn remove_member(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    require_team_management(&auth, id)?;

    let user = state
        .store
        .find_user(user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    if user.team_id != Some(id) {
        return Err(ApiError::NotFound(
            "User is not a member of this team".to_string(),
        ));
    }

    state.store.set_user_team(user_id, None).await?;

    tracing::info!(team_id = %id, user_id = %user_id, removed_by = %auth.user_id, "Member removed");

    Ok(StatusCode::NO_CONTENT)
}
