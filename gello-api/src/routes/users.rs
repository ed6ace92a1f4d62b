/// User endpoints
///
/// Everyone reads and edits their own profile. Listing, role changes and
/// deletion are admin-only.
///
/// # Endpoints
///
/// - `GET /api/users/me` / `PUT /api/users/me` - Own profile
/// - `GET /api/users` - All users (admin)
/// - `GET /api/users/:id` - A profile (admin, or self)
/// - `PATCH /api/users/:id/role` - Change role (admin)
/// - `DELETE /api/users/:id` - Delete profile and identity (admin)

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{clearable, trimmed_option},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use gello_shared::{
    auth::permissions::{can_manage_users, require_capability, require_self_or, AuthContext},
    models::user::{UpdateUser, User, UserRole, MAX_AVATAR_URL_LEN},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize)]
pub struct ListUsersResponse {
    pub users: Vec<User>,
}

/// Own-profile update; an empty `avatar_url` clears it
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[serde(default, deserialize_with = "trimmed_option")]
    #[validate(length(min = 1, max = 100, message = "Display name must be 1-100 characters"))]
    pub display_name: Option<String>,

    #[validate(length(max = MAX_AVATAR_URL_LEN, message = "Avatar URL must be at most 512 characters"))]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub role: String,
}

fn user_not_found() -> ApiError {
    ApiError::NotFound("User not found".to_string())
}

/// Own profile
pub async fn get_me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<User>> {
    let user = state
        .store
        .find_user(auth.user_id)
        .await?
        .ok_or_else(user_not_found)?;

    Ok(Json(user))
}

/// Update own profile
pub async fn update_me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<UpdateProfileRequest>,
) -> ApiResult<Json<User>> {
    req.validate()?;

    if req.display_name.is_none() && req.avatar_url.is_none() {
        return Err(ApiError::BadRequest("No fields to update".to_string()));
    }

    let user = state
        .store
        .update_user(
            auth.user_id,
            UpdateUser {
                display_name: req.display_name,
                avatar_url: clearable(req.avatar_url),
            },
        )
        .await?
        .ok_or_else(user_not_found)?;

    Ok(Json(user))
}

/// All users (admin)
pub async fn list_users(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<ListUsersResponse>> {
    require_capability(&auth, can_manage_users, "list users")?;

    let users = state.store.list_users().await?;

    Ok(Json(ListUsersResponse { users }))
}

/// A user's profile (admin, or self)
pub async fn get_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<User>> {
    require_self_or(&auth, id, can_manage_users, "view other users")?;

    let user = state.store.find_user(id).await?.ok_or_else(user_not_found)?;

    Ok(Json(user))
}

/// Change a user's role (admin)
///
/// # Errors
///
/// - `400 Bad Request`: Unknown role, or an admin demoting themselves
/// - `403 Forbidden`: Caller isn't an admin
/// - `404 Not Found`: No such user
pub async fn update_role(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateRoleRequest>,
) -> ApiResult<Json<User>> {
    require_capability(&auth, can_manage_users, "change roles")?;

    let role = UserRole::parse(req.role.trim());
    if !role.is_recognized() {
        return Err(ApiError::invalid_field(
            "role",
            "Role must be one of admin, manager, member",
        ));
    }

    if id == auth.user_id && role != UserRole::Admin {
        return Err(ApiError::BadRequest(
            "Admins cannot remove their own admin role".to_string(),
        ));
    }

    let user = state
        .store
        .set_user_role(id, &role)
        .await?
        .ok_or_else(user_not_found)?;

    tracing::info!(user_id = %id, role = %role, changed_by = %auth.user_id, "Role changed");

    Ok(Json(user))
}

/// Delete a user (admin)
///
/// The profile goes first. Deleting the identity afterwards is best effort:
/// a failure is logged and the profile stays deleted.
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    require_capability(&auth, can_manage_users, "delete users")?;

    if id == auth.user_id {
        return Err(ApiError::BadRequest(
            "You cannot delete your own account".to_string(),
        ));
    }

    if !state.store.delete_user(id).await? {
        return Err(user_not_found());
    }

    if let Err(err) = state.auth.delete_user(id).await {
        tracing::warn!(user_id = %id, error = %err, "Profile deleted but identity deletion failed");
    }

    tracing::info!(user_id = %id, deleted_by = %auth.user_id, "User deleted");

    Ok(StatusCode::NO_CONTENT)
}
