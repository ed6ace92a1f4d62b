/// Points endpoints
///
/// # Endpoints
///
/// - `GET /api/points/leaderboard?limit=&team_id=` - Ranked users
/// - `GET /api/points/users/:id/points` - Balance and recent ledger rows
/// - `POST /api/points/users/:id/points` - Manual award or deduction

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use gello_shared::{
    auth::permissions::{can_award_points, require_capability, require_self_or, AuthContext},
    leaderboard::{rank_leaderboard, LeaderboardEntry},
    models::points::{AdjustmentOutcome, NewPointsEntry, PointsHistory, PointsReason},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Leaderboard query
#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    /// Number of entries; defaults and caps come from configuration
    pub limit: Option<i64>,

    /// Only members of this team
    pub team_id: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LeaderboardResponse {
    pub leaderboard: Vec<LeaderboardEntry>,
}

/// Balance with recent history, newest first
#[derive(Debug, Serialize, Deserialize)]
pub struct UserPointsResponse {
    pub user_id: Uuid,
    pub total_points: i64,
    pub history: Vec<PointsHistory>,
}

/// Manual award request; negative `points` deducts
#[derive(Debug, Deserialize, Validate)]
pub struct AwardPointsRequest {
    #[validate(range(
        min = -1_000_000,
        max = 1_000_000,
        message = "Points must be between -1000000 and 1000000"
    ))]
    pub points: i64,

    #[validate(length(max = 500, message = "Notes must be at most 500 characters"))]
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AwardPointsResponse {
    pub entry: PointsHistory,
    pub total_points: i64,
}

/// Resolves the requested leaderboard size
///
/// Missing means the default; anything above the maximum is capped.
fn effective_limit(requested: Option<i64>, default: i64, max: i64) -> ApiResult<i64> {
    match requested {
        None => Ok(default.min(max)),
        Some(limit) if limit < 1 => Err(ApiError::invalid_field(
            "limit",
            "Limit must be at least 1",
        )),
        Some(limit) => Ok(limit.min(max)),
    }
}

/// Ranked users
///
/// # Response
///
/// ```json
/// {
///   "leaderboard": [
///     { "user_id": "uuid", "display_name": "Ada", "email": "ada@example.com",
///       "avatar_url": null, "total_points": 50, "rank": 1 }
///   ]
/// }
/// ```
///
/// Ties keep registration order, so ranks are always 1, 2, 3, ...
pub async fn leaderboard(
    State(state): State<AppState>,
    Query(query): Query<LeaderboardQuery>,
) -> ApiResult<Json<LeaderboardResponse>> {
    let points = &state.config.points;
    let limit = effective_limit(
        query.limit,
        points.leaderboard_default_limit,
        points.leaderboard_max_limit,
    )?;

    let users = state.store.leaderboard(query.team_id, limit).await?;

    Ok(Json(LeaderboardResponse {
        leaderboard: rank_leaderboard(users),
    }))
}

/// A user's balance and history
///
/// Visible to the user themself and to roles that award points.
pub async fn user_points(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<UserPointsResponse>> {
    require_self_or(&auth, id, can_award_points, "view other users' points")?;

    let user = state
        .store
        .find_user(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let history = state
        .store
        .points_history(id, state.config.points.history_limit)
        .await?;

    Ok(Json(UserPointsResponse {
        user_id: user.id,
        total_points: user.total_points,
        history,
    }))
}

/// Manually award (or deduct) points
///
/// Managers may only award within their own team.
///
/// # Errors
///
/// - `400 Bad Request`: Zero points, or a deduction larger than the balance
///   (`insufficient_points`)
/// - `403 Forbidden`: Role can't award, or target outside the manager's team
/// - `404 Not Found`: No such user
pub async fn award_points(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<AwardPointsRequest>,
) -> ApiResult<(StatusCode, Json<AwardPointsResponse>)> {
    req.validate()?;
    if req.points == 0 {
        return Err(ApiError::invalid_field("points", "Points must not be zero"));
    }

    require_capability(&auth, can_award_points, "award points")?;

    let target = state
        .store
        .find_user(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    if !auth.is_admin() && (auth.team_id.is_none() || target.team_id != auth.team_id) {
        return Err(ApiError::Forbidden(
            "Points can only be awarded within your own team".to_string(),
        ));
    }

    let outcome = state
        .store
        .apply_points(NewPointsEntry {
            user_id: id,
            points_earned: req.points,
            reason: PointsReason::ManualAward,
            task_id: None,
            awarded_by: Some(auth.user_id),
            notes: req.notes.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
        })
        .await?;

    match outcome {
        AdjustmentOutcome::Applied { entry, total_points } => {
            tracing::info!(
                user_id = %id,
                awarded_by = %auth.user_id,
                points = req.points,
                total_points,
                "Points awarded"
            );

            Ok((
                StatusCode::CREATED,
                Json(AwardPointsResponse { entry, total_points }),
            ))
        }
        AdjustmentOutcome::InsufficientPoints { available, required } => {
            Err(ApiError::InsufficientPoints { available, required })
        }
        AdjustmentOutcome::UserNotFound => Err(ApiError::NotFound("User not found".to_string())),
    }
}
