/// Points-shop endpoints
///
/// # Endpoints
///
/// - `GET /points-shop` - Caller's balance and the catalog
/// - `POST /points-shop/redeem/:item_id` - Spend points on an item

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, State},
    Extension, Json,
};
use gello_shared::{
    auth::permissions::AuthContext,
    models::points::{AdjustmentOutcome, NewPointsEntry, PointsReason},
    shop::ShopItem,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct ShopResponse {
    pub balance: i64,
    pub items: Vec<ShopItem>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RedeemResponse {
    pub item: ShopItem,
    pub remaining_points: i64,
}

/// Balance and catalog
pub async fn shop(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<ShopResponse>> {
    let user = state
        .store
        .find_user(auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(ShopResponse {
        balance: user.total_points,
        items: state.catalog.items().to_vec(),
    }))
}

/// Redeem an item
///
/// The debit and its `shop_redemption` ledger row are written together, and
/// only if the balance covers the cost.
///
/// # Errors
///
/// - `400 Bad Request`: Balance too low (`insufficient_points`)
/// - `404 Not Found`: Unknown item
pub async fn redeem(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(item_id): Path<String>,
) -> ApiResult<Json<RedeemResponse>> {
    let item = state
        .catalog
        .find(&item_id)
        .cloned()
        .ok_or_else(|| ApiError::NotFound("Shop item not found".to_string()))?;

    let outcome = state
        .store
        .apply_points(NewPointsEntry {
            user_id: auth.user_id,
            points_earned: -item.cost,
            reason: PointsReason::ShopRedemption,
            task_id: None,
            awarded_by: None,
            notes: Some(item.name.clone()),
        })
        .await?;

    match outcome {
        AdjustmentOutcome::Applied { total_points, .. } => {
            tracing::info!(
                user_id = %auth.user_id,
                item_id = %item.id,
                cost = item.cost,
                remaining_points = total_points,
                "Shop item redeemed"
            );

            Ok(Json(RedeemResponse {
                item,
                remaining_points: total_points,
            }))
        }
        AdjustmentOutcome::InsufficientPoints { available, required } => {
            Err(ApiError::InsufficientPoints { available, required })
        }
        AdjustmentOutcome::UserNotFound => Err(ApiError::NotFound("User not found".to_string())),
    }
}
