/// Points ledger model and database operations
///
/// Every change to a user's point balance is recorded as one append-only
/// ledger row, and `users.total_points` is kept equal to the running sum of
/// those rows. Ledger rows and the balance update are always written in the
/// same transaction.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE points_reason AS ENUM ('task_complete', 'manual_award', 'shop_redemption');
///
/// CREATE TABLE points_history (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     points_earned BIGINT NOT NULL,
///     reason points_reason NOT NULL,
///     task_id UUID REFERENCES tasks(id) ON DELETE SET NULL,
///     awarded_by UUID REFERENCES users(id) ON DELETE SET NULL,
///     notes TEXT,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
///
/// -- at most one completion award per task
/// CREATE UNIQUE INDEX points_history_task_complete_once
///     ON points_history (task_id) WHERE reason = 'task_complete';
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

/// Why a ledger row was written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "points_reason", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PointsReason {
    /// Story points credited on first completion of a task
    TaskComplete,

    /// Manager/admin adjustment (may be negative)
    ManualAward,

    /// Points spent in the shop (always negative)
    ShopRedemption,
}

impl PointsReason {
    /// Converts reason to its stored string form
    pub fn as_str(&self) -> &'static str {
        match self {
            PointsReason::TaskComplete => "task_complete",
            PointsReason::ManualAward => "manual_award",
            PointsReason::ShopRedemption => "shop_redemption",
        }
    }
}

/// Ledger row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PointsHistory {
    /// Unique entry ID
    pub id: Uuid,

    /// User whose balance changed
    pub user_id: Uuid,

    /// Signed delta
    pub points_earned: i64,

    /// Why the balance changed
    pub reason: PointsReason,

    /// Completed task, for `task_complete` rows
    pub task_id: Option<Uuid>,

    /// Manager/admin who made a manual award
    pub awarded_by: Option<Uuid>,

    /// Free-form note
    pub notes: Option<String>,

    /// When the entry was written
    pub created_at: DateTime<Utc>,
}

/// Input for a ledger row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPointsEntry {
    /// User whose balance changes
    pub user_id: Uuid,

    /// Signed delta
    pub points_earned: i64,

    /// Why the balance changes
    pub reason: PointsReason,

    /// Related task
    pub task_id: Option<Uuid>,

    /// Acting manager/admin
    pub awarded_by: Option<Uuid>,

    /// Free-form note
    pub notes: Option<String>,
}

/// Result of applying a ledger entry to a balance
#[derive(Debug, Clone)]
pub enum AdjustmentOutcome {
    /// Entry written and balance updated
    Applied {
        entry: PointsHistory,
        total_points: i64,
    },

    /// The balance would have gone below zero; nothing was written
    InsufficientPoints { available: i64, required: i64 },

    /// No such user
    UserNotFound,
}

/// Computes a balance after applying `delta`
///
/// Returns `None` when the result would be negative (or overflow), which is
/// how a redemption or negative award is refused.
///
/// # Example
///
/// ```
/// use gello_shared::models::points::adjusted_total;
///
/// assert_eq!(adjusted_total(10, 5), Some(15));
/// assert_eq!(adjusted_total(10, -10), Some(0));
/// assert_eq!(adjusted_total(10, -11), None);
/// ```
pub fn adjusted_total(current: i64, delta: i64) -> Option<i64> {
    current.checked_add(delta).filter(|total| *total >= 0)
}

impl PointsHistory {
    /// Lists a user's ledger, newest first
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, PointsHistory>(
            r#"
            SELECT id, user_id, points_earned, reason, task_id, awarded_by, notes, created_at
            FROM points_history
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    /// Writes a ledger row and moves the user's balance by the same amount
    ///
    /// The user row is locked for the duration of the transaction, so
    /// concurrent adjustments of one balance are applied one after another
    /// and a balance can never be driven below zero.
    pub async fn apply(pool: &PgPool, data: NewPointsEntry) -> Result<AdjustmentOutcome, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let balance: Option<(i64,)> =
            sqlx::query_as("SELECT total_points FROM users WHERE id = $1 FOR UPDATE")
                .bind(data.user_id)
                .fetch_optional(&mut *tx)
                .await?;

        let Some((available,)) = balance else {
            return Ok(AdjustmentOutcome::UserNotFound);
        };

        let Some(total_points) = adjusted_total(available, data.points_earned) else {
            return Ok(AdjustmentOutcome::InsufficientPoints {
                available,
                required: data.points_earned.saturating_neg(),
            });
        };

        sqlx::query("UPDATE users SET total_points = $2, updated_at = NOW() WHERE id = $1")
            .bind(data.user_id)
            .bind(total_points)
            .execute(&mut *tx)
            .await?;

        let entry = Self::insert(&mut *tx, data).await?;

        tx.commit().await?;

        Ok(AdjustmentOutcome::Applied {
            entry,
            total_points,
        })
    }

    /// Inserts a ledger row on an open connection/transaction
    pub(crate) async fn insert(
        conn: &mut PgConnection,
        data: NewPointsEntry,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, PointsHistory>(
            r#"
            INSERT INTO points_history (user_id, points_earned, reason, task_id, awarded_by, notes)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, user_id, points_earned, reason, task_id, awarded_by, notes, created_at
            "#,
        )
        .bind(data.user_id)
        .bind(data.points_earned)
        .bind(data.reason)
        .bind(data.task_id)
        .bind(data.awarded_by)
        .bind(data.notes)
        .fetch_one(conn)
        .await
    }
}
