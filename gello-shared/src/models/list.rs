/// List (board column) model and database operations
///
/// # Schema
///
/// ```sql
/// CREATE TABLE lists (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     board_id UUID NOT NULL REFERENCES boards(id) ON DELETE CASCADE,
///     name VARCHAR(100) NOT NULL,
///     position INTEGER NOT NULL DEFAULT 0,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// `position` only defines display order; gaps and duplicates are allowed and
/// ties fall back to creation order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::next_position_sql;

/// Column of a board
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct List {
    /// Unique list ID
    pub id: Uuid,

    /// Board this list belongs to
    pub board_id: Uuid,

    /// List name
    pub name: String,

    /// Display order within the board
    pub position: i32,

    /// When the list was created
    pub created_at: DateTime<Utc>,

    /// When the list was last updated
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateList {
    /// Board the list belongs to
    pub board_id: Uuid,

    /// List name
    pub name: String,

    /// Position; `None` appends after the last list
    pub position: Option<i32>,
}

impl List {
    /// Creates a list, appending it when no position is given
    pub async fn create(pool: &PgPool, data: CreateList) -> Result<Self, sqlx::Error> {
        let sql = format!(
            r#"
            INSERT INTO lists (board_id, name, position)
            VALUES ($1, $2, COALESCE($3, {next}))
            RETURNING id, board_id, name, position, created_at, updated_at
            "#,
            next = next_position_sql("lists", "board_id = $1")
        );

        sqlx::query_as::<_, List>(&sql)
        .bind(data.board_id)
        .bind(data.name)
        .bind(data.position)
        .fetch_one(pool)
        .await
    }

    /// Finds a list by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, List>(
            r#"
            SELECT id, board_id, name, position, created_at, updated_at
            FROM lists
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Lists the columns of a board in display order
    pub async fn list_by_board(pool: &PgPool, board_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, List>(
            r#"
            SELECT id, board_id, name, position, created_at, updated_at
            FROM lists
            WHERE board_id = $1
            ORDER BY position ASC, created_at ASC
            "#,
        )
        .bind(board_id)
        .fetch_all(pool)
        .await
    }

    /// Renames a list
    pub async fn rename(pool: &PgPool, id: Uuid, name: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, List>(
            r#"
            UPDATE lists
            SET name = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, board_id, name, position, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(name)
        .fetch_optional(pool)
        .await
    }

    /// Moves a list to a new position within its board
    pub async fn reorder(pool: &PgPool, id: Uuid, position: i32) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, List>(
            r#"
            UPDATE lists
            SET position = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, board_id, name, position, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(position)
        .fetch_optional(pool)
        .await
    }

    /// Deletes a list; its tasks cascade
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM lists WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
