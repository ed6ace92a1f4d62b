/// Board model and database operations
///
/// # Schema
///
/// ```sql
/// CREATE TABLE boards (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(100) NOT NULL,
///     description TEXT,
///     team_id UUID NOT NULL REFERENCES teams(id) ON DELETE CASCADE,
///     created_by UUID REFERENCES users(id) ON DELETE SET NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Kanban board, scoped to exactly one team
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Board {
    /// Unique board ID
    pub id: Uuid,

    /// Board name
    pub name: String,

    /// Optional description
    pub description: Option<String>,

    /// Owning team
    pub team_id: Uuid,

    /// User who created the board
    pub created_by: Option<Uuid>,

    /// When the board was created
    pub created_at: DateTime<Utc>,

    /// When the board was last updated
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a board
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBoard {
    /// Board name
    pub name: String,

    /// Optional description
    pub description: Option<String>,

    /// Owning team
    pub team_id: Uuid,

    /// Creator
    pub created_by: Option<Uuid>,
}

/// Input for updating a board
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateBoard {
    /// New name
    pub name: Option<String>,

    /// New description (use Some(None) to clear)
    pub description: Option<Option<String>>,
}

impl Board {
    /// Creates a new board
    pub async fn create(pool: &PgPool, data: CreateBoard) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Board>(
            r#"
            INSERT INTO boards (name, description, team_id, created_by)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, description, team_id, created_by, created_at, updated_at
            "#,
        )
        .bind(data.name)
        .bind(data.description)
        .bind(data.team_id)
        .bind(data.created_by)
        .fetch_one(pool)
        .await
    }

    /// Finds a board by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Board>(
            r#"
            SELECT id, name, description, team_id, created_by, created_at, updated_at
            FROM boards
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Lists boards, optionally restricted to one team
    pub async fn list(pool: &PgPool, team_id: Option<Uuid>) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Board>(
            r#"
            SELECT id, name, description, team_id, created_by, created_at, updated_at
            FROM boards
            WHERE ($1::uuid IS NULL OR team_id = $1)
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(team_id)
        .fetch_all(pool)
        .await
    }

    /// Updates a board
    ///
    /// Only non-None fields in `data` are updated.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateBoard,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE boards SET updated_at = NOW()");
        let mut bind_count = 1;

        if data.name.is_some() {
            bind_count += 1;
            query.push_str(&format!(", name = ${}", bind_count));
        }
        if data.description.is_some() {
            bind_count += 1;
            query.push_str(&format!(", description = ${}", bind_count));
        }

        query.push_str(
            " WHERE id = $1 RETURNING id, name, description, team_id, created_by, created_at, updated_at",
        );

        let mut q = sqlx::query_as::<_, Board>(&query).bind(id);

        if let Some(name) = data.name {
            q = q.bind(name);
        }
        if let Some(description) = data.description {
            q = q.bind(description);
        }

        q.fetch_optional(pool).await
    }

    /// Deletes a board; lists and tasks cascade
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM boards WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
