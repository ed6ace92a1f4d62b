/// Team model and database operations
///
/// Teams scope boards and group users. A user belongs to at most one team
/// (`users.team_id`).
///
/// # Schema
///
/// ```sql
/// CREATE TABLE teams (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(100) NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Team
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Team {
    /// Unique team ID
    pub id: Uuid,

    /// Team name
    pub name: String,

    /// When the team was created
    pub created_at: DateTime<Utc>,

    /// When the team was last updated
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a team
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTeam {
    /// Team name
    pub name: String,
}

/// Input for renaming a team
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTeam {
    /// New name
    pub name: Option<String>,
}

impl Team {
    /// Creates a new team
    pub async fn create(pool: &PgPool, data: CreateTeam) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Team>(
            r#"
            INSERT INTO teams (name)
            VALUES ($1)
            RETURNING id, name, created_at, updated_at
            "#,
        )
        .bind(data.name)
        .fetch_one(pool)
        .await
    }

    /// Finds a team by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Team>(
            r#"
            SELECT id, name, created_at, updated_at
            FROM teams
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Lists all teams by name
    pub async fn list(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Team>(
            r#"
            SELECT id, name, created_at, updated_at
            FROM teams
            ORDER BY name ASC, id ASC
            "#,
        )
        .fetch_all(pool)
        .await
    }

    /// Updates a team
    ///
    /// # Returns
    ///
    /// The updated team if found, None otherwise
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateTeam,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Team>(
            r#"
            UPDATE teams
            SET name = COALESCE($2, name), updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(data.name)
        .fetch_optional(pool)
        .await
    }

    /// Deletes a team
    ///
    /// Boards cascade (and with them lists and tasks); members are left
    /// without a team.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM teams WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
