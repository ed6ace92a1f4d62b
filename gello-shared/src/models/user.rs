/// User profile model and database operations
///
/// A profile row is created for every identity registered with the auth
/// service, keyed by the same UUID. It carries the application role, the
/// team the user belongs to and the denormalized running point total.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY,                      -- auth identity id
///     email CITEXT NOT NULL UNIQUE,
///     display_name VARCHAR(100) NOT NULL,
///     role TEXT NOT NULL DEFAULT 'member',
///     team_id UUID REFERENCES teams(id) ON DELETE SET NULL,
///     total_points BIGINT NOT NULL DEFAULT 0,
///     avatar_url VARCHAR(512),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// `role` is stored as text on purpose: values written by older clients or by
/// hand are read back as [`UserRole::Unrecognized`] and denied everything.
///
/// # Example
///
/// ```no_run
/// use gello_shared::models::user::{CreateUser, User, UserRole};
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let user = User::create(&pool, CreateUser {
///     id: Uuid::new_v4(),
///     email: "ada@example.com".to_string(),
///     display_name: "Ada".to_string(),
///     role: UserRole::Member,
///     avatar_url: None,
/// }).await?;
/// assert_eq!(user.total_points, 0);
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sqlx::PgPool;
use std::fmt;
use uuid::Uuid;

const USER_COLUMNS: &str =
    "id, email, display_name, role, team_id, total_points, avatar_url, created_at, updated_at";

/// Width of the `avatar_url` column
pub const MAX_AVATAR_URL_LEN: u64 = 512;

/// Application role of a user
///
/// The set of meaningful roles is closed. Any other stored value parses to
/// `Unrecognized`, which every permission predicate rejects.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum UserRole {
    /// Full control, including user administration
    Admin,

    /// Manages boards, lists, tasks and their own team
    Manager,

    /// Works on tasks assigned to them
    #[default]
    Member,

    /// Anything else found in the database
    Unrecognized(String),
}

impl UserRole {
    /// Parses a role string; never fails
    ///
    /// # Example
    ///
    /// ```
    /// use gello_shared::models::user::UserRole;
    ///
    /// assert_eq!(UserRole::parse("admin"), UserRole::Admin);
    /// assert!(!UserRole::parse("superuser").is_recognized());
    /// ```
    pub fn parse(value: &str) -> Self {
        match value {
            "admin" => UserRole::Admin,
            "manager" => UserRole::Manager,
            "member" => UserRole::Member,
            other => UserRole::Unrecognized(other.to_string()),
        }
    }

    /// Converts role to its stored string form
    pub fn as_str(&self) -> &str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Manager => "manager",
            UserRole::Member => "member",
            UserRole::Unrecognized(raw) => raw,
        }
    }

    /// Whether this is one of the three known roles
    pub fn is_recognized(&self) -> bool {
        !matches!(self, UserRole::Unrecognized(_))
    }
}

impl From<String> for UserRole {
    fn from(value: String) -> Self {
        UserRole::parse(&value)
    }
}

impl From<&str> for UserRole {
    fn from(value: &str) -> Self {
        UserRole::parse(value)
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for UserRole {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for UserRole {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(UserRole::parse(&raw))
    }
}

/// User profile
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Same id as the auth identity
    pub id: Uuid,

    /// Email address (case-insensitive via CITEXT)
    pub email: String,

    /// Name shown on boards and leaderboards
    pub display_name: String,

    /// Application role
    #[sqlx(try_from = "String")]
    pub role: UserRole,

    /// Team the user belongs to, if any
    pub team_id: Option<Uuid>,

    /// Running sum of the user's ledger entries
    pub total_points: i64,

    /// Optional avatar/profile picture URL
    pub avatar_url: Option<String>,

    /// When the profile was created
    pub created_at: DateTime<Utc>,

    /// When the profile was last updated
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a profile row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    /// Auth identity id
    pub id: Uuid,

    /// Email address
    pub email: String,

    /// Display name
    pub display_name: String,

    /// Initial role (registration always uses `Member`)
    pub role: UserRole,

    /// Optional avatar URL
    pub avatar_url: Option<String>,
}

/// Self-service profile changes
///
/// Only non-None fields are updated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUser {
    /// New display name
    pub display_name: Option<String>,

    /// New avatar URL (use Some(None) to clear)
    pub avatar_url: Option<Option<String>>,
}

impl User {
    /// Creates a profile row
    ///
    /// # Errors
    ///
    /// Returns an error if the id or email already exists (unique constraint
    /// violation) or the database is unreachable.
    pub async fn create(pool: &PgPool, data: CreateUser) -> Result<Self, sqlx::Error> {
        let sql = format!(
            "INSERT INTO users (id, email, display_name, role, avatar_url) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {USER_COLUMNS}"
        );

        sqlx::query_as::<_, User>(&sql)
            .bind(data.id)
            .bind(data.email)
            .bind(data.display_name)
            .bind(data.role.as_str())
            .bind(data.avatar_url)
            .fetch_one(pool)
            .await
    }

    /// Finds a user by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");

        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Finds a user by email address (case-insensitive)
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");

        sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    /// Lists all users, oldest first
    pub async fn list(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at ASC, id ASC");

        sqlx::query_as::<_, User>(&sql).fetch_all(pool).await
    }

    /// Lists the members of a team, oldest first
    pub async fn list_by_team(pool: &PgPool, team_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE team_id = $1 ORDER BY created_at ASC, id ASC"
        );

        sqlx::query_as::<_, User>(&sql)
            .bind(team_id)
            .fetch_all(pool)
            .await
    }

    /// Updates display name and/or avatar
    ///
    /// # Returns
    ///
    /// The updated user if found, None if the user doesn't exist
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateUser,
    ) -> Result<Option<Self>, sqlx::Error> {
        // Build dynamic update query based on which fields are present
        let mut query = String::from("UPDATE users SET updated_at = NOW()");
        let mut bind_count = 1;

        if data.display_name.is_some() {
            bind_count += 1;
            query.push_str(&format!(", display_name = ${}", bind_count));
        }
        if data.avatar_url.is_some() {
            bind_count += 1;
            query.push_str(&format!(", avatar_url = ${}", bind_count));
        }

        query.push_str(&format!(" WHERE id = $1 RETURNING {USER_COLUMNS}"));

        let mut q = sqlx::query_as::<_, User>(&query).bind(id);

        if let Some(display_name) = data.display_name {
            q = q.bind(display_name);
        }
        if let Some(avatar_opt) = data.avatar_url {
            q = q.bind(avatar_opt);
        }

        q.fetch_optional(pool).await
    }

    /// Changes a user's role
    pub async fn set_role(
        pool: &PgPool,
        id: Uuid,
        role: &UserRole,
    ) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            "UPDATE users SET role = $2, updated_at = NOW() WHERE id = $1 RETURNING {USER_COLUMNS}"
        );

        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(role.as_str())
            .fetch_optional(pool)
            .await
    }

    /// Moves a user into a team, or out of any team with `None`
    pub async fn set_team(
        pool: &PgPool,
        id: Uuid,
        team_id: Option<Uuid>,
    ) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            "UPDATE users SET team_id = $2, updated_at = NOW() WHERE id = $1 RETURNING {USER_COLUMNS}"
        );

        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(team_id)
            .fetch_optional(pool)
            .await
    }

    /// Deletes a profile row
    ///
    /// Ledger rows cascade; tasks assigned to the user become unassigned.
    ///
    /// # Returns
    ///
    /// True if the user was deleted, false if it didn't exist
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Users ordered for the leaderboard
    ///
    /// Highest total first; ties keep registration order, then id.
    pub async fn leaderboard(
        pool: &PgPool,
        team_id: Option<Uuid>,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE ($1::uuid IS NULL OR team_id = $1) \
             ORDER BY total_points DESC, created_at ASC, id ASC \
             LIMIT $2"
        );

        sqlx::query_as::<_, User>(&sql)
            .bind(team_id)
            .bind(limit)
            .fetch_all(pool)
            .await
    }
}
