/// Task model and database operations
///
/// A task's only state flag is `completed_at`: null while open, set once on
/// completion and never cleared. Completion credits the task's story points to
/// its assignee exactly once.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     list_id UUID NOT NULL REFERENCES lists(id) ON DELETE CASCADE,
///     title VARCHAR(200) NOT NULL,
///     description TEXT,
///     story_points INTEGER NOT NULL DEFAULT 0 CHECK (story_points >= 0),
///     assigned_to UUID REFERENCES users(id) ON DELETE SET NULL,
///     position INTEGER NOT NULL DEFAULT 0,
///     due_date TIMESTAMPTZ,
///     completed_at TIMESTAMPTZ,
///     created_by UUID REFERENCES users(id) ON DELETE SET NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Completion
///
/// ```text
/// open (completed_at IS NULL) ──complete──> done (completed_at = NOW())
///                                            │
///                                            └──complete──> no-op
/// ```
///
/// The transition is a single conditional `UPDATE ... WHERE completed_at IS
/// NULL`; the ledger row and balance update ride in the same transaction, so
/// two racing requests can never both award points.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::next_position_sql;
use super::points::{NewPointsEntry, PointsHistory, PointsReason};

const TASK_COLUMNS: &str = "id, list_id, title, description, story_points, assigned_to, position, \
                            due_date, completed_at, created_by, created_at, updated_at";

/// Kanban card
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    /// Unique task ID
    pub id: Uuid,

    /// List (column) holding the task
    pub list_id: Uuid,

    /// Short title
    pub title: String,

    /// Optional long description
    pub description: Option<String>,

    /// Points credited to the assignee on completion
    pub story_points: i32,

    /// Assignee, if any
    pub assigned_to: Option<Uuid>,

    /// Display order within the list
    pub position: i32,

    /// Optional due date
    pub due_date: Option<DateTime<Utc>>,

    /// When the task was completed (None while open)
    pub completed_at: Option<DateTime<Utc>>,

    /// User who created the task
    pub created_by: Option<Uuid>,

    /// When the task was created
    pub created_at: DateTime<Utc>,

    /// When the task was last updated
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTask {
    /// List to place the task in
    pub list_id: Uuid,

    /// Title
    pub title: String,

    /// Description
    pub description: Option<String>,

    /// Story points
    pub story_points: i32,

    /// Assignee
    pub assigned_to: Option<Uuid>,

    /// Position; `None` appends after the last task
    pub position: Option<i32>,

    /// Due date
    pub due_date: Option<DateTime<Utc>>,

    /// Creator
    pub created_by: Option<Uuid>,
}

/// Input for editing a task
///
/// Assignment, moves and completion have their own operations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTask {
    /// New title
    pub title: Option<String>,

    /// New description (use Some(None) to clear)
    pub description: Option<Option<String>>,

    /// New story points
    pub story_points: Option<i32>,

    /// New position within the current list
    pub position: Option<i32>,

    /// New due date (use Some(None) to clear)
    pub due_date: Option<Option<DateTime<Utc>>>,
}

impl UpdateTask {
    /// Whether no field would change
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.story_points.is_none()
            && self.position.is_none()
            && self.due_date.is_none()
    }
}

/// Result of a completion attempt on an existing task
#[derive(Debug, Clone)]
pub enum CompletionOutcome {
    /// This call completed the task and credited the assignee
    Completed {
        task: Task,
        points_awarded: i64,
        total_points: i64,
    },

    /// The task was already completed; nothing was awarded
    AlreadyCompleted { task: Task },

    /// The task is open but assigned to someone else
    AssigneeMismatch { task: Task },
}

impl Task {
    /// Whether the task has been completed
    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }

    /// Creates a task, appending it to the list when no position is given
    pub async fn create(pool: &PgPool, data: CreateTask) -> Result<Self, sqlx::Error> {
        let sql = format!(
            "INSERT INTO tasks (list_id, title, description, story_points, assigned_to, position, due_date, created_by) \
             VALUES ($1, $2, $3, $4, $5, \
                     COALESCE($6, {next}), $7, $8) \
             RETURNING {TASK_COLUMNS}",
            next = next_position_sql("tasks", "list_id = $1")
        );

        sqlx::query_as::<_, Task>(&sql)
            .bind(data.list_id)
            .bind(data.title)
            .bind(data.description)
            .bind(data.story_points)
            .bind(data.assigned_to)
            .bind(data.position)
            .bind(data.due_date)
            .bind(data.created_by)
            .fetch_one(pool)
            .await
    }

    /// Finds a task by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1");

        sqlx::query_as::<_, Task>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Lists the tasks of a list in display order
    pub async fn list_by_list(pool: &PgPool, list_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE list_id = $1 ORDER BY position ASC, created_at ASC"
        );

        sqlx::query_as::<_, Task>(&sql)
            .bind(list_id)
            .fetch_all(pool)
            .await
    }

    /// Updates editable fields
    ///
    /// Only non-None fields in `data` are updated. Returns None when the task
    /// is missing or when the update would change a completed task's points.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateTask,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE tasks SET updated_at = NOW()");
        let mut bind_count = 1;

        if data.title.is_some() {
            bind_count += 1;
            query.push_str(&format!(", title = ${}", bind_count));
        }
        if data.description.is_some() {
            bind_count += 1;
            query.push_str(&format!(", description = ${}", bind_count));
        }
        let mut points_bind = None;
        if data.story_points.is_some() {
            bind_count += 1;
            query.push_str(&format!(", story_points = ${}", bind_count));
            points_bind = Some(bind_count);
        }
        if data.position.is_some() {
            bind_count += 1;
            query.push_str(&format!(", position = ${}", bind_count));
        }
        if data.due_date.is_some() {
            bind_count += 1;
            query.push_str(&format!(", due_date = ${}", bind_count));
        }

        query.push_str(" WHERE id = $1");
        // completed tasks keep the points they were credited
        if let Some(n) = points_bind {
            query.push_str(&format!(" AND (completed_at IS NULL OR story_points = ${})", n));
        }
        query.push_str(&format!(" RETURNING {TASK_COLUMNS}"));

        let mut q = sqlx::query_as::<_, Task>(&query).bind(id);

        if let Some(title) = data.title {
            q = q.bind(title);
        }
        if let Some(description) = data.description {
            q = q.bind(description);
        }
        if let Some(story_points) = data.story_points {
            q = q.bind(story_points);
        }
        if let Some(position) = data.position {
            q = q.bind(position);
        }
        if let Some(due_date) = data.due_date {
            q = q.bind(due_date);
        }

        q.fetch_optional(pool).await
    }

    /// Sets or clears the assignee of an open task
    pub async fn assign(
        pool: &PgPool,
        id: Uuid,
        assigned_to: Option<Uuid>,
    ) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            "UPDATE tasks SET assigned_to = $2, updated_at = NOW() \
             WHERE id = $1 AND completed_at IS NULL RETURNING {TASK_COLUMNS}"
        );

        sqlx::query_as::<_, Task>(&sql)
            .bind(id)
            .bind(assigned_to)
            .fetch_optional(pool)
            .await
    }

    /// Moves a task to another list (or position), appending when no
    /// position is given
    pub async fn move_to(
        pool: &PgPool,
        id: Uuid,
        list_id: Uuid,
        position: Option<i32>,
    ) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            "UPDATE tasks SET list_id = $2, \
                 position = COALESCE($3, {next}), \
                 updated_at = NOW() \
             WHERE id = $1 RETURNING {TASK_COLUMNS}",
            next = next_position_sql("tasks", "list_id = $2 AND id <> $1")
        );

        sqlx::query_as::<_, Task>(&sql)
            .bind(id)
            .bind(list_id)
            .bind(position)
            .fetch_optional(pool)
            .await
    }

    /// Deletes a task
    ///
    /// Ledger rows referencing it keep their points; only the link is cleared.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Completes a task on behalf of its assignee and credits the story points
    ///
    /// Runs in one transaction:
    /// 1. `UPDATE tasks SET completed_at = NOW() WHERE id = $1 AND assigned_to = $2
    ///    AND completed_at IS NULL` (row lock; a concurrent caller blocks here and
    ///    then matches nothing)
    /// 2. only if a row was updated: bump `users.total_points` and append a
    ///    `task_complete` ledger row
    ///
    /// # Returns
    ///
    /// `None` if the task doesn't exist, otherwise what happened
    pub async fn complete(
        pool: &PgPool,
        id: Uuid,
        assignee: Uuid,
    ) -> Result<Option<CompletionOutcome>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let sql = format!(
            "UPDATE tasks SET completed_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND assigned_to = $2 AND completed_at IS NULL \
             RETURNING {TASK_COLUMNS}"
        );

        let transitioned = sqlx::query_as::<_, Task>(&sql)
            .bind(id)
            .bind(assignee)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(task) = transitioned else {
            tx.rollback().await?;

            return Ok(Self::find_by_id(pool, id).await?.map(|task| {
                if task.is_completed() {
                    CompletionOutcome::AlreadyCompleted { task }
                } else {
                    CompletionOutcome::AssigneeMismatch { task }
                }
            }));
        };

        let points_awarded = i64::from(task.story_points);

        let (total_points,): (i64,) = sqlx::query_as(
            r#"
            UPDATE users
            SET total_points = total_points + $2, updated_at = NOW()
            WHERE id = $1
            RETURNING total_points
            "#,
        )
        .bind(assignee)
        .bind(points_awarded)
        .fetch_one(&mut *tx)
        .await?;

        PointsHistory::insert(
            &mut *tx,
            NewPointsEntry {
                user_id: assignee,
                points_earned: points_awarded,
                reason: PointsReason::TaskComplete,
                task_id: Some(task.id),
                awarded_by: None,
                notes: None,
            },
        )
        .await?;

        tx.commit().await?;

        Ok(Some(CompletionOutcome::Completed {
            task,
            points_awarded,
            total_points,
        }))
    }
}
