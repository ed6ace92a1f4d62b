/// Data-access seam used by the API
///
/// Handlers never touch SQL directly: every read and write goes through a
/// [`GelloStore`]. [`PgStore`](super::postgres::PgStore) is the production
/// implementation and [`MemoryStore`](super::memory::MemoryStore) backs tests
/// and local development. Both honour the same contract:
///
/// - lookups return `Ok(None)` (or `false` for deletes) for missing rows;
/// - a violated unique constraint is [`StoreError::Conflict`], a dangling
///   reference is [`StoreError::InvalidReference`];
/// - [`complete_task`](GelloStore::complete_task) and
///   [`apply_points`](GelloStore::apply_points) are atomic: the balance and
///   the ledger change together or not at all.

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::board::{Board, CreateBoard, UpdateBoard};
use crate::models::list::{CreateList, List};
use crate::models::points::{AdjustmentOutcome, NewPointsEntry, PointsHistory};
use crate::models::task::{CompletionOutcome, CreateTask, Task, UpdateTask};
use crate::models::team::{CreateTeam, Team, UpdateTeam};
use crate::models::user::{CreateUser, UpdateUser, User, UserRole};

/// Postgres error code for unique violations
const UNIQUE_VIOLATION: &str = "23505";

/// Postgres error code for foreign key violations
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Error type for store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A row that must exist for the operation doesn't
    #[error("Record not found")]
    NotFound,

    /// Unique constraint violated
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Referenced row doesn't exist
    #[error("Invalid reference: {0}")]
    InvalidReference(String),

    /// The change would alter what a completed task already credited
    #[error("Task is already completed")]
    TaskCompleted,

    /// Any other database failure
    #[error("Database error: {0}")]
    Database(#[source] sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            match db_err.code().as_deref() {
                Some(UNIQUE_VIOLATION) => {
                    return StoreError::Conflict(db_err.message().to_string());
                }
                Some(FOREIGN_KEY_VIOLATION) => {
                    return StoreError::InvalidReference(db_err.message().to_string());
                }
                _ => {}
            }
        }

        if matches!(err, sqlx::Error::RowNotFound) {
            return StoreError::NotFound;
        }

        StoreError::Database(err)
    }
}

/// Result alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence for every Gello entity
#[async_trait]
pub trait GelloStore: Send + Sync {
    /// Checks the backing store is reachable
    async fn ping(&self) -> StoreResult<()>;

    // Users

    async fn create_user(&self, data: CreateUser) -> StoreResult<User>;

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>>;

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// All users, oldest first
    async fn list_users(&self) -> StoreResult<Vec<User>>;

    /// Members of a team, oldest first
    async fn list_team_members(&self, team_id: Uuid) -> StoreResult<Vec<User>>;

    async fn update_user(&self, id: Uuid, data: UpdateUser) -> StoreResult<Option<User>>;

    async fn set_user_role(&self, id: Uuid, role: &UserRole) -> StoreResult<Option<User>>;

    /// Moves a user into a team, or out of any with `None`
    async fn set_user_team(&self, id: Uuid, team_id: Option<Uuid>) -> StoreResult<Option<User>>;

    async fn delete_user(&self, id: Uuid) -> StoreResult<bool>;

    /// Users by `total_points DESC, created_at ASC, id ASC`
    async fn leaderboard(&self, team_id: Option<Uuid>, limit: i64) -> StoreResult<Vec<User>>;

    // Teams

    async fn create_team(&self, data: CreateTeam) -> StoreResult<Team>;

    async fn find_team(&self, id: Uuid) -> StoreResult<Option<Team>>;

    async fn list_teams(&self) -> StoreResult<Vec<Team>>;

    async fn update_team(&self, id: Uuid, data: UpdateTeam) -> StoreResult<Option<Team>>;

    /// Deletes a team with its boards; members are left teamless
    async fn delete_team(&self, id: Uuid) -> StoreResult<bool>;

    // Boards

    async fn create_board(&self, data: CreateBoard) -> StoreResult<Board>;

    async fn find_board(&self, id: Uuid) -> StoreResult<Option<Board>>;

    /// Boards, optionally of one team
    async fn list_boards(&self, team_id: Option<Uuid>) -> StoreResult<Vec<Board>>;

    async fn update_board(&self, id: Uuid, data: UpdateBoard) -> StoreResult<Option<Board>>;

    /// Deletes a board with its lists and tasks
    async fn delete_board(&self, id: Uuid) -> StoreResult<bool>;

    // Lists

    async fn create_list(&self, data: CreateList) -> StoreResult<List>;

    async fn find_list(&self, id: Uuid) -> StoreResult<Option<List>>;

    /// Lists of a board by `position`, then creation
    async fn list_lists(&self, board_id: Uuid) -> StoreResult<Vec<List>>;

    async fn rename_list(&self, id: Uuid, name: &str) -> StoreResult<Option<List>>;

    async fn reorder_list(&self, id: Uuid, position: i32) -> StoreResult<Option<List>>;

    /// Deletes a list with its tasks
    async fn delete_list(&self, id: Uuid) -> StoreResult<bool>;

    // Tasks

    async fn create_task(&self, data: CreateTask) -> StoreResult<Task>;

    async fn find_task(&self, id: Uuid) -> StoreResult<Option<Task>>;

    /// Tasks of a list by `position`, then creation
    async fn list_tasks(&self, list_id: Uuid) -> StoreResult<Vec<Task>>;

    /// Partial update; `TaskCompleted` if it would change the story points
    /// of a completed task
    async fn update_task(&self, id: Uuid, data: UpdateTask) -> StoreResult<Option<Task>>;

    /// `TaskCompleted` if the task is completed
    async fn assign_task(&self, id: Uuid, assigned_to: Option<Uuid>) -> StoreResult<Option<Task>>;

    async fn move_task(
        &self,
        id: Uuid,
        list_id: Uuid,
        position: Option<i32>,
    ) -> StoreResult<Option<Task>>;

    async fn delete_task(&self, id: Uuid) -> StoreResult<bool>;

    /// Marks a task completed by `assignee` and credits its story points,
    /// at most once per task
    ///
    /// `None` if the task doesn't exist.
    async fn complete_task(&self, id: Uuid, assignee: Uuid)
        -> StoreResult<Option<CompletionOutcome>>;

    // Points

    /// Appends a ledger row and moves the balance by the same amount, refusing
    /// to go below zero
    async fn apply_points(&self, entry: NewPointsEntry) -> StoreResult<AdjustmentOutcome>;

    /// A user's ledger, newest first
    async fn points_history(&self, user_id: Uuid, limit: i64) -> StoreResult<Vec<PointsHistory>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        assert!(matches!(
            StoreError::from(sqlx::Error::RowNotFound),
            StoreError::NotFound
        ));
    }

    #[test]
    fn test_other_errors_map_to_database() {
        let err = StoreError::from(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, StoreError::Database(_)));
        assert!(err.to_string().starts_with("Database error"));
    }
}
