/// Postgres-backed [`GelloStore`]
///
/// A thin adapter over the model methods; each call maps 1:1 onto one model
/// operation and translates `sqlx` errors into [`StoreError`].

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::pool::health_check;
use super::store::{GelloStore, StoreError, StoreResult};
use crate::models::board::{Board, CreateBoard, UpdateBoard};
use crate::models::list::{CreateList, List};
use crate::models::points::{AdjustmentOutcome, NewPointsEntry, PointsHistory};
use crate::models::task::{CompletionOutcome, CreateTask, Task, UpdateTask};
use crate::models::team::{CreateTeam, Team, UpdateTeam};
use crate::models::user::{CreateUser, UpdateUser, User, UserRole};

/// Store over a Postgres pool
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Underlying pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// A guarded task update matched no row: missing, or refused because
    /// the task is completed
    async fn refused_if_exists(&self, id: Uuid) -> StoreResult<Option<Task>> {
        match Task::find_by_id(&self.pool, id).await? {
            Some(_) => Err(StoreError::TaskCompleted),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl GelloStore for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        health_check(&self.pool).await.map_err(StoreError::from)
    }

    async fn create_user(&self, data: CreateUser) -> StoreResult<User> {
        Ok(User::create(&self.pool, data).await?)
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(User::find_by_id(&self.pool, id).await?)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(User::find_by_email(&self.pool, email).await?)
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        Ok(User::list(&self.pool).await?)
    }

    async fn list_team_members(&self, team_id: Uuid) -> StoreResult<Vec<User>> {
        Ok(User::list_by_team(&self.pool, team_id).await?)
    }

    async fn update_user(&self, id: Uuid, data: UpdateUser) -> StoreResult<Option<User>> {
        Ok(User::update(&self.pool, id, data).await?)
    }

    async fn set_user_role(&self, id: Uuid, role: &UserRole) -> StoreResult<Option<User>> {
        Ok(User::set_role(&self.pool, id, role).await?)
    }

    async fn set_user_team(&self, id: Uuid, team_id: Option<Uuid>) -> StoreResult<Option<User>> {
        Ok(User::set_team(&self.pool, id, team_id).await?)
    }

    async fn delete_user(&self, id: Uuid) -> StoreResult<bool> {
        Ok(User::delete(&self.pool, id).await?)
    }

    async fn leaderboard(&self, team_id: Option<Uuid>, limit: i64) -> StoreResult<Vec<User>> {
        Ok(User::leaderboard(&self.pool, team_id, limit).await?)
    }

    async fn create_team(&self, data: CreateTeam) -> StoreResult<Team> {
        Ok(Team::create(&self.pool, data).await?)
    }

    async fn find_team(&self, id: Uuid) -> StoreResult<Option<Team>> {
        Ok(Team::find_by_id(&self.pool, id).await?)
    }

    async fn list_teams(&self) -> StoreResult<Vec<Team>> {
        Ok(Team::list(&self.pool).await?)
    }

    async fn update_team(&self, id: Uuid, data: UpdateTeam) -> StoreResult<Option<Team>> {
        Ok(Team::update(&self.pool, id, data).await?)
    }

    async fn delete_team(&self, id: Uuid) -> StoreResult<bool> {
        Ok(Team::delete(&self.pool, id).await?)
    }

    async fn create_board(&self, data: CreateBoard) -> StoreResult<Board> {
        Ok(Board::create(&self.pool, data).await?)
    }

    async fn find_board(&self, id: Uuid) -> StoreResult<Option<Board>> {
        Ok(Board::find_by_id(&self.pool, id).await?)
    }

    async fn list_boards(&self, team_id: Option<Uuid>) -> StoreResult<Vec<Board>> {
        Ok(Board::list(&self.pool, team_id).await?)
    }

    async fn update_board(&self, id: Uuid, data: UpdateBoard) -> StoreResult<Option<Board>> {
        Ok(Board::update(&self.pool, id, data).await?)
    }

    async fn delete_board(&self, id: Uuid) -> StoreResult<bool> {
        Ok(Board::delete(&self.pool, id).await?)
    }

    async fn create_list(&self, data: CreateList) -> StoreResult<List> {
        Ok(List::create(&self.pool, data).await?)
    }

    async fn find_list(&self, id: Uuid) -> StoreResult<Option<List>> {
        Ok(List::find_by_id(&self.pool, id).await?)
    }

    async fn list_lists(&self, board_id: Uuid) -> StoreResult<Vec<List>> {
        Ok(List::list_by_board(&self.pool, board_id).await?)
    }

    async fn rename_list(&self, id: Uuid, name: &str) -> StoreResult<Option<List>> {
        Ok(List::rename(&self.pool, id, name).await?)
    }

    async fn reorder_list(&self, id: Uuid, position: i32) -> StoreResult<Option<List>> {
        Ok(List::reorder(&self.pool, id, position).await?)
    }

    async fn delete_list(&self, id: Uuid) -> StoreResult<bool> {
        Ok(List::delete(&self.pool, id).await?)
    }

    async fn create_task(&self, data: CreateTask) -> StoreResult<Task> {
        Ok(Task::create(&self.pool, data).await?)
    }

    async fn find_task(&self, id: Uuid) -> StoreResult<Option<Task>> {
        Ok(Task::find_by_id(&self.pool, id).await?)
    }

    async fn list_tasks(&self, list_id: Uuid) -> StoreResult<Vec<Task>> {
        Ok(Task::list_by_list(&self.pool, list_id).await?)
    }

    async fn update_task(&self, id: Uuid, data: UpdateTask) -> StoreResult<Option<Task>> {
        match Task::update(&self.pool, id, data).await? {
            Some(task) => Ok(Some(task)),
            None => self.refused_if_exists(id).await,
        }
    }

    async fn assign_task(&self, id: Uuid, assigned_to: Option<Uuid>) -> StoreResult<Option<Task>> {
        match Task::assign(&self.pool, id, assigned_to).await? {
            Some(task) => Ok(Some(task)),
            None => self.refused_if_exists(id).await,
        }
    }

    async fn move_task(
        &self,
        id: Uuid,
        list_id: Uuid,
        position: Option<i32>,
    ) -> StoreResult<Option<Task>> {
        Ok(Task::move_to(&self.pool, id, list_id, position).await?)
    }

    async fn delete_task(&self, id: Uuid) -> StoreResult<bool> {
        Ok(Task::delete(&self.pool, id).await?)
    }

    async fn complete_task(
        &self,
        id: Uuid,
        assignee: Uuid,
    ) -> StoreResult<Option<CompletionOutcome>> {
        Ok(Task::complete(&self.pool, id, assignee).await?)
    }

    async fn apply_points(&self, entry: NewPointsEntry) -> StoreResult<AdjustmentOutcome> {
        Ok(PointsHistory::apply(&self.pool, entry).await?)
    }

    async fn points_history(&self, user_id: Uuid, limit: i64) -> StoreResult<Vec<PointsHistory>> {
        Ok(PointsHistory::list_for_user(&self.pool, user_id, limit).await?)
    }
}
