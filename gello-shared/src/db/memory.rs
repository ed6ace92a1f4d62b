/// In-memory [`GelloStore`] for tests and local development
///
/// Mirrors the Postgres schema's behaviour: unique emails (case-insensitive),
/// foreign keys, cascades and `ON DELETE SET NULL` links. All state sits behind
/// one `RwLock`, so every operation, including task completion and points
/// adjustments, is atomic.
///
/// Timestamps come from a monotonic clock: each write gets a `created_at`
/// strictly later than the previous one, so "oldest first" orderings are the
/// same as insertion order.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::store::{GelloStore, StoreError, StoreResult};
use crate::models::board::{Board, CreateBoard, UpdateBoard};
use crate::models::list::{CreateList, List};
use crate::models::points::{
    adjusted_total, AdjustmentOutcome, NewPointsEntry, PointsHistory, PointsReason,
};
use crate::models::task::{CompletionOutcome, CreateTask, Task, UpdateTask};
use crate::models::team::{CreateTeam, Team, UpdateTeam};
use crate::models::user::{CreateUser, UpdateUser, User, UserRole};
use crate::models::MAX_POSITION;

#[derive(Debug, Default)]
struct MemoryState {
    users: HashMap<Uuid, User>,
    teams: HashMap<Uuid, Team>,
    boards: HashMap<Uuid, Board>,
    lists: HashMap<Uuid, List>,
    tasks: HashMap<Uuid, Task>,
    points: Vec<PointsHistory>,
    last_tick: Option<DateTime<Utc>>,
}

/// Position one past `position`, capped at [`MAX_POSITION`]
fn next_after(position: i32) -> i32 {
    position.saturating_add(1).min(MAX_POSITION)
}

impl MemoryState {
    /// Current time, strictly after every previously returned value
    fn tick(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let next = match self.last_tick {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last_tick = Some(next);
        next
    }

    fn require_user(&self, id: Uuid) -> StoreResult<()> {
        if self.users.contains_key(&id) {
            Ok(())
        } else {
            Err(StoreError::InvalidReference(format!("user {} does not exist", id)))
        }
    }

    fn require_optional_user(&self, id: Option<Uuid>) -> StoreResult<()> {
        id.map_or(Ok(()), |id| self.require_user(id))
    }

    fn remove_tasks_where(&mut self, predicate: impl Fn(&Task) -> bool) {
        let removed: Vec<Uuid> = self
            .tasks
            .values()
            .filter(|task| predicate(task))
            .map(|task| task.id)
            .collect();

        for id in &removed {
            self.tasks.remove(id);
        }

        for entry in self.points.iter_mut() {
            if entry.task_id.is_some_and(|task_id| removed.contains(&task_id)) {
                entry.task_id = None;
            }
        }
    }

    fn remove_lists_where(&mut self, predicate: impl Fn(&List) -> bool) {
        let removed: Vec<Uuid> = self
            .lists
            .values()
            .filter(|list| predicate(list))
            .map(|list| list.id)
            .collect();

        for id in &removed {
            self.lists.remove(id);
        }

        self.remove_tasks_where(|task| removed.contains(&task.list_id));
    }

    fn remove_boards_where(&mut self, predicate: impl Fn(&Board) -> bool) {
        let removed: Vec<Uuid> = self
            .boards
            .values()
            .filter(|board| predicate(board))
            .map(|board| board.id)
            .collect();

        for id in &removed {
            self.boards.remove(id);
        }

        self.remove_lists_where(|list| removed.contains(&list.board_id));
    }

    fn next_list_position(&self, board_id: Uuid) -> i32 {
        self.lists
            .values()
            .filter(|list| list.board_id == board_id)
            .map(|list| next_after(list.position))
            .max()
            .unwrap_or(0)
    }

    fn next_task_position(&self, list_id: Uuid, excluding: Option<Uuid>) -> i32 {
        self.tasks
            .values()
            .filter(|task| task.list_id == list_id && Some(task.id) != excluding)
            .map(|task| next_after(task.position))
            .max()
            .unwrap_or(0)
    }
}

/// Store held entirely in process memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of ledger rows (all users)
    pub async fn ledger_len(&self) -> usize {
        self.state.read().await.points.len()
    }
}

#[async_trait]
impl GelloStore for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn create_user(&self, data: CreateUser) -> StoreResult<User> {
        let mut state = self.state.write().await;

        if state.users.contains_key(&data.id) {
            return Err(StoreError::Conflict(format!("user {} already exists", data.id)));
        }

        let email_taken = state
            .users
            .values()
            .any(|user| user.email.eq_ignore_ascii_case(&data.email));
        if email_taken {
            return Err(StoreError::Conflict(format!("email {} already exists", data.email)));
        }

        let now = state.tick();
        let user = User {
            id: data.id,
            email: data.email,
            display_name: data.display_name,
            role: data.role,
            team_id: None,
            total_points: 0,
            avatar_url: data.avatar_url,
            created_at: now,
            updated_at: now,
        };

        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self
            .state
            .read()
            .await
            .users
            .values()
            .find(|user| user.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let mut users: Vec<User> = self.state.read().await.users.values().cloned().collect();
        users.sort_by_key(|user| (user.created_at, user.id));
        Ok(users)
    }

    async fn list_team_members(&self, team_id: Uuid) -> StoreResult<Vec<User>> {
        let mut users: Vec<User> = self
            .state
            .read()
            .await
            .users
            .values()
            .filter(|user| user.team_id == Some(team_id))
            .cloned()
            .collect();
        users.sort_by_key(|user| (user.created_at, user.id));
        Ok(users)
    }

    async fn update_user(&self, id: Uuid, data: UpdateUser) -> StoreResult<Option<User>> {
        let mut state = self.state.write().await;
        let now = state.tick();

        let Some(user) = state.users.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(display_name) = data.display_name {
            user.display_name = display_name;
        }
        if let Some(avatar_url) = data.avatar_url {
            user.avatar_url = avatar_url;
        }
        user.updated_at = now;

        Ok(Some(user.clone()))
    }

    async fn set_user_role(&self, id: Uuid, role: &UserRole) -> StoreResult<Option<User>> {
        let mut state = self.state.write().await;
        let now = state.tick();

        Ok(state.users.get_mut(&id).map(|user| {
            user.role = role.clone();
            user.updated_at = now;
            user.clone()
        }))
    }

    async fn set_user_team(&self, id: Uuid, team_id: Option<Uuid>) -> StoreResult<Option<User>> {
        let mut state = self.state.write().await;

        if let Some(team_id) = team_id {
            if !state.teams.contains_key(&team_id) {
                return Err(StoreError::InvalidReference(format!(
                    "team {} does not exist",
                    team_id
                )));
            }
        }

        let now = state.tick();
        Ok(state.users.get_mut(&id).map(|user| {
            user.team_id = team_id;
            user.updated_at = now;
            user.clone()
        }))
    }

    async fn delete_user(&self, id: Uuid) -> StoreResult<bool> {
        let mut state = self.state.write().await;

        if state.users.remove(&id).is_none() {
            return Ok(false);
        }

        state.points.retain(|entry| entry.user_id != id);
        for entry in state.points.iter_mut() {
            if entry.awarded_by == Some(id) {
                entry.awarded_by = None;
            }
        }
        for task in state.tasks.values_mut() {
            if task.assigned_to == Some(id) {
                task.assigned_to = None;
            }
            if task.created_by == Some(id) {
                task.created_by = None;
            }
        }
        for board in state.boards.values_mut() {
            if board.created_by == Some(id) {
                board.created_by = None;
            }
        }

        Ok(true)
    }

    async fn leaderboard(&self, team_id: Option<Uuid>, limit: i64) -> StoreResult<Vec<User>> {
        let mut users: Vec<User> = self
            .state
            .read()
            .await
            .users
            .values()
            .filter(|user| team_id.is_none() || user.team_id == team_id)
            .cloned()
            .collect();

        users.sort_by(|a, b| {
            b.total_points
                .cmp(&a.total_points)
                .then(a.created_at.cmp(&b.created_at))
                .then(a.id.cmp(&b.id))
        });
        users.truncate(usize::try_from(limit.max(0)).unwrap_or(usize::MAX));

        Ok(users)
    }

    async fn create_team(&self, data: CreateTeam) -> StoreResult<Team> {
        let mut state = self.state.write().await;
        let now = state.tick();

        let team = Team {
            id: Uuid::new_v4(),
            name: data.name,
            created_at: now,
            updated_at: now,
        };

        state.teams.insert(team.id, team.clone());
        Ok(team)
    }

    async fn find_team(&self, id: Uuid) -> StoreResult<Option<Team>> {
        Ok(self.state.read().await.teams.get(&id).cloned())
    }

    async fn list_teams(&self) -> StoreResult<Vec<Team>> {
        let mut teams: Vec<Team> = self.state.read().await.teams.values().cloned().collect();
        teams.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(teams)
    }

    async fn update_team(&self, id: Uuid, data: UpdateTeam) -> StoreResult<Option<Team>> {
        let mut state = self.state.write().await;
        let now = state.tick();

        Ok(state.teams.get_mut(&id).map(|team| {
            if let Some(name) = data.name {
                team.name = name;
            }
            team.updated_at = now;
            team.clone()
        }))
    }

    async fn delete_team(&self, id: Uuid) -> StoreResult<bool> {
        let mut state = self.state.write().await;

        if state.teams.remove(&id).is_none() {
            return Ok(false);
        }

        state.remove_boards_where(|board| board.team_id == id);
        for user in state.users.values_mut() {
            if user.team_id == Some(id) {
                user.team_id = None;
            }
        }

        Ok(true)
    }

    async fn create_board(&self, data: CreateBoard) -> StoreResult<Board> {
        let mut state = self.state.write().await;

        if !state.teams.contains_key(&data.team_id) {
            return Err(StoreError::InvalidReference(format!(
                "team {} does not exist",
                data.team_id
            )));
        }
        state.require_optional_user(data.created_by)?;

        let now = state.tick();
        let board = Board {
            id: Uuid::new_v4(),
            name: data.name,
            description: data.description,
            team_id: data.team_id,
            created_by: data.created_by,
            created_at: now,
            updated_at: now,
        };

        state.boards.insert(board.id, board.clone());
        Ok(board)
    }

    async fn find_board(&self, id: Uuid) -> StoreResult<Option<Board>> {
        Ok(self.state.read().await.boards.get(&id).cloned())
    }

    async fn list_boards(&self, team_id: Option<Uuid>) -> StoreResult<Vec<Board>> {
        let mut boards: Vec<Board> = self
            .state
            .read()
            .await
            .boards
            .values()
            .filter(|board| team_id.is_none() || Some(board.team_id) == team_id)
            .cloned()
            .collect();
        boards.sort_by_key(|board| (board.created_at, board.id));
        Ok(boards)
    }

    async fn update_board(&self, id: Uuid, data: UpdateBoard) -> StoreResult<Option<Board>> {
        let mut state = self.state.write().await;
        let now = state.tick();

        Ok(state.boards.get_mut(&id).map(|board| {
            if let Some(name) = data.name {
                board.name = name;
            }
            if let Some(description) = data.description {
                board.description = description;
            }
            board.updated_at = now;
            board.clone()
        }))
    }

    async fn delete_board(&self, id: Uuid) -> StoreResult<bool> {
        let mut state = self.state.write().await;

        if !state.boards.contains_key(&id) {
            return Ok(false);
        }

        state.remove_boards_where(|board| board.id == id);
        Ok(true)
    }

    async fn create_list(&self, data: CreateList) -> StoreResult<List> {
        let mut state = self.state.write().await;

        if !state.boards.contains_key(&data.board_id) {
            return Err(StoreError::InvalidReference(format!(
                "board {} does not exist",
                data.board_id
            )));
        }

        let position = data
            .position
            .unwrap_or_else(|| state.next_list_position(data.board_id));
        let now = state.tick();
        let list = List {
            id: Uuid::new_v4(),
            board_id: data.board_id,
            name: data.name,
            position,
            created_at: now,
            updated_at: now,
        };

        state.lists.insert(list.id, list.clone());
        Ok(list)
    }

    async fn find_list(&self, id: Uuid) -> StoreResult<Option<List>> {
        Ok(self.state.read().await.lists.get(&id).cloned())
    }

    async fn list_lists(&self, board_id: Uuid) -> StoreResult<Vec<List>> {
        let mut lists: Vec<List> = self
            .state
            .read()
            .await
            .lists
            .values()
            .filter(|list| list.board_id == board_id)
            .cloned()
            .collect();
        lists.sort_by_key(|list| (list.position, list.created_at));
        Ok(lists)
    }

    async fn rename_list(&self, id: Uuid, name: &str) -> StoreResult<Option<List>> {
        let mut state = self.state.write().await;
        let now = state.tick();

        Ok(state.lists.get_mut(&id).map(|list| {
            list.name = name.to_string();
            list.updated_at = now;
            list.clone()
        }))
    }

    async fn reorder_list(&self, id: Uuid, position: i32) -> StoreResult<Option<List>> {
        let mut state = self.state.write().await;
        let now = state.tick();

        Ok(state.lists.get_mut(&id).map(|list| {
            list.position = position;
            list.updated_at = now;
            list.clone()
        }))
    }

    async fn delete_list(&self, id: Uuid) -> StoreResult<bool> {
        let mut state = self.state.write().await;

        if !state.lists.contains_key(&id) {
            return Ok(false);
        }

        state.remove_lists_where(|list| list.id == id);
        Ok(true)
    }

    async fn create_task(&self, data: CreateTask) -> StoreResult<Task> {
        let mut state = self.state.write().await;

        if !state.lists.contains_key(&data.list_id) {
            return Err(StoreError::InvalidReference(format!(
                "list {} does not exist",
                data.list_id
            )));
        }
        state.require_optional_user(data.assigned_to)?;
        state.require_optional_user(data.created_by)?;

        let position = data
            .position
            .unwrap_or_else(|| state.next_task_position(data.list_id, None));
        let now = state.tick();
        let task = Task {
            id: Uuid::new_v4(),
            list_id: data.list_id,
            title: data.title,
            description: data.description,
            story_points: data.story_points,
            assigned_to: data.assigned_to,
            position,
            due_date: data.due_date,
            completed_at: None,
            created_by: data.created_by,
            created_at: now,
            updated_at: now,
        };

        state.tasks.insert(task.id, task.clone());
        Ok(task)
    }

    async fn find_task(&self, id: Uuid) -> StoreResult<Option<Task>> {
        Ok(self.state.read().await.tasks.get(&id).cloned())
    }

    async fn list_tasks(&self, list_id: Uuid) -> StoreResult<Vec<Task>> {
        let mut tasks: Vec<Task> = self
            .state
            .read()
            .await
            .tasks
            .values()
            .filter(|task| task.list_id == list_id)
            .cloned()
            .collect();
        tasks.sort_by_key(|task| (task.position, task.created_at));
        Ok(tasks)
    }

    async fn update_task(&self, id: Uuid, data: UpdateTask) -> StoreResult<Option<Task>> {
        let mut state = self.state.write().await;
        let now = state.tick();

        let Some(task) = state.tasks.get_mut(&id) else {
            return Ok(None);
        };

        if task.is_completed() && data.story_points.is_some_and(|p| p != task.story_points) {
            return Err(StoreError::TaskCompleted);
        }

        if let Some(title) = data.title {
            task.title = title;
        }
        if let Some(description) = data.description {
            task.description = description;
        }
        if let Some(story_points) = data.story_points {
            task.story_points = story_points;
        }
        if let Some(position) = data.position {
            task.position = position;
        }
        if let Some(due_date) = data.due_date {
            task.due_date = due_date;
        }
        task.updated_at = now;

        Ok(Some(task.clone()))
    }

    async fn assign_task(&self, id: Uuid, assigned_to: Option<Uuid>) -> StoreResult<Option<Task>> {
        let mut state = self.state.write().await;
        state.require_optional_user(assigned_to)?;
        let now = state.tick();

        let Some(task) = state.tasks.get_mut(&id) else {
            return Ok(None);
        };

        if task.is_completed() {
            return Err(StoreError::TaskCompleted);
        }

        task.assigned_to = assigned_to;
        task.updated_at = now;

        Ok(Some(task.clone()))
    }

    async fn move_task(
        &self,
        id: Uuid,
        list_id: Uuid,
        position: Option<i32>,
    ) -> StoreResult<Option<Task>> {
        let mut state = self.state.write().await;

        if !state.lists.contains_key(&list_id) {
            return Err(StoreError::InvalidReference(format!(
                "list {} does not exist",
                list_id
            )));
        }

        let position = position.unwrap_or_else(|| state.next_task_position(list_id, Some(id)));
        let now = state.tick();

        Ok(state.tasks.get_mut(&id).map(|task| {
            task.list_id = list_id;
            task.position = position;
            task.updated_at = now;
            task.clone()
        }))
    }

    async fn delete_task(&self, id: Uuid) -> StoreResult<bool> {
        let mut state = self.state.write().await;

        if !state.tasks.contains_key(&id) {
            return Ok(false);
        }

        state.remove_tasks_where(|task| task.id == id);
        Ok(true)
    }

    async fn complete_task(
        &self,
        id: Uuid,
        assignee: Uuid,
    ) -> StoreResult<Option<CompletionOutcome>> {
        let mut state = self.state.write().await;

        let Some(task) = state.tasks.get(&id).cloned() else {
            return Ok(None);
        };

        if task.is_completed() {
            return Ok(Some(CompletionOutcome::AlreadyCompleted { task }));
        }
        if task.assigned_to != Some(assignee) {
            return Ok(Some(CompletionOutcome::AssigneeMismatch { task }));
        }

        let points_awarded = i64::from(task.story_points);
        let now = state.tick();

        let user = state.users.get_mut(&assignee).ok_or(StoreError::NotFound)?;
        user.total_points += points_awarded;
        user.updated_at = now;
        let total_points = user.total_points;

        let task = match state.tasks.get_mut(&id) {
            Some(task) => {
                task.completed_at = Some(now);
                task.updated_at = now;
                task.clone()
            }
            None => return Err(StoreError::NotFound),
        };

        state.points.push(PointsHistory {
            id: Uuid::new_v4(),
            user_id: assignee,
            points_earned: points_awarded,
            reason: PointsReason::TaskComplete,
            task_id: Some(id),
            awarded_by: None,
            notes: None,
            created_at: now,
        });

        Ok(Some(CompletionOutcome::Completed {
            task,
            points_awarded,
            total_points,
        }))
    }

    async fn apply_points(&self, entry: NewPointsEntry) -> StoreResult<AdjustmentOutcome> {
        let mut state = self.state.write().await;

        let Some(available) = state.users.get(&entry.user_id).map(|user| user.total_points) else {
            return Ok(AdjustmentOutcome::UserNotFound);
        };

        let Some(total_points) = adjusted_total(available, entry.points_earned) else {
            return Ok(AdjustmentOutcome::InsufficientPoints {
                available,
                required: entry.points_earned.saturating_neg(),
            });
        };

        state.require_optional_user(entry.awarded_by)?;

        let now = state.tick();
        if let Some(user) = state.users.get_mut(&entry.user_id) {
            user.total_points = total_points;
            user.updated_at = now;
        }

        let row = PointsHistory {
            id: Uuid::new_v4(),
            user_id: entry.user_id,
            points_earned: entry.points_earned,
            reason: entry.reason,
            task_id: entry.task_id,
            awarded_by: entry.awarded_by,
            notes: entry.notes,
            created_at: now,
        };
        state.points.push(row.clone());

        Ok(AdjustmentOutcome::Applied {
            entry: row,
            total_points,
        })
    }

    async fn points_history(&self, user_id: Uuid, limit: i64) -> StoreResult<Vec<PointsHistory>> {
        let mut history: Vec<PointsHistory> = self
            .state
            .read()
            .await
            .points
            .iter()
            .filter(|entry| entry.user_id == user_id)
            .cloned()
            .collect();

        history.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        history.truncate(usize::try_from(limit.max(0)).unwrap_or(usize::MAX));

        Ok(history)
    }
}
