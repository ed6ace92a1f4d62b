/// Behavioural tests for the in-memory store
///
/// These run without any external service and pin down the store contract the
/// API relies on: cascades, ordering, completion at most once, and balances
/// that never go negative.

use std::sync::Arc;

use gello_shared::db::memory::MemoryStore;
use gello_shared::db::store::{GelloStore, StoreError};
use gello_shared::models::board::{CreateBoard, UpdateBoard};
use gello_shared::models::list::CreateList;
use gello_shared::models::points::{AdjustmentOutcome, NewPointsEntry, PointsReason};
use gello_shared::models::task::{CompletionOutcome, CreateTask, Task, UpdateTask};
use gello_shared::models::team::CreateTeam;
use gello_shared::models::user::{CreateUser, User, UserRole};
use gello_shared::models::MAX_POSITION;
use uuid::Uuid;

async fn seed_user(store: &MemoryStore, name: &str) -> User {
    store
        .create_user(CreateUser {
            id: Uuid::new_v4(),
            email: format!("{}@example.com", name),
            display_name: name.to_string(),
            role: UserRole::Member,
            avatar_url: None,
        })
        .await
        .expect("Failed to create user")
}

/// Team -> board -> list -> one task assigned to `assignee`
async fn seed_task(store: &MemoryStore, assignee: Option<Uuid>, story_points: i32) -> Task {
    let team = store
        .create_team(CreateTeam { name: "Core".to_string() })
        .await
        .unwrap();
    let board = store
        .create_board(CreateBoard {
            name: "Sprint".to_string(),
            description: None,
            team_id: team.id,
            created_by: None,
        })
        .await
        .unwrap();
    let list = store
        .create_list(CreateList {
            board_id: board.id,
            name: "Todo".to_string(),
            position: None,
        })
        .await
        .unwrap();

    store
        .create_task(CreateTask {
            list_id: list.id,
            title: "Ship it".to_string(),
            description: None,
            story_points,
            assigned_to: assignee,
            position: None,
            due_date: None,
            created_by: None,
        })
        .await
        .unwrap()
}

#[tokio::test]
async fn test_duplicate_email_is_conflict() {
    let store = MemoryStore::new();
    seed_user(&store, "ada").await;

    let result = store
        .create_user(CreateUser {
            id: Uuid::new_v4(),
            email: "ADA@example.com".to_string(),
            display_name: "Other".to_string(),
            role: UserRole::Member,
            avatar_url: None,
        })
        .await;

    assert!(matches!(result, Err(StoreError::Conflict(_))));
}

#[tokio::test]
async fn test_complete_awards_once() {
    let store = MemoryStore::new();
    let user = seed_user(&store, "ada").await;
    let task = seed_task(&store, Some(user.id), 5).await;

    let first = store.complete_task(task.id, user.id).await.unwrap().unwrap();
    let CompletionOutcome::Completed {
        task: completed,
        points_awarded,
        total_points,
    } = first
    else {
        panic!("expected first completion to award points");
    };
    assert_eq!(points_awarded, 5);
    assert_eq!(total_points, 5);

    let second = store.complete_task(task.id, user.id).await.unwrap().unwrap();
    let CompletionOutcome::AlreadyCompleted { task: again } = second else {
        panic!("expected repeat completion to be a no-op");
    };
    assert_eq!(again.completed_at, completed.completed_at);

    let user = store.find_user(user.id).await.unwrap().unwrap();
    assert_eq!(user.total_points, 5);
    assert_eq!(store.points_history(user.id, 50).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_concurrent_completion_awards_once() {
    let store = Arc::new(MemoryStore::new());
    let user = seed_user(&store, "ada").await;
    let task = seed_task(&store, Some(user.id), 8).await;
    let (task_id, user_id) = (task.id, user.id);

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.complete_task(task_id, user_id).await })
        })
        .collect();

    let mut completed = 0;
    for handle in handles {
        match handle.await.unwrap().unwrap().unwrap() {
            CompletionOutcome::Completed { .. } => completed += 1,
            CompletionOutcome::AlreadyCompleted { .. } => {}
            CompletionOutcome::AssigneeMismatch { .. } => panic!("assignee did not change"),
        }
    }

    assert_eq!(completed, 1);
    assert_eq!(store.ledger_len().await, 1);
    assert_eq!(store.find_user(user.id).await.unwrap().unwrap().total_points, 8);
}

#[tokio::test]
async fn test_complete_by_other_user_is_mismatch() {
    let store = MemoryStore::new();
    let ada = seed_user(&store, "ada").await;
    let bob = seed_user(&store, "bob").await;
    let task = seed_task(&store, Some(ada.id), 3).await;

    let outcome = store.complete_task(task.id, bob.id).await.unwrap().unwrap();
    assert!(matches!(outcome, CompletionOutcome::AssigneeMismatch { .. }));
    assert_eq!(store.ledger_len().await, 0);

    assert!(store.complete_task(Uuid::new_v4(), ada.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_apply_points_refuses_negative_balance() {
    let store = MemoryStore::new();
    let user = seed_user(&store, "ada").await;

    let entry = |points_earned| NewPointsEntry {
        user_id: user.id,
        points_earned,
        reason: PointsReason::ManualAward,
        task_id: None,
        awarded_by: None,
        notes: None,
    };

    let applied = store.apply_points(entry(10)).await.unwrap();
    assert!(matches!(applied, AdjustmentOutcome::Applied { total_points: 10, .. }));

    let refused = store.apply_points(entry(-11)).await.unwrap();
    assert!(matches!(
        refused,
        AdjustmentOutcome::InsufficientPoints {
            available: 10,
            required: 11
        }
    ));

    let drained = store.apply_points(entry(-10)).await.unwrap();
    assert!(matches!(drained, AdjustmentOutcome::Applied { total_points: 0, .. }));

    let missing = store
        .apply_points(NewPointsEntry {
            user_id: Uuid::new_v4(),
            ..entry(1)
        })
        .await
        .unwrap();
    assert!(matches!(missing, AdjustmentOutcome::UserNotFound));
}

#[tokio::test]
async fn test_history_newest_first() {
    let store = MemoryStore::new();
    let user = seed_user(&store, "ada").await;

    for points in [1, 2, 3] {
        store
            .apply_points(NewPointsEntry {
                user_id: user.id,
                points_earned: points,
                reason: PointsReason::ManualAward,
                task_id: None,
                awarded_by: None,
                notes: None,
            })
            .await
            .unwrap();
    }

    let history = store.points_history(user.id, 2).await.unwrap();
    let amounts: Vec<i64> = history.iter().map(|e| e.points_earned).collect();
    assert_eq!(amounts, vec![3, 2]);
}

#[tokio::test]
async fn test_leaderboard_order_breaks_ties_by_registration() {
    let store = MemoryStore::new();
    let mut ids = Vec::new();

    for (name, points) in [("a", 30), ("b", 50), ("c", 30), ("d", 10)] {
        let user = seed_user(&store, name).await;
        store
            .apply_points(NewPointsEntry {
                user_id: user.id,
                points_earned: points,
                reason: PointsReason::ManualAward,
                task_id: None,
                awarded_by: None,
                notes: None,
            })
            .await
            .unwrap();
        ids.push(user.id);
    }

    let board = store.leaderboard(None, 100).await.unwrap();
    let order: Vec<Uuid> = board.iter().map(|u| u.id).collect();
    assert_eq!(order, vec![ids[1], ids[0], ids[2], ids[3]]);

    assert_eq!(store.leaderboard(None, 2).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_board_delete_cascades() {
    let store = MemoryStore::new();
    let user = seed_user(&store, "ada").await;
    let task = seed_task(&store, Some(user.id), 2).await;
    store.complete_task(task.id, user.id).await.unwrap();

    let list = store.find_list(task.list_id).await.unwrap().unwrap();
    assert!(store.delete_board(list.board_id).await.unwrap());

    assert!(store.find_list(list.id).await.unwrap().is_none());
    assert!(store.find_task(task.id).await.unwrap().is_none());

    // the ledger keeps the points, only the task link is cleared
    let history = store.points_history(user.id, 10).await.unwrap();
    assert_eq!(history.len(), 1);
    assert!(history[0].task_id.is_none());
    assert_eq!(store.find_user(user.id).await.unwrap().unwrap().total_points, 2);
}

#[tokio::test]
async fn test_team_delete_detaches_members() {
    let store = MemoryStore::new();
    let user = seed_user(&store, "ada").await;
    let team = store
        .create_team(CreateTeam { name: "Core".to_string() })
        .await
        .unwrap();

    store.set_user_team(user.id, Some(team.id)).await.unwrap();
    assert!(store.delete_team(team.id).await.unwrap());

    assert!(store.find_user(user.id).await.unwrap().unwrap().team_id.is_none());
    assert!(matches!(
        store.set_user_team(user.id, Some(team.id)).await,
        Err(StoreError::InvalidReference(_))
    ));
}

#[tokio::test]
async fn test_positions_append_and_reorder() {
    let store = MemoryStore::new();
    let task = seed_task(&store, None, 0).await;
    let list = store.find_list(task.list_id).await.unwrap().unwrap();

    let second = store
        .create_list(CreateList {
            board_id: list.board_id,
            name: "Doing".to_string(),
            position: None,
        })
        .await
        .unwrap();
    assert_eq!(list.position, 0);
    assert_eq!(second.position, 1);

    store.reorder_list(second.id, -1).await.unwrap();
    let names: Vec<String> = store
        .list_lists(list.board_id)
        .await
        .unwrap()
        .into_iter()
        .map(|l| l.name)
        .collect();
    assert_eq!(names, vec!["Doing", "Todo"]);

    let moved = store.move_task(task.id, second.id, None).await.unwrap().unwrap();
    assert_eq!(moved.list_id, second.id);
    assert_eq!(moved.position, 0);
}

#[tokio::test]
async fn test_update_board_and_task() {
    let store = MemoryStore::new();
    let task = seed_task(&store, None, 1).await;
    let list = store.find_list(task.list_id).await.unwrap().unwrap();

    let board = store
        .update_board(
            list.board_id,
            UpdateBoard {
                name: Some("Renamed".to_string()),
                description: Some(Some("desc".to_string())),
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(board.name, "Renamed");
    assert_eq!(board.description.as_deref(), Some("desc"));

    let task = store
        .update_task(
            task.id,
            UpdateTask {
                story_points: Some(13),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(task.story_points, 13);
    assert_eq!(task.title, "Ship it");

    assert!(store
        .update_task(Uuid::new_v4(), UpdateTask::default())
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_assign_requires_existing_user() {
    let store = MemoryStore::new();
    let task = seed_task(&store, None, 1).await;

    assert!(matches!(
        store.assign_task(task.id, Some(Uuid::new_v4())).await,
        Err(StoreError::InvalidReference(_))
    ));
}

#[tokio::test]
async fn test_completed_task_refuses_point_and_assignee_changes() {
    let store = MemoryStore::new();
    let user = seed_user(&store, "ada").await;
    let other = seed_user(&store, "bob").await;
    let task = seed_task(&store, Some(user.id), 5).await;
    store.complete_task(task.id, user.id).await.unwrap();

    let result = store
        .update_task(
            task.id,
            UpdateTask {
                story_points: Some(50),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(result, Err(StoreError::TaskCompleted)));

    assert!(matches!(
        store.assign_task(task.id, Some(other.id)).await,
        Err(StoreError::TaskCompleted)
    ));

    // unchanged points and other fields still go through
    let task = store
        .update_task(
            task.id,
            UpdateTask {
                title: Some("Shipped".to_string()),
                story_points: Some(5),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(task.title, "Shipped");
    assert_eq!(task.story_points, 5);
    assert_eq!(task.assigned_to, Some(user.id));
}

#[tokio::test]
async fn test_append_after_largest_position() {
    let store = MemoryStore::new();
    let task = seed_task(&store, None, 0).await;

    let last = store
        .create_task(CreateTask {
            list_id: task.list_id,
            title: "Last".to_string(),
            description: None,
            story_points: 0,
            assigned_to: None,
            position: Some(MAX_POSITION),
            due_date: None,
            created_by: None,
        })
        .await
        .unwrap();

    let appended = store
        .create_task(CreateTask {
            list_id: task.list_id,
            title: "After".to_string(),
            description: None,
            story_points: 0,
            assigned_to: None,
            position: None,
            due_date: None,
            created_by: None,
        })
        .await
        .unwrap();

    assert_eq!(last.position, MAX_POSITION);
    assert_eq!(appended.position, MAX_POSITION);
}
