/// Integration tests for boards, lists and tasks
///
/// Covers team scoping (other teams' resources answer 404), role checks
/// for managing content, ordering by position and cascading deletes.

mod common;

use axum::http::StatusCode;
use common::{TestContext, TestUser};
use gello_shared::db::store::GelloStore;
use gello_shared::models::user::UserRole;
use serde_json::json;
use uuid::Uuid;

fn ids(values: &serde_json::Value) -> Vec<String> {
    values
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["id"].as_str().unwrap().to_string())
        .collect()
}

async fn manager_of(ctx: &TestContext, name: &str, team: &str) -> (TestUser, Uuid) {
    let team_id = ctx.team(team).await;
    let manager = ctx.user(name, UserRole::Manager, Some(team_id)).await;
    (manager, team_id)
}

#[tokio::test]
async fn test_board_crud() {
    let ctx = TestContext::new();
    let (manager, team_id) = manager_of(&ctx, "mia", "Core").await;

    let created = ctx
        .post(
            "/api/boards",
            &manager,
            json!({ "name": "  Roadmap ", "description": "Q3 plans" }),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED, "{}", created.body);
    assert_eq!(created.body["name"], "Roadmap");
    assert_eq!(created.body["team_id"], team_id.to_string());
    assert_eq!(created.body["created_by"], manager.id.to_string());

    let id = created.body["id"].as_str().unwrap().to_string();
    let uri = format!("/api/boards/{}", id);

    let fetched = ctx.get(&uri, &manager).await;
    assert_eq!(fetched.status, StatusCode::OK);
    assert_eq!(fetched.body["description"], "Q3 plans");

    let updated = ctx
        .put(&uri, &manager, json!({ "name": "Roadmap 2", "description": "" }))
        .await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.body["name"], "Roadmap 2");
    assert!(updated.body["description"].is_null());

    let empty = ctx.put(&uri, &manager, json!({})).await;
    assert_eq!(empty.status, StatusCode::BAD_REQUEST);

    let listed = ctx.get("/api/boards", &manager).await;
    assert_eq!(ids(&listed.body["boards"]), vec![id.clone()]);

    let deleted = ctx.delete(&uri, &manager).await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);

    let gone = ctx.get(&uri, &manager).await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_member_cannot_manage_boards() {
    let ctx = TestContext::new();
    let (manager, team_id) = manager_of(&ctx, "mia", "Core").await;
    let member = ctx.user("dev", UserRole::Member, Some(team_id)).await;
    let (board_id, _) = ctx.board_with_list(&manager).await;

    let response = ctx
        .post("/api/boards", &member, json!({ "name": "Mine" }))
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.error_code(), "forbidden");

    let response = ctx.delete(&format!("/api/boards/{}", board_id), &member).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    // reading is fine
    let response = ctx.get(&format!("/api/boards/{}", board_id), &member).await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_create_board_without_team() {
    let ctx = TestContext::new();
    let manager = ctx.user("mia", UserRole::Manager, None).await;

    let response = ctx
        .post("/api/boards", &manager, json!({ "name": "Orphan" }))
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_other_team_board_hidden() {
    let ctx = TestContext::new();
    let (alice, _) = manager_of(&ctx, "alice", "Core").await;
    let (bob, bob_team) = manager_of(&ctx, "bob", "Web").await;
    let (board_id, list_id) = ctx.board_with_list(&alice).await;

    let response = ctx.get(&format!("/api/boards/{}", board_id), &bob).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let response = ctx.get(&format!("/api/lists/{}", list_id), &bob).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let response = ctx
        .post(
            "/api/tasks",
            &bob,
            json!({ "list_id": list_id, "title": "Sneaky" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    // can't create boards for another team either
    let response = ctx
        .post(
            "/api/boards",
            &alice,
            json!({ "name": "Theirs", "team_id": bob_team }),
        )
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let listed = ctx.get("/api/boards", &bob).await;
    assert!(listed.body["boards"].as_array().unwrap().is_empty());

    // admins see everything
    let admin = ctx.user("root", UserRole::Admin, None).await;
    let response = ctx.get(&format!("/api/boards/{}", board_id), &admin).await;
    assert_eq!(response.status, StatusCode::OK);

    let listed = ctx.get("/api/boards", &admin).await;
    assert_eq!(listed.body["boards"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_lists_ordered_by_position() {
    let ctx = TestContext::new();
    let (manager, _) = manager_of(&ctx, "mia", "Core").await;
    let (board_id, todo) = ctx.board_with_list(&manager).await;

    let doing = ctx
        .post(
            "/api/lists",
            &manager,
            json!({ "board_id": board_id, "name": "Doing" }),
        )
        .await;
    let done = ctx
        .post(
            "/api/lists",
            &manager,
            json!({ "board_id": board_id, "name": "Done" }),
        )
        .await;
    let doing = doing.body["id"].as_str().unwrap().to_string();
    let done = done.body["id"].as_str().unwrap().to_string();

    let uri = format!("/api/lists?board_id={}", board_id);
    let listed = ctx.get(&uri, &manager).await;
    assert_eq!(
        ids(&listed.body["lists"]),
        vec![todo.to_string(), doing.clone(), done.clone()]
    );

    let moved = ctx
        .patch(
            &format!("/api/lists/{}/reorder", done),
            &manager,
            json!({ "position": -1 }),
        )
        .await;
    assert_eq!(moved.status, StatusCode::BAD_REQUEST);

    let first = ctx
        .patch(
            &format!("/api/lists/{}/reorder", todo),
            &manager,
            json!({ "position": 10 }),
        )
        .await;
    assert_eq!(first.status, StatusCode::OK);

    let listed = ctx.get(&uri, &manager).await;
    assert_eq!(
        ids(&listed.body["lists"]),
        vec![doing, done, todo.to_string()]
    );

    let renamed = ctx
        .put(
            &format!("/api/lists/{}", todo),
            &manager,
            json!({ "name": "Backlog" }),
        )
        .await;
    assert_eq!(renamed.status, StatusCode::OK);
    assert_eq!(renamed.body["name"], "Backlog");
}

#[tokio::test]
async fn test_tasks_ordered_and_updated() {
    let ctx = TestContext::new();
    let (manager, _) = manager_of(&ctx, "mia", "Core").await;
    let (_, list_id) = ctx.board_with_list(&manager).await;

    let a = ctx.task(&manager, list_id, 1, None).await;
    let b = ctx.task(&manager, list_id, 2, None).await;

    let uri = format!("/api/tasks?list_id={}", list_id);
    let listed = ctx.get(&uri, &manager).await;
    assert_eq!(ids(&listed.body["tasks"]), vec![a.to_string(), b.to_string()]);

    let updated = ctx
        .put(
            &format!("/api/tasks/{}", a),
            &manager,
            json!({
                "position": 5,
                "description": "Details",
                "due_date": "2030-01-01T00:00:00Z",
            }),
        )
        .await;
    assert_eq!(updated.status, StatusCode::OK, "{}", updated.body);
    assert_eq!(updated.body["description"], "Details");
    assert!(updated.body["due_date"].is_string());

    let listed = ctx.get(&uri, &manager).await;
    assert_eq!(ids(&listed.body["tasks"]), vec![b.to_string(), a.to_string()]);

    // null clears the due date, absent leaves it alone
    let cleared = ctx
        .patch(&format!("/api/tasks/{}", a), &manager, json!({ "due_date": null }))
        .await;
    assert_eq!(cleared.status, StatusCode::OK);
    assert!(cleared.body["due_date"].is_null());
    assert_eq!(cleared.body["description"], "Details");

    let invalid = ctx
        .patch(
            &format!("/api/tasks/{}", a),
            &manager,
            json!({ "story_points": 5000 }),
        )
        .await;
    assert_eq!(invalid.status, StatusCode::BAD_REQUEST);
    assert_eq!(invalid.error_code(), "validation_error");
}

#[tokio::test]
async fn test_assign_requires_team_member() {
    let ctx = TestContext::new();
    let (manager, team_id) = manager_of(&ctx, "mia", "Core").await;
    let dev = ctx.user("dev", UserRole::Member, Some(team_id)).await;
    let outsider = ctx.user("out", UserRole::Member, None).await;
    let (_, list_id) = ctx.board_with_list(&manager).await;
    let task_id = ctx.task(&manager, list_id, 3, None).await;

    let uri = format!("/api/tasks/{}/assign", task_id);

    let response = ctx
        .patch(&uri, &manager, json!({ "assigned_to": outsider.id }))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["details"][0]["field"], "assigned_to");

    let response = ctx
        .patch(&uri, &manager, json!({ "assigned_to": dev.id }))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["assigned_to"], dev.id.to_string());

    let response = ctx.patch(&uri, &manager, json!({ "assigned_to": null })).await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body["assigned_to"].is_null());

    let response = ctx.patch(&uri, &dev, json!({ "assigned_to": dev.id })).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_move_task() {
    let ctx = TestContext::new();
    let (alice, _) = manager_of(&ctx, "alice", "Core").await;
    let (bob, _) = manager_of(&ctx, "bob", "Web").await;
    let (board_id, todo) = ctx.board_with_list(&alice).await;
    let (_, bob_list) = ctx.board_with_list(&bob).await;

    let done = ctx
        .post(
            "/api/lists",
            &alice,
            json!({ "board_id": board_id, "name": "Done" }),
        )
        .await;
    let done: Uuid = done.body["id"].as_str().unwrap().parse().unwrap();

    let task_id = ctx.task(&alice, todo, 2, None).await;
    let uri = format!("/api/tasks/{}/move", task_id);

    let moved = ctx.patch(&uri, &alice, json!({ "list_id": done })).await;
    assert_eq!(moved.status, StatusCode::OK);
    assert_eq!(moved.body["list_id"], done.to_string());

    // bob's list isn't visible to alice
    let response = ctx.patch(&uri, &alice, json!({ "list_id": bob_list })).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    // an admin sees both, but tasks stay within a team
    let admin = ctx.user("root", UserRole::Admin, None).await;
    let response = ctx.patch(&uri, &admin, json!({ "list_id": bob_list })).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_delete_board_cascades() {
    let ctx = TestContext::new();
    let (manager, team_id) = manager_of(&ctx, "mia", "Core").await;
    let dev = ctx.user("dev", UserRole::Member, Some(team_id)).await;
    let (board_id, list_id) = ctx.board_with_list(&manager).await;
    let task_id = ctx.task(&manager, list_id, 4, Some(dev.id)).await;

    ctx.call(
        axum::http::Method::PATCH,
        &format!("/api/tasks/{}/complete", task_id),
        Some(&dev.token),
        None,
    )
    .await;

    let response = ctx.delete(&format!("/api/boards/{}", board_id), &manager).await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);

    assert!(ctx.store.find_list(list_id).await.unwrap().is_none());
    assert!(ctx.store.find_task(task_id).await.unwrap().is_none());

    // credited points survive the task
    assert_eq!(ctx.balance(dev.id).await, 4);
    assert_eq!(ctx.store.ledger_len().await, 1);
}

#[tokio::test]
async fn test_delete_list_and_task() {
    let ctx = TestContext::new();
    let (manager, _) = manager_of(&ctx, "mia", "Core").await;
    let (_, list_id) = ctx.board_with_list(&manager).await;
    let keep = ctx.task(&manager, list_id, 1, None).await;
    let drop = ctx.task(&manager, list_id, 1, None).await;

    let response = ctx.delete(&format!("/api/tasks/{}", drop), &manager).await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);

    let response = ctx.get(&format!("/api/tasks/{}", drop), &manager).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let response = ctx.delete(&format!("/api/lists/{}", list_id), &manager).await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);

    assert!(ctx.store.find_task(keep).await.unwrap().is_none());
}

#[tokio::test]
async fn test_blank_names_rejected() {
    let ctx = TestContext::new();
    let (manager, team_id) = manager_of(&ctx, "mia", "Core").await;
    let (board_id, list_id) = ctx.board_with_list(&manager).await;

    let response = ctx.post("/api/boards", &manager, json!({ "name": "  " })).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["details"][0]["field"], "name");

    let response = ctx
        .post(
            "/api/lists",
            &manager,
            json!({ "board_id": board_id, "name": "\t" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = ctx
        .post(
            "/api/tasks",
            &manager,
            json!({ "list_id": list_id, "title": "   " }),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["details"][0]["field"], "title");

    let task_id = ctx.task(&manager, list_id, 1, None).await;
    let response = ctx
        .patch(&format!("/api/tasks/{}", task_id), &manager, json!({ "title": " " }))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = ctx
        .put(&format!("/api/teams/{}", team_id), &manager, json!({ "name": "   " }))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    // surrounding whitespace is dropped, not rejected
    let response = ctx
        .post(
            "/api/tasks",
            &manager,
            json!({ "list_id": list_id, "title": "  Fix login  " }),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["title"], "Fix login");
}

#[tokio::test]
async fn test_positions_are_bounded() {
    let ctx = TestContext::new();
    let (manager, _) = manager_of(&ctx, "mia", "Core").await;
    let (board_id, list_id) = ctx.board_with_list(&manager).await;

    let response = ctx
        .post(
            "/api/tasks",
            &manager,
            json!({ "list_id": list_id, "title": "Far out", "position": i32::MAX }),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["details"][0]["field"], "position");

    let response = ctx
        .post(
            "/api/tasks",
            &manager,
            json!({ "list_id": list_id, "title": "Last", "position": 1_000_000 }),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);

    // appending after the largest position stays at it
    let response = ctx
        .post("/api/tasks", &manager, json!({ "list_id": list_id, "title": "After" }))
        .await;
    assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
    assert_eq!(response.body["position"], 1_000_000);

    let list = ctx
        .post(
            "/api/lists",
            &manager,
            json!({ "board_id": board_id, "name": "Done", "position": 1_000_000 }),
        )
        .await;
    assert_eq!(list.status, StatusCode::CREATED);

    let response = ctx
        .post("/api/lists", &manager, json!({ "board_id": board_id, "name": "Later" }))
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["position"], 1_000_000);

    let response = ctx
        .patch(
            &format!("/api/lists/{}/reorder", list.body["id"].as_str().unwrap()),
            &manager,
            json!({ "position": 1_000_001 }),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}
