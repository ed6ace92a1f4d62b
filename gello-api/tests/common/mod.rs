//! Common test utilities for integration tests
//!
//! The router is built over the in-memory store and the in-memory auth
//! provider, so these tests need no external services. Users sign up through
//! the real `/api/auth/register` endpoint; roles and teams are then set on
//! the store directly.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use gello_api::app::{build_router, AppState};
use gello_api::config::{
    ApiConfig, Config, DatabaseConfig, LogConfig, LogFormat, PointsConfig, SecurityConfig,
    ShopConfig, SupabaseConfig,
};
use gello_shared::auth::csrf::issue_token;
use gello_shared::auth::local::LocalAuth;
use gello_shared::auth::password::HashCost;
use gello_shared::db::memory::MemoryStore;
use gello_shared::db::store::GelloStore;
use gello_shared::models::team::CreateTeam;
use gello_shared::models::user::UserRole;
use serde_json::{json, Value};
use tower::Service as _;
use uuid::Uuid;

pub const JWT_SECRET: &str = "integration-test-jwt-secret-at-least-32-bytes";
pub const CSRF_SECRET: &str = "integration-test-csrf-secret-at-least-32-bytes";
pub const PASSWORD: &str = "correct horse battery";

/// Configuration with test secrets and default limits
pub fn test_config() -> Config {
    Config {
        api: ApiConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            production: false,
            cors_origins: vec!["*".to_string()],
        },
        database: DatabaseConfig {
            url: "postgresql://unused/gello".to_string(),
            max_connections: 1,
            min_connections: 0,
            connect_timeout_seconds: 1,
        },
        supabase: SupabaseConfig {
            url: "http://unused".to_string(),
            anon_key: "anon".to_string(),
            service_role_key: "service".to_string(),
            jwt_secret: JWT_SECRET.to_string(),
        },
        security: SecurityConfig {
            csrf_secret: CSRF_SECRET.to_string(),
        },
        points: PointsConfig {
            leaderboard_default_limit: 100,
            leaderboard_max_limit: 1000,
            history_limit: 50,
        },
        shop: ShopConfig::default(),
        log: LogConfig {
            format: LogFormat::Pretty,
        },
    }
}

/// Decoded response
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    /// All `Set-Cookie` values
    pub fn set_cookies(&self) -> Vec<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(str::to_string)
            .collect()
    }

    /// Value set for cookie `name`, if any
    pub fn cookie(&self, name: &str) -> Option<String> {
        self.set_cookies().into_iter().find_map(|cookie| {
            let (pair, _) = cookie.split_once(';')?;
            let (key, value) = pair.split_once('=')?;
            (key == name).then(|| value.to_string())
        })
    }

    /// The `error` code of an error body
    pub fn error_code(&self) -> &str {
        self.body["error"].as_str().unwrap_or_default()
    }
}

/// A registered user and their access token
#[derive(Debug, Clone)]
pub struct TestUser {
    pub id: Uuid,
    pub email: String,
    pub token: String,
}

/// Test context containing the router and its collaborators
pub struct TestContext {
    pub app: Router,
    pub store: Arc<MemoryStore>,
    pub auth: Arc<LocalAuth>,
    pub csrf_token: String,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: Config) -> Self {
        let store = Arc::new(MemoryStore::new());
        let auth = Arc::new(LocalAuth::new(JWT_SECRET).with_hash_cost(HashCost::Fast));

        let state = AppState::new(store.clone(), auth.clone(), config)
            .expect("Failed to build app state");

        Self {
            app: build_router(state),
            store,
            auth,
            csrf_token: issue_token(CSRF_SECRET),
        }
    }

    /// Sends a raw request
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.app.clone().call(request).await.unwrap();

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).to_string())
            })
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }

    /// Sends a JSON request with a bearer token and, for mutating methods, a
    /// valid CSRF cookie/header pair
    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method.clone()).uri(uri);

        if method != Method::GET {
            builder = builder
                .header(header::COOKIE, format!("gello-csrf={}", self.csrf_token))
                .header("x-csrf-token", &self.csrf_token);
        }
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        self.send(request).await
    }

    pub async fn get(&self, uri: &str, user: &TestUser) -> TestResponse {
        self.call(Method::GET, uri, Some(&user.token), None).await
    }

    pub async fn post(&self, uri: &str, user: &TestUser, body: Value) -> TestResponse {
        self.call(Method::POST, uri, Some(&user.token), Some(body)).await
    }

    pub async fn put(&self, uri: &str, user: &TestUser, body: Value) -> TestResponse {
        self.call(Method::PUT, uri, Some(&user.token), Some(body)).await
    }

    pub async fn patch(&self, uri: &str, user: &TestUser, body: Value) -> TestResponse {
        self.call(Method::PATCH, uri, Some(&user.token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, user: &TestUser) -> TestResponse {
        self.call(Method::DELETE, uri, Some(&user.token), None).await
    }

    /// Registers a member through the API
    pub async fn register(&self, name: &str) -> TestUser {
        let email = format!("{}@example.com", name);
        let response = self
            .call(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({
                    "email": email,
                    "password": PASSWORD,
                    "display_name": name,
                })),
            )
            .await;

        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);

        TestUser {
            id: response.body["user"]["id"].as_str().unwrap().parse().unwrap(),
            email,
            token: response.cookie("sb-access-token").expect("access cookie"),
        }
    }

    /// Registers a user, then sets their role and team
    pub async fn user(&self, name: &str, role: UserRole, team_id: Option<Uuid>) -> TestUser {
        let user = self.register(name).await;

        self.store.set_user_role(user.id, &role).await.unwrap();
        if team_id.is_some() {
            self.store.set_user_team(user.id, team_id).await.unwrap();
        }

        user
    }

    pub async fn team(&self, name: &str) -> Uuid {
        self.store
            .create_team(CreateTeam {
                name: name.to_string(),
            })
            .await
            .unwrap()
            .id
    }

    /// Board with one list, created by `manager` in their team
    pub async fn board_with_list(&self, manager: &TestUser) -> (Uuid, Uuid) {
        let board = self
            .post("/api/boards", manager, json!({ "name": "Sprint 1" }))
            .await;
        assert_eq!(board.status, StatusCode::CREATED, "{}", board.body);
        let board_id = board.body["id"].as_str().unwrap().to_string();

        let list = self
            .post(
                "/api/lists",
                manager,
                json!({ "board_id": board_id, "name": "Todo" }),
            )
            .await;
        assert_eq!(list.status, StatusCode::CREATED, "{}", list.body);

        (
            board_id.parse().unwrap(),
            list.body["id"].as_str().unwrap().parse().unwrap(),
        )
    }

    /// Task on `list_id` created by `manager`
    pub async fn task(
        &self,
        manager: &TestUser,
        list_id: Uuid,
        story_points: i32,
        assigned_to: Option<Uuid>,
    ) -> Uuid {
        let task = self
            .post(
                "/api/tasks",
                manager,
                json!({
                    "list_id": list_id,
                    "title": "Write release notes",
                    "story_points": story_points,
                    "assigned_to": assigned_to,
                }),
            )
            .await;
        assert_eq!(task.status, StatusCode::CREATED, "{}", task.body);

        task.body["id"].as_str().unwrap().parse().unwrap()
    }

    /// Balance as stored
    pub async fn balance(&self, user_id: Uuid) -> i64 {
        self.store
            .find_user(user_id)
            .await
            .unwrap()
            .unwrap()
            .total_points
    }
}
