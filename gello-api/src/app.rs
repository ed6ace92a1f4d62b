/// Application state and router builder
///
/// This module defines the shared application state and builds the Axum
/// router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use gello_api::{app::AppState, config::Config};
/// use gello_shared::auth::supabase::SupabaseAuth;
/// use gello_shared::db::{pool::{create_pool, DatabaseConfig}, postgres::PgStore};
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::load()?;
/// let pool = create_pool(DatabaseConfig {
///     url: config.database.url.clone(),
///     ..Default::default()
/// })
/// .await?;
/// let auth = SupabaseAuth::new(
///     &config.supabase.url,
///     &config.supabase.anon_key,
///     &config.supabase.service_role_key,
/// )?;
///
/// let state = AppState::new(Arc::new(PgStore::new(pool)), Arc::new(auth), config)?;
/// let app = gello_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{
    config::Config,
    cookies,
    error::{ApiError, ApiResult},
    middleware::{csrf::csrf_layer, security::SecurityHeadersLayer},
};
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{delete, get, patch, post},
    Router,
};
use gello_shared::{
    auth::{jwt, permissions::AuthContext, provider::AuthProvider},
    db::store::GelloStore,
    models::user::User,
    shop::{CatalogError, ShopCatalog},
};
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor; every field
/// is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Data store
    pub store: Arc<dyn GelloStore>,

    /// Identity provider
    pub auth: Arc<dyn AuthProvider>,

    /// Application configuration
    pub config: Arc<Config>,

    /// Points-shop catalog
    pub catalog: Arc<ShopCatalog>,
}

impl AppState {
    /// Creates new application state
    ///
    /// The shop catalog comes from `config.shop.items`, or the built-in
    /// catalog when none are configured.
    pub fn new(
        store: Arc<dyn GelloStore>,
        auth: Arc<dyn AuthProvider>,
        config: Config,
    ) -> Result<Self, CatalogError> {
        let catalog = if config.shop.items.is_empty() {
            ShopCatalog::default()
        } else {
            ShopCatalog::new(config.shop.items.clone())?
        };

        Ok(Self {
            store,
            auth,
            config: Arc::new(config),
            catalog: Arc::new(catalog),
        })
    }

    /// Secret access tokens are verified with
    pub fn jwt_secret(&self) -> &str {
        &self.config.supabase.jwt_secret
    }

    /// Secret CSRF tokens are signed with
    pub fn csrf_secret(&self) -> &str {
        &self.config.security.csrf_secret
    }

    /// Whether cookies get the `Secure` attribute
    pub fn secure_cookies(&self) -> bool {
        self.config.api.production
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── GET  /health                       # Health check (public)
/// ├── GET  /api/csrf-token               # CSRF token + cookie (public)
/// ├── /api/auth/                         # Session endpoints (public)
/// │   ├── POST /register
/// │   ├── POST /login
/// │   ├── GET  /session
/// │   ├── POST /refresh
/// │   └── POST /logout
/// ├── /api/boards/    (authenticated)    # Board CRUD
/// ├── /api/lists/     (authenticated)    # List CRUD + reorder
/// ├── /api/tasks/     (authenticated)    # Task CRUD, assign, move, complete
/// ├── /api/teams/     (authenticated)    # Teams and membership
/// ├── /api/users/     (authenticated)    # Profiles and administration
/// ├── /api/points/    (authenticated)    # Leaderboard and ledger
/// └── /points-shop/   (authenticated)    # Catalog and redemption
/// ```
///
/// # Middleware Stack
///
/// Outermost first:
/// 1. Security headers
/// 2. CORS
/// 3. Logging (tower-http TraceLayer)
/// 4. Compression
/// 5. CSRF check on mutating methods
/// 6. Session authentication (per-route basis)
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/session", get(routes::auth::session))
        .route("/refresh", post(routes::auth::refresh))
        .route("/logout", post(routes::auth::logout));

    let board_routes = Router::new()
        .route("/", get(routes::boards::list_boards).post(routes::boards::create_board))
        .route(
            "/:id",
            get(routes::boards::get_board)
                .put(routes::boards::update_board)
                .delete(routes::boards::delete_board),
        );

    let list_routes = Router::new()
        .route("/", get(routes::lists::list_lists).post(routes::lists::create_list))
        .route(
            "/:id",
            get(routes::lists::get_list)
                .put(routes::lists::update_list)
                .delete(routes::lists::delete_list),
        )
        .route("/:id/reorder", patch(routes::lists::reorder_list));

    let task_routes = Router::new()
        .route("/", get(routes::tasks::list_tasks).post(routes::tasks::create_task))
        .route(
            "/:id",
            get(routes::tasks::get_task)
                .put(routes::tasks::update_task)
                .patch(routes::tasks::update_task)
                .delete(routes::tasks::delete_task),
        )
        .route("/:id/assign", patch(routes::tasks::assign_task))
        .route("/:id/move", patch(routes::tasks::move_task))
        .route("/:id/complete", patch(routes::tasks::complete_task));

    let team_routes = Router::new()
        .route("/", get(routes::teams::list_teams).post(routes::teams::create_team))
        .route(
            "/:id",
            get(routes::teams::get_team)
                .put(routes::teams::update_team)
                .delete(routes::teams::delete_team),
        )
        .route("/:id/join", post(routes::teams::join_team))
        .route("/:id/members", post(routes::teams::add_member))
        .route(
            "/:id/members/:user_id",
            delete(routes::teams::remove_member),
        );

    let user_routes = Router::new()
        .route("/", get(routes::users::list_users))
        .route("/me", get(routes::users::get_me).put(routes::users::update_me))
        .route(
            "/:id",
            get(routes::users::get_user).delete(routes::users::delete_user),
        )
        .route("/:id/role", patch(routes::users::update_role));

    let points_routes = Router::new()
        .route("/leaderboard", get(routes::points::leaderboard))
        .route(
            "/users/:id/points",
            get(routes::points::user_points).post(routes::points::award_points),
        );

    let shop_routes = Router::new()
        .route("/", get(routes::shop::shop))
        .route("/redeem/:item_id", post(routes::shop::redeem));

    // Everything below requires a session
    let protected = Router::new()
        .nest("/api/boards", board_routes)
        .nest("/api/lists", list_routes)
        .nest("/api/tasks", task_routes)
        .nest("/api/teams", team_routes)
        .nest("/api/users", user_routes)
        .nest("/api/points", points_routes)
        .nest("/points-shop", shop_routes)
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            session_auth_layer,
        ));

    let public = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/api/csrf-token", get(routes::csrf::csrf_token))
        .nest("/api/auth", auth_routes);

    let cors = cors_layer(&state.config);

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(axum::middleware::from_fn_with_state(state.clone(), csrf_layer))
        .layer(CompressionLayer::new())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    if config.api.cors_origins.iter().any(|origin| origin == "*") {
        // Development mode: permissive CORS
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .api
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static(crate::middleware::csrf::CSRF_HEADER),
        ])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}

/// Access token from `Authorization: Bearer` or, failing that, the cookie
pub fn access_token_from(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty());

    bearer.or_else(|| cookies::read_cookie(headers, cookies::ACCESS_COOKIE))
}

/// Verifies an access token and loads the caller's profile row
///
/// A valid token without a profile row is treated as unauthenticated.
pub async fn authenticate(state: &AppState, token: &str) -> ApiResult<User> {
    let claims = jwt::validate_token(token, state.jwt_secret())?;

    state
        .store
        .find_user(claims.sub)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("No profile exists for this account".to_string()))
}

/// Session authentication middleware layer
///
/// Resolves the caller from the access token, then injects an
/// [`AuthContext`] into request extensions.
async fn session_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = access_token_from(req.headers())
        .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))?;

    let user = authenticate(&state, &token).await?;

    req.extensions_mut().insert(AuthContext::from_user(&user));

    Ok(next.run(req).await)
}
