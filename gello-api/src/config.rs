/// Configuration management for the API server
///
/// Configuration is layered, later sources overriding earlier ones:
///
/// 1. Built-in defaults
/// 2. An optional TOML file, `GELLO_CONFIG` (default `config/gello.toml`)
/// 3. Environment variables prefixed `GELLO__`, with `__` between section and
///    key (a `.env` file is loaded first if present)
///
/// # Environment Variables
///
/// - `GELLO__DATABASE__URL`: PostgreSQL connection string (required)
/// - `GELLO__SUPABASE__URL`: Project URL of the auth service (required)
/// - `GELLO__SUPABASE__ANON_KEY`: Public API key (required)
/// - `GELLO__SUPABASE__SERVICE_ROLE_KEY`: Admin API key (required)
/// - `GELLO__SUPABASE__JWT_SECRET`: Access-token signing secret (required)
/// - `GELLO__SECURITY__CSRF_SECRET`: CSRF token MAC key (required)
/// - `GELLO__API__HOST` / `GELLO__API__PORT`: Bind address (default `0.0.0.0:8080`)
/// - `GELLO__API__CORS_ORIGINS`: Comma-separated origins (default `*`)
/// - `GELLO__LOG__FORMAT`: `pretty` or `json`
/// - `RUST_LOG`: Log filter
///
/// # Example
///
/// ```no_run
/// use gello_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::load()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use config::builder::{ConfigBuilder, DefaultState};
use config::{ConfigError, Environment, File};
use gello_shared::shop::ShopItem;
use serde::{Deserialize, Serialize};

/// Default config file location
pub const DEFAULT_CONFIG_FILE: &str = "config/gello.toml";

/// Shortest accepted signing secret
pub const MIN_SECRET_LENGTH: usize = 32;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// API server configuration
    pub api: ApiConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Hosted auth/database service
    pub supabase: SupabaseConfig,

    /// CSRF protection
    pub security: SecurityConfig,

    /// Leaderboard and ledger limits
    pub points: PointsConfig,

    /// Points-shop catalog override
    #[serde(default)]
    pub shop: ShopConfig,

    /// Log output
    pub log: LogConfig,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// Production mode: `Secure` cookies and HSTS
    pub production: bool,

    /// Allowed CORS origins (`*` allows any)
    pub cors_origins: Vec<String>,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in pool
    pub max_connections: u32,

    /// Minimum number of idle connections
    pub min_connections: u32,

    /// Timeout for acquiring a connection (seconds)
    pub connect_timeout_seconds: u64,
}

/// Hosted auth service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupabaseConfig {
    /// Project URL, e.g. `https://xyz.supabase.co`
    pub url: String,

    /// Public API key
    pub anon_key: String,

    /// Admin API key; only used to delete identities
    pub service_role_key: String,

    /// Secret the service signs access tokens with
    ///
    /// IMPORTANT: Must be at least 32 bytes.
    pub jwt_secret: String,
}

/// CSRF configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Key for CSRF token MACs
    ///
    /// IMPORTANT: Must be at least 32 bytes. Generate with: `openssl rand -hex 32`
    pub csrf_secret: String,
}

/// Points limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointsConfig {
    /// Leaderboard size when no `limit` is given
    pub leaderboard_default_limit: i64,

    /// Largest accepted leaderboard `limit`
    pub leaderboard_max_limit: i64,

    /// Ledger rows returned with a user's points
    pub history_limit: i64,
}

/// Shop configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShopConfig {
    /// Replaces the built-in catalog when non-empty
    #[serde(default)]
    pub items: Vec<ShopItem>,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    Pretty,

    /// One JSON object per event
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    pub format: LogFormat,
}

impl Config {
    /// Loads configuration from defaults, the config file and the environment
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required values are missing
    /// - Values have the wrong type
    /// - Secrets are too short (see [`Config::validate`])
    pub fn load() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        let file = std::env::var("GELLO_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());

        let config: Config = Self::builder()?
            .add_source(File::with_name(&file).required(false))
            .add_source(
                Environment::with_prefix("GELLO")
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("api.cors_origins")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Builder preloaded with defaults for every optional setting
    pub fn builder() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        config::Config::builder()
            .set_default("api.host", "0.0.0.0")?
            .set_default("api.port", 8080)?
            .set_default("api.production", false)?
            .set_default("api.cors_origins", vec!["*"])?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("database.connect_timeout_seconds", 30)?
            .set_default("points.leaderboard_default_limit", 100)?
            .set_default("points.leaderboard_max_limit", 1000)?
            .set_default("points.history_limit", 50)?
            .set_default("log.format", "pretty")
    }

    /// Checks values the type system can't
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.database.url.trim().is_empty() {
            anyhow::bail!("database.url is required");
        }
        if self.supabase.url.trim().is_empty() {
            anyhow::bail!("supabase.url is required");
        }
        if self.supabase.jwt_secret.len() < MIN_SECRET_LENGTH {
            anyhow::bail!(
                "supabase.jwt_secret must be at least {} characters long",
                MIN_SECRET_LENGTH
            );
        }
        if self.security.csrf_secret.len() < MIN_SECRET_LENGTH {
            anyhow::bail!(
                "security.csrf_secret must be at least {} characters long",
                MIN_SECRET_LENGTH
            );
        }

        let points = &self.points;
        if points.leaderboard_default_limit < 1
            || points.leaderboard_max_limit < points.leaderboard_default_limit
        {
            anyhow::bail!("points.leaderboard_default_limit must be between 1 and leaderboard_max_limit");
        }
        if points.history_limit < 1 {
            anyhow::bail!("points.history_limit must be at least 1");
        }

        Ok(())
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}
