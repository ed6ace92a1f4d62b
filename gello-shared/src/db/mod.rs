/// Data access for Gello
///
/// # Modules
///
/// - `pool`: PostgreSQL connection pool management with health checks
/// - `store`: The `GelloStore` trait every handler talks to
/// - `postgres`: `GelloStore` over the model queries
/// - `memory`: `GelloStore` held in process memory
///
/// # Example
///
/// ```no_run
/// use gello_shared::db::pool::{create_pool, DatabaseConfig};
/// use gello_shared::db::postgres::PgStore;
/// use gello_shared::db::store::GelloStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = DatabaseConfig {
///         url: std::env::var("DATABASE_URL")?,
///         ..Default::default()
///     };
///
///     let store = PgStore::new(create_pool(config).await?);
///     store.ping().await?;
///     Ok(())
/// }
/// ```

pub mod memory;
pub mod pool;
pub mod postgres;
pub mod store;
