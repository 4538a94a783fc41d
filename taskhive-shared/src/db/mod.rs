/// Database layer for TaskHive
///
/// This module provides database connection pooling, migrations, and the
/// sqlx-backed stores.
///
/// # Modules
///
/// - `pool`: PostgreSQL connection pool management with health checks
/// - `migrations`: Database migration runner
/// - `credentials`: PostgreSQL implementation of the credential store
/// - `tasks`: Owner-scoped task model and queries
///
/// # Example
///
/// ```no_run
/// use taskhive_shared::db::pool::{create_pool, DatabaseConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = DatabaseConfig {
///         url: std::env::var("DATABASE_URL")?,
///         ..Default::default()
///     };
///
///     let pool = create_pool(config).await?;
///     Ok(())
/// }
/// ```
pub mod credentials;
pub mod migrations;
pub mod pool;
pub mod tasks;
