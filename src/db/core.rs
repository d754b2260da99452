use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous},
    Pool, Sqlite,
};
use std::path::Path;
use std::str::FromStr;
use tokio::time::Duration;
use tracing::{info, instrument};

use crate::error::StoreError;
use crate::TARGET_DB;

/// Handle to the persisted identity records.
///
/// Cloning is cheap; all clones share one connection pool, which is how every
/// worker gets concurrent access to the store.
#[derive(Clone, Debug)]
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    /// Opens an existing store file and verifies its schema.
    ///
    /// The file is never created here: a missing store is a start-up failure.
    #[instrument(target = "db_query", level = "info")]
    pub async fn new(database_path: &str) -> Result<Self, StoreError> {
        info!(target: TARGET_DB, "Opening identity store: {}", database_path);

        if !Path::new(database_path).exists() {
            return Err(StoreError::Unavailable(format!(
                "Database file '{}' does not exist",
                database_path
            )));
        }

        let db = Self::connect(&format!("sqlite://{}", database_path), 5).await?;
        db.verify_schema().await?;

        info!(target: TARGET_DB, "Identity store ready");
        Ok(db)
    }

    /// Connects to any SQLite URL without touching the schema.
    ///
    /// In-memory stores (`sqlite::memory:`) must use a single connection, since
    /// every connection would otherwise see its own empty database.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let connect_options = SqliteConnectOptions::from_str(database_url)?
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5))
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(connect_options)
            .await?;

        info!(target: TARGET_DB, "Database pool created for {}", database_url);
        Ok(Database { pool })
    }

    /// Get access to the database pool
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Cheap liveness probe used at start-up.
    pub async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(self.pool()).await?;
        Ok(())
    }

    pub async fn count_people(&self) -> Result<i64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM people")
            .fetch_one(self.pool())
            .await?;
        Ok(count)
    }
}
