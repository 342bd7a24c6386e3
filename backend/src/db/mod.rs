//! Connection pool and schema bootstrap.

pub mod schema;

use std::sync::Arc;

use sqlx::AnyPool;
use sqlx::any::AnyPoolOptions;
use tracing::info;

/// The runner issues one store call at a time.
const MAX_CONNECTIONS: u32 = 4;

#[derive(Clone)]
pub struct Db {
    pub pool: Arc<AnyPool>,
}

impl Db {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        Self::connect_with(database_url, MAX_CONNECTIONS).await
    }

    pub async fn connect_with(database_url: &str, max_connections: u32) -> anyhow::Result<Self> {
        // AnyPool resolves the driver from the URL scheme at connect time.
        sqlx::any::install_default_drivers();

        let pool = AnyPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        info!(target: "db", max_connections, "database pool ready");
        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    /// Private in-memory SQLite database, already migrated.
    ///
    /// The random name isolates concurrent callers; `cache=shared` lets every
    /// connection of this pool see the same database.
    pub async fn in_memory() -> anyhow::Result<Self> {
        let url = format!("sqlite:file:{}?mode=memory&cache=shared", uuid::Uuid::new_v4());
        let db = Self::connect_with(&url, 2).await?;
        db.migrate().await?;
        Ok(db)
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        schema::migrate(&self.pool).await
    }
}
