//! Postgres-backed repository implementations.
//!
//! The tables are owned by the account platform; this crate only reads them and
//! backfills `files.hash`. Queries are built at runtime because there is no
//! schema to check against at compile time.

mod accounts;
mod capes;
mod files;
mod util;

pub use util::map_sqlx_error;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::{
    query,
    postgres::{PgPool, PgPoolOptions},
};

use crate::application::repos::{HealthRepo, RepoError};

#[derive(Clone)]
pub struct PostgresRepositories {
    pool: Arc<PgPool>,
}

impl PostgresRepositories {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn connect(
        url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<PgPool, sqlx::Error> {
        PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(url)
            .await
    }

    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        query("SELECT 1").execute(self.pool()).await.map(|_| ())
    }
}

#[async_trait]
impl HealthRepo for PostgresRepositories {
    async fn ping(&self) -> Result<(), RepoError> {
        self.health_check().await.map_err(map_sqlx_error)
    }
}
