pub mod demo;
pub mod intervene;
pub mod submit;
pub mod task;
pub mod worker;

use agentgraph_core::{InMemoryTaskStore, PostgresTaskStore, TaskStore};
use std::sync::Arc;

/// Connects to the store named by `DATABASE_URL`, applying the embedded
/// schema migration. There is no in-memory fallback here -- commands that
/// want the in-memory store (the `demo` command) construct it directly,
/// since pointing a durability-sensitive command at volatile storage by
/// accident would be a worse failure mode than an explicit error.
pub async fn connect_store() -> anyhow::Result<Arc<dyn TaskStore>> {
    let database_url = std::env::var("DATABASE_URL")
        .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set to connect to a store"))?;
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await?;
    let store = PostgresTaskStore::new(pool);
    store.migrate().await?;
    Ok(Arc::new(store))
}

/// An in-memory store for the `demo` command -- no `DATABASE_URL` required.
pub fn in_memory_store() -> Arc<dyn TaskStore> {
    Arc::new(InMemoryTaskStore::new())
}
