pub mod config;
pub mod context;
pub mod db;
pub mod engine;
pub mod error;
pub mod models;
pub mod services;
pub mod store;

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::EngineConfig;
use crate::db::Database;

pub use crate::context::RequestContext;
pub use crate::engine::StudyEngine;
pub use crate::error::{ErrorKind, Result, StudyError};

/// Install the global `tracing` subscriber, filtered by `RUST_LOG`
/// (default `info`). Later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

/// Connect to PostgreSQL, run migrations and build an engine over it.
pub async fn connect_from_env() -> anyhow::Result<(StudyEngine, EngineConfig)> {
    let config = EngineConfig::from_env()?;

    tracing::info!("Connecting to database...");
    let db = Database::connect(config.database_url()?, config.max_connections).await?;

    tracing::info!("Running migrations...");
    db.run_migrations().await?;

    let engine = StudyEngine::with_database(Arc::new(db), &config);
    Ok((engine, config))
}
