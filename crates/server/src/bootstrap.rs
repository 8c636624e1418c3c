use fitlens_core::config::{AppConfig, ConfigError};
use fitlens_db::{connect_with_config, migrations, DbPool};
use thiserror::Error;
use tracing::{info, warn};

use crate::ml::reload_catalog;
use crate::state::AppState;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub state: AppState,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
}

/// Connects, migrates and makes a first catalog build. A catalog that cannot
/// be built is not fatal: the service starts and reports `model_loaded=false`.
pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool =
        connect_with_config(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let state = AppState::new(config.clone(), db_pool.clone());
    if let Err(error) = reload_catalog(&state, "bootstrap").await {
        warn!(
            event_name = "system.bootstrap.catalog_unavailable",
            correlation_id = "bootstrap",
            error_class = error.error_class(),
            error = %error,
            "initial catalog build failed; recommendations unavailable until refresh"
        );
    }

    Ok(Application { config, db_pool, state })
}
