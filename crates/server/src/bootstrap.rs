use std::sync::Arc;
use std::time::Duration;

use fuelquote_core::config::{AppConfig, ConfigError, HoldBackend, LoadOptions};
use fuelquote_core::ports::HoldStore;
use fuelquote_core::profile::ProfileService;
use fuelquote_core::workflow::QuoteWorkflow;
use fuelquote_db::{
    connect_with_settings, migrations, DbPool, InMemoryHoldStore, SqlHoldStore,
    SqlProfileDirectory, SqlQuoteStore,
};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::app::AppState;
use crate::audit::TracingAuditSink;

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

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
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

    let state = build_state(&config, &db_pool);
    info!(
        event_name = "system.bootstrap.workflow_ready",
        correlation_id = "bootstrap",
        home_state = %config.pricing.home_state,
        hold_backend = ?config.session.hold_backend,
        "quote workflow assembled"
    );

    Ok(Application { config, db_pool, state })
}

/// Periodically drops holds older than `hold_ttl_secs`. Runs until aborted.
pub fn spawn_hold_sweeper(state: &AppState, hold_ttl_secs: u64) -> JoinHandle<()> {
    let workflow = state.workflow.clone();
    let max_age = chrono::Duration::seconds(i64::try_from(hold_ttl_secs).unwrap_or(i64::MAX));
    let period = Duration::from_secs((hold_ttl_secs / 4).clamp(1, 300));

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            match workflow.purge_stale_holds(max_age).await {
                Ok(0) => {}
                Ok(removed) => info!(
                    event_name = "system.holds.swept",
                    correlation_id = "hold-sweep",
                    removed,
                    "expired pending holds removed"
                ),
                Err(error) => warn!(
                    event_name = "system.holds.sweep_failed",
                    correlation_id = "hold-sweep",
                    error = %error,
                    "pending hold sweep failed"
                ),
            }
        }
    })
}

fn build_state(config: &AppConfig, db_pool: &DbPool) -> AppState {
    let audit = Arc::new(TracingAuditSink);
    let profiles = Arc::new(SqlProfileDirectory::new(db_pool.clone()));
    let holds: Arc<dyn HoldStore> = match config.session.hold_backend {
        HoldBackend::Memory => Arc::new(InMemoryHoldStore::default()),
        HoldBackend::Database => Arc::new(SqlHoldStore::new(db_pool.clone())),
    };

    let workflow =
        QuoteWorkflow::new(profiles.clone(), Arc::new(SqlQuoteStore::new(db_pool.clone())), holds)
            .with_home_state(config.pricing.home_state.clone())
            .with_audit_sink(audit.clone());

    AppState {
        workflow: Arc::new(workflow),
        profiles: Arc::new(ProfileService::new(profiles).with_audit_sink(audit)),
    }
}
