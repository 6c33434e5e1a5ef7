use std::sync::Arc;

use axum::Router;
use plateful_core::config::{AppConfig, ConfigError, LoadOptions};
use plateful_core::RecommendationCache;
use plateful_db::{connect_with_settings, migrations, seed_demo_catalog, DbPool, SqlDiscoveryStore};
use thiserror::Error;
use tracing::info;

use crate::assist::{AssistProvider, HttpAssistProvider};
use crate::discovery::{self, AppState};
use crate::health;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub router: Router,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("seeding demo catalog failed: {0}")]
    Seed(#[source] plateful_db::StoreError),
    #[error("assist provider setup failed: {0}")]
    Assist(plateful_core::ApplicationError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(event_name = "system.bootstrap.start", "starting application bootstrap");

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(event_name = "system.bootstrap.migrations_applied", "database migrations applied");

    if seed_demo_requested() {
        let summary = seed_demo_catalog(&db_pool).await.map_err(BootstrapError::Seed)?;
        info!(
            event_name = "system.bootstrap.demo_seeded",
            restaurants = summary.restaurants,
            branches = summary.branches,
            deals = summary.deals,
            fee_rules = summary.fee_rules,
            "demo catalog seeded"
        );
    }

    let assist = HttpAssistProvider::from_config(&config.assist)
        .map_err(BootstrapError::Assist)?
        .map(|provider| Arc::new(provider) as Arc<dyn AssistProvider>);

    let state = AppState {
        store: Arc::new(SqlDiscoveryStore::new(db_pool.clone())),
        cache: Arc::new(RecommendationCache::new(config.ranking.cache_ttl_secs)),
        ranking: Arc::new(config.ranking.clone()),
        assist,
        assist_max_retries: config.assist.max_retries,
    };
    let router = discovery::router(state).merge(health::router(db_pool.clone()));

    Ok(Application { config, db_pool, router })
}

fn seed_demo_requested() -> bool {
    std::env::var("PLATEFUL_SEED_DEMO")
        .map(|value| matches!(value.trim(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use plateful_core::config::ConfigOverrides;

    #[tokio::test]
    async fn bootstrap_wires_a_working_application_against_sqlite_memory() {
        let app = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:?cache=shared".to_owned()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .await
        .expect("bootstrap should succeed against sqlite::memory:");

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' \
             AND name IN ('restaurants', 'branches', 'deals', 'fee_rules')",
        )
        .fetch_one(&app.db_pool)
        .await
        .expect("catalog tables present after bootstrap");
        assert_eq!(table_count, 4);
    }

    #[tokio::test]
    async fn bootstrap_rejects_assist_without_base_url() {
        let result = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:".to_owned()),
                assist_enabled: Some(true),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .await;
        assert!(result.is_err());
    }
}
