use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::info;

use motorpool_core::config::{AppConfig, ConfigError, LoadOptions, StoreBackend};
use motorpool_core::domain::vehicle::ActorId;
use motorpool_db::repositories::{
    AdminRepository, JsonStore, RepositoryError, SqlAdminRepository, SqlVehicleRepository,
    VehicleRepository,
};
use motorpool_db::{connect_with_settings, migrations};
use motorpool_discord::api::{ChannelId, ChatApi, NoopChatApi};
use motorpool_discord::events::{
    ComponentInteractionHandler, EventDispatcher, SlashCommandHandler,
};
use motorpool_discord::gateway::GatewayRunner;
use motorpool_discord::listing::{ListingHandle, ListingRenderer};
use motorpool_discord::service::GarageService;

use crate::keepalive::StoreProbe;

pub struct Application {
    pub config: AppConfig,
    pub vehicles: Arc<dyn VehicleRepository>,
    pub admins: Arc<dyn AdminRepository>,
    pub store_probe: StoreProbe,
    pub gateway_runner: GatewayRunner,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("admin seeding failed: {0}")]
    Seed(#[source] RepositoryError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        backend = ?config.store.backend,
        "starting application bootstrap"
    );

    let (vehicles, admins, store_probe): (
        Arc<dyn VehicleRepository>,
        Arc<dyn AdminRepository>,
        StoreProbe,
    ) = match config.store.backend {
        StoreBackend::Sqlite => {
            let db_pool = connect_with_settings(
                &config.store.url,
                config.store.max_connections,
                config.store.timeout_secs,
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

            (
                Arc::new(SqlVehicleRepository::new(db_pool.clone())),
                Arc::new(SqlAdminRepository::new(db_pool.clone())),
                StoreProbe::Sqlite(db_pool),
            )
        }
        StoreBackend::Json => {
            let store = Arc::new(JsonStore::new(config.store.json_path.clone()));
            info!(
                event_name = "system.bootstrap.json_store_opened",
                correlation_id = "bootstrap",
                path = %config.store.json_path.display(),
                "json store opened"
            );

            (store.clone(), store, StoreProbe::Json(config.store.json_path.clone()))
        }
    };

    seed_default_admin(admins.as_ref(), &config.discord.default_admin_id).await?;

    let api: Arc<dyn ChatApi> = Arc::new(NoopChatApi::default());
    let listing_handle = Arc::new(ListingHandle::new(ChannelId(config.listing.channel_id.clone())));
    let listing = Arc::new(ListingRenderer::new(
        api.clone(),
        listing_handle,
        config.listing.page_size,
        Duration::from_millis(config.listing.lock_timeout_ms),
    ));
    let service = GarageService::new(vehicles.clone(), admins.clone(), api, listing);

    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(SlashCommandHandler::new(service.clone()));
    dispatcher.register(ComponentInteractionHandler::new(service));

    Ok(Application {
        config,
        vehicles,
        admins,
        store_probe,
        gateway_runner: GatewayRunner::with_noop_transport(dispatcher),
    })
}

/// One admin must exist for the command surface to be usable, so the
/// configured default actor is inserted if absent on every start.
async fn seed_default_admin(
    admins: &dyn AdminRepository,
    default_admin_id: &str,
) -> Result<(), BootstrapError> {
    let actor = ActorId(default_admin_id.to_owned());
    let seeded = admins.insert_if_absent(&actor).await.map_err(BootstrapError::Seed)?;

    info!(
        event_name = "system.bootstrap.admin_seeded",
        correlation_id = "bootstrap",
        actor = %actor,
        seeded,
        "default admin ensured"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use motorpool_core::config::{AppConfig, ConfigOverrides, LoadOptions, StoreBackend};
    use motorpool_core::domain::vehicle::ActorId;

    use crate::bootstrap::{bootstrap, bootstrap_with_config};
    use crate::keepalive::StoreProbe;

    fn valid_options(database_url: &str) -> LoadOptions {
        LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some(database_url.to_string()),
                bot_token: Some("MTA0.fake.token".to_string()),
                default_admin_id: Some("652050350454472734".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }
    }

    #[tokio::test]
    async fn bootstrap_fails_fast_without_a_bot_token() {
        let result = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .await;

        let message = result.err().expect("missing token should fail").to_string();
        assert!(message.contains("discord.bot_token"));
    }

    #[tokio::test]
    async fn bootstrap_migrates_and_seeds_the_default_admin() {
        let app = bootstrap(valid_options("sqlite::memory:?cache=shared"))
            .await
            .expect("bootstrap should succeed");

        let StoreProbe::Sqlite(pool) = &app.store_probe else {
            panic!("sqlite backend expected");
        };

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master \
             WHERE type = 'table' AND name IN ('vehicle', 'admin')",
        )
        .fetch_one(pool)
        .await
        .expect("schema query");
        assert_eq!(table_count, 2, "bootstrap should create the baseline tables");

        let admin = ActorId("652050350454472734".to_owned());
        assert!(app.admins.is_admin(&admin).await.expect("is_admin"));

        assert!(app.gateway_runner.is_noop_transport());
    }

    #[tokio::test]
    async fn admin_seeding_stays_single_across_restarts() {
        let app = bootstrap(valid_options("sqlite::memory:?cache=shared"))
            .await
            .expect("first bootstrap");
        let StoreProbe::Sqlite(pool) = app.store_probe.clone() else {
            panic!("sqlite backend expected");
        };

        // Second bootstrap over the same store must not duplicate the admin.
        let mut config = app.config.clone();
        config.store.url = "sqlite::memory:?cache=shared".to_string();
        bootstrap_with_config(config).await.expect("second bootstrap");

        let (admin_count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM admin")
            .fetch_one(&pool)
            .await
            .expect("admin count");
        assert_eq!(admin_count, 1);
    }

    #[tokio::test]
    async fn json_backend_bootstraps_without_a_database() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut options = valid_options("sqlite::memory:");
        options.overrides.store_backend = Some(StoreBackend::Json);
        options.overrides.json_path = Some(dir.path().join("motorpool.json"));

        let app = bootstrap(options).await.expect("bootstrap json backend");

        assert!(matches!(app.store_probe, StoreProbe::Json(_)));
        let admin = ActorId("652050350454472734".to_owned());
        assert!(app.admins.is_admin(&admin).await.expect("is_admin"));
        assert!(app.vehicles.list_all().await.expect("list").is_empty());
    }
}
