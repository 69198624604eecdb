use std::sync::Arc;

use chrono::Utc;

use motorpool_core::config::{AppConfig, LoadOptions, StoreBackend};
use motorpool_core::domain::vehicle::{ActorId, Plate, Vehicle};
use motorpool_db::repositories::{
    AdminRepository, JsonStore, RepositoryError, SqlAdminRepository, SqlVehicleRepository,
    VehicleRepository,
};
use motorpool_db::{connect_with_settings, migrations};

use crate::commands::CommandResult;

const DEMO_VEHICLES: &[(&str, &str, &str)] = &[
    ("AB-123-CD", "lena", "100"),
    ("EF-456-GH", "marc", "200"),
    ("IJ-789-KL", "nora", "300"),
];

pub fn run(demo: bool) -> CommandResult {
    run_with_options(LoadOptions::default(), demo)
}

pub fn run_with_options(options: LoadOptions, demo: bool) -> CommandResult {
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "seed",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "seed",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let result = runtime.block_on(async {
        let (vehicles, admins): (Arc<dyn VehicleRepository>, Arc<dyn AdminRepository>) =
            match config.store.backend {
                StoreBackend::Sqlite => {
                    let pool = connect_with_settings(
                        &config.store.url,
                        config.store.max_connections,
                        config.store.timeout_secs,
                    )
                    .await
                    .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;

                    migrations::run_pending(&pool)
                        .await
                        .map_err(|error| ("migration", error.to_string(), 5u8))?;

                    (
                        Arc::new(SqlVehicleRepository::new(pool.clone())),
                        Arc::new(SqlAdminRepository::new(pool)),
                    )
                }
                StoreBackend::Json => {
                    let store = Arc::new(JsonStore::new(config.store.json_path.clone()));
                    (store.clone(), store)
                }
            };

        let admin = ActorId(config.discord.default_admin_id.clone());
        let admin_created = admins
            .insert_if_absent(&admin)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 5u8))?;

        let mut demo_created = 0usize;
        if demo {
            for (plate, owner_name, owner_id) in DEMO_VEHICLES {
                let vehicle = Vehicle::new(
                    Plate::new(*plate),
                    *owner_name,
                    ActorId((*owner_id).to_owned()),
                    Utc::now(),
                );
                match vehicles.insert(&vehicle).await {
                    Ok(()) => demo_created += 1,
                    // Re-running seed must leave existing records untouched.
                    Err(RepositoryError::Conflict(_)) => {}
                    Err(error) => {
                        return Err(("seed_execution", error.to_string(), 5u8));
                    }
                }
            }
        }

        Ok((admin_created, demo_created))
    });

    match result {
        Ok((admin_created, demo_created)) => CommandResult::success(
            "seed",
            format!(
                "default admin {}; {demo_created} demo vehicle(s) inserted",
                if admin_created { "created" } else { "already present" }
            ),
        ),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("seed", error_class, message, exit_code)
        }
    }
}
