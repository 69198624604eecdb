use serde::Serialize;

use motorpool_core::config::{AppConfig, LoadOptions, StoreBackend};
use motorpool_db::connect_with_settings;

#[derive(Debug, Serialize)]
struct DoctorReport {
    status: String,
    checks: Vec<DoctorCheck>,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: String,
    status: String,
    detail: String,
}

impl DoctorCheck {
    fn ok(name: &str, detail: impl Into<String>) -> Self {
        Self { name: name.to_string(), status: "ok".to_string(), detail: detail.into() }
    }

    fn failed(name: &str, detail: impl Into<String>) -> Self {
        Self { name: name.to_string(), status: "failed".to_string(), detail: detail.into() }
    }
}

pub fn run(json: bool) -> String {
    run_with_options(LoadOptions::default(), json)
}

pub fn run_with_options(options: LoadOptions, json: bool) -> String {
    let mut checks = Vec::new();

    let config = match AppConfig::load(options) {
        Ok(config) => {
            checks.push(DoctorCheck::ok("config_validation", "configuration loaded and valid"));
            Some(config)
        }
        Err(error) => {
            checks.push(DoctorCheck::failed("config_validation", error.to_string()));
            None
        }
    };

    if let Some(config) = &config {
        checks.push(store_check(config));
    }

    let status = if checks.iter().all(|check| check.status == "ok") { "ok" } else { "failed" };
    let report = DoctorReport { status: status.to_string(), checks };

    if json {
        serde_json::to_string_pretty(&report)
            .unwrap_or_else(|error| format!("{{\"status\":\"failed\",\"message\":\"{error}\"}}"))
    } else {
        render_text(&report)
    }
}

fn store_check(config: &AppConfig) -> DoctorCheck {
    match config.store.backend {
        StoreBackend::Sqlite => {
            let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build()
            {
                Ok(runtime) => runtime,
                Err(error) => return DoctorCheck::failed("store_connectivity", error.to_string()),
            };

            runtime.block_on(async {
                match connect_with_settings(
                    &config.store.url,
                    config.store.max_connections,
                    config.store.timeout_secs,
                )
                .await
                {
                    Ok(pool) => {
                        let probe = sqlx_probe(&pool).await;
                        pool.close().await;
                        probe
                    }
                    Err(error) => DoctorCheck::failed(
                        "store_connectivity",
                        format!("could not connect to {}: {error}", config.store.url),
                    ),
                }
            })
        }
        StoreBackend::Json => match std::fs::metadata(&config.store.json_path) {
            Ok(_) => DoctorCheck::ok(
                "store_connectivity",
                format!("json store present at {}", config.store.json_path.display()),
            ),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => DoctorCheck::ok(
                "store_connectivity",
                format!(
                    "json store will be created at {} on first write",
                    config.store.json_path.display()
                ),
            ),
            Err(error) => DoctorCheck::failed("store_connectivity", error.to_string()),
        },
    }
}

async fn sqlx_probe(pool: &motorpool_db::DbPool) -> DoctorCheck {
    match sqlx::query_scalar::<_, i64>("SELECT 1").fetch_one(pool).await {
        Ok(_) => DoctorCheck::ok("store_connectivity", "database query succeeded"),
        Err(error) => {
            DoctorCheck::failed("store_connectivity", format!("database query failed: {error}"))
        }
    }
}

fn render_text(report: &DoctorReport) -> String {
    let mut lines = vec![format!("doctor: {}", report.status)];
    for check in &report.checks {
        lines.push(format!("  {:<20} {:<6} {}", check.name, check.status, check.detail));
    }
    lines.join("\n")
}
