use std::path::PathBuf;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use motorpool_db::DbPool;
use serde::Serialize;
use tracing::{error, info};

/// What the health endpoint can probe: the SQLite pool or the JSON store
/// file, depending on the configured backend.
#[derive(Clone)]
pub enum StoreProbe {
    Sqlite(DbPool),
    Json(PathBuf),
}

#[derive(Clone)]
pub struct KeepaliveState {
    probe: StoreProbe,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub store: HealthCheck,
    pub checked_at: String,
}

pub fn router(probe: StoreProbe) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .with_state(KeepaliveState { probe })
}

/// Static acknowledgement for hosting platforms that ping the root path to
/// decide whether the process is alive.
pub async fn root() -> &'static str {
    "Motorpool bot is running."
}

pub async fn spawn(bind_address: &str, port: u16, probe: StoreProbe) -> std::io::Result<()> {
    let address = format!("{bind_address}:{port}");
    let listener = tokio::net::TcpListener::bind(&address).await?;

    info!(
        event_name = "system.keepalive.start",
        correlation_id = "bootstrap",
        bind_address = %address,
        "keepalive endpoint started"
    );

    tokio::spawn(async move {
        if let Err(error) = axum::serve(listener, router(probe)).await {
            error!(
                event_name = "system.keepalive.error",
                correlation_id = "bootstrap",
                error = %error,
                "keepalive endpoint server terminated unexpectedly"
            );
        }
    });

    Ok(())
}

pub async fn health(State(state): State<KeepaliveState>) -> (StatusCode, Json<HealthResponse>) {
    let store = store_check(&state.probe).await;
    let ready = store.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "motorpool-server runtime initialized".to_string(),
        },
        store,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

async fn store_check(probe: &StoreProbe) -> HealthCheck {
    match probe {
        StoreProbe::Sqlite(pool) => {
            match sqlx::query_scalar::<_, i64>("SELECT 1").fetch_one(pool).await {
                Ok(_) => HealthCheck {
                    status: "ready",
                    detail: "database query succeeded".to_string(),
                },
                Err(error) => HealthCheck {
                    status: "degraded",
                    detail: format!("database query failed: {error}"),
                },
            }
        }
        StoreProbe::Json(path) => match tokio::fs::metadata(path).await {
            Ok(_) => HealthCheck {
                status: "ready",
                detail: format!("json store present at {}", path.display()),
            },
            // The store file is created on first write, so absence is fine.
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => HealthCheck {
                status: "ready",
                detail: format!("json store not created yet at {}", path.display()),
            },
            Err(error) => HealthCheck {
                status: "degraded",
                detail: format!("json store unreadable: {error}"),
            },
        },
    }
}
