use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::app_state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub realtime_unavailable: bool,
    pub checks: HealthChecks,
}

#[derive(Serialize)]
pub struct HealthChecks {
    pub database: ComponentHealth,
    pub redis: ComponentHealth,
}

#[derive(Serialize)]
pub struct ComponentHealth {
    pub status: String,
    pub latency_ms: Option<u64>,
}

impl ComponentHealth {
    fn from_result<E>(result: Result<(), E>, start: std::time::Instant) -> Self {
        match result {
            Ok(()) => Self {
                status: "ok".to_string(),
                latency_ms: Some(start.elapsed().as_millis() as u64),
            },
            Err(_) => Self {
                status: "error".to_string(),
                latency_ms: None,
            },
        }
    }

    fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

/// GET /health: dependency status. Degraded push delivery is reported but
/// does not fail the check.
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let start = std::time::Instant::now();
    let db_check = ComponentHealth::from_result(
        sqlx::query("SELECT 1").execute(&state.db).await.map(|_| ()),
        start,
    );

    let redis_start = std::time::Instant::now();
    let redis_check = ComponentHealth::from_result(state.feed.health_check().await, redis_start);

    let all_healthy = db_check.is_ok() && redis_check.is_ok();
    let status_code = if all_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = HealthResponse {
        status: if all_healthy { "ok" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        realtime_unavailable: state.reconciler.status().realtime_unavailable,
        checks: HealthChecks {
            database: db_check,
            redis: redis_check,
        },
    };

    (status_code, Json(response))
}
