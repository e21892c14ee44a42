pub mod activity;
pub mod batch;
pub mod error;
pub mod health;
pub mod metrics;
pub mod queues;
pub mod tags;

use axum::routing::{delete, get, post};
use axum::Router;

use crate::app_state::AppState;

/// All `/health` and `/api/v1` routes. The metrics endpoint carries its own
/// state and is mounted separately.
pub fn api_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/api/v1/queues/stats", get(queues::get_stats))
        .route("/api/v1/queues/jobs", get(queues::recent_jobs))
        .route("/api/v1/queues/active", get(queues::active_jobs))
        .route("/api/v1/queues/refresh", post(queues::refresh))
        .route("/api/v1/queues/{queue}", delete(queues::clear_queue))
        .route("/api/v1/workers", get(queues::workers))
        .route(
            "/api/v1/activity",
            get(activity::list).delete(activity::clear),
        )
        .route("/api/v1/activity/pause", post(activity::pause))
        .route("/api/v1/activity/resume", post(activity::resume))
        .route("/api/v1/tags/preview", post(tags::preview))
        .route("/api/v1/tags/toggle", post(tags::toggle))
        .route("/api/v1/tags/select-all", post(tags::select_all))
        .route("/api/v1/tags/clear", post(tags::clear))
        .route("/api/v1/tags/apply", post(tags::apply))
        .route(
            "/api/v1/clusters/{cluster_id}/exclusions",
            get(tags::list_exclusions)
                .post(tags::add_exclusion)
                .delete(tags::remove_exclusion),
        )
        .route("/api/v1/batch", get(batch::status))
        .route("/api/v1/batch/start", post(batch::start))
        .route("/api/v1/batch/continue", post(batch::continue_queuing))
        .route("/api/v1/batch/stop", post(batch::stop))
        .route("/api/v1/batch/reset", post(batch::reset))
        .with_state(state)
}
