use axum::extract::State;
use axum::response::IntoResponse;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

use crate::models::job::JobStatus;
use crate::services::reconciler::Reconciler;

/// State for the scrape endpoint, kept apart from the API state.
#[derive(Clone)]
pub struct MetricsState {
    pub handle: Arc<PrometheusHandle>,
    pub reconciler: Reconciler,
}

/// Prometheus metrics scrape endpoint.
///
/// Queue gauges are refreshed from the reconciled view on every scrape.
pub async fn prometheus_metrics(State(state): State<MetricsState>) -> impl IntoResponse {
    for (queue, counts) in state.reconciler.stats() {
        for status in JobStatus::ALL {
            metrics::gauge!(
                "queue_jobs",
                "queue" => queue.to_string(),
                "status" => status.to_string()
            )
            .set(counts.get(status) as f64);
        }
    }
    state.handle.render()
}
