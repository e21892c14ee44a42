use garde::Validate;
use serde::Deserialize;
use std::time::Duration;

use crate::models::job::QueueName;
use crate::services::reconciler::ReconcilerConfig;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read environment: {0}")]
    Env(#[from] envy::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(#[from] garde::Report),
}

#[derive(Debug, Deserialize, Validate)]
#[garde(allow_unvalidated)]
pub struct AppConfig {
    /// Server bind address (e.g., "0.0.0.0:3000")
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// PostgreSQL connection string for the job store
    pub database_url: String,

    /// Redis connection string for the change feed
    pub redis_url: String,

    /// Base URL of the AI inference service
    pub ai_service_url: String,

    /// Bearer token for the AI inference service
    #[serde(default)]
    pub ai_service_token: Option<String>,

    /// Queues to reconcile, comma-separated (e.g. "ai,video")
    #[serde(default = "default_tracked_queues")]
    #[garde(length(min = 1))]
    pub tracked_queues: Vec<QueueName>,

    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    #[serde(default = "default_recent_jobs_limit")]
    #[garde(range(min = 1))]
    pub recent_jobs_limit: i64,

    #[serde(default = "default_activity_log_capacity")]
    #[garde(range(min = 1))]
    pub activity_log_capacity: usize,

    /// Items per batch for "queue all pending work"
    #[serde(default = "default_batch_size")]
    #[garde(range(min = 1, max = 1000))]
    pub batch_size: u32,

    /// Default IoU threshold for tag matching
    #[serde(default = "default_iou_threshold")]
    #[garde(range(min = 0.0, max = 1.0))]
    pub iou_threshold: f64,

    #[serde(default = "default_push_reconnect_delay_ms")]
    pub push_reconnect_delay_ms: u64,

    #[serde(default = "default_push_max_reconnects")]
    pub push_max_reconnects: u32,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_tracked_queues() -> Vec<QueueName> {
    QueueName::ALL.to_vec()
}

fn default_poll_interval_secs() -> u64 {
    30
}

fn default_recent_jobs_limit() -> i64 {
    50
}

fn default_activity_log_capacity() -> usize {
    200
}

fn default_batch_size() -> u32 {
    100
}

fn default_iou_threshold() -> f64 {
    0.4
}

fn default_push_reconnect_delay_ms() -> u64 {
    2000
}

fn default_push_max_reconnects() -> u32 {
    5
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let config: AppConfig = envy::from_env()?;
        config.validate()?;
        Ok(config)
    }

    pub fn reconciler(&self) -> ReconcilerConfig {
        ReconcilerConfig {
            queues: self.tracked_queues.clone(),
            poll_interval: Duration::from_secs(self.poll_interval_secs.max(1)),
            recent_jobs_limit: self.recent_jobs_limit,
            activity_capacity: self.activity_log_capacity,
            push_reconnect_delay: Duration::from_millis(self.push_reconnect_delay_ms),
            push_max_reconnects: self.push_max_reconnects,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn required() -> Vec<(String, String)> {
        vec![
            ("DATABASE_URL".to_string(), "postgres://localhost/album".to_string()),
            ("REDIS_URL".to_string(), "redis://localhost".to_string()),
            ("AI_SERVICE_URL".to_string(), "http://localhost:8000".to_string()),
        ]
    }

    #[test]
    fn test_defaults_applied() {
        let config: AppConfig = envy::from_iter(required()).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:3000");
        assert_eq!(config.tracked_queues, vec![QueueName::Ai, QueueName::Video]);
        assert_eq!(config.activity_log_capacity, 200);
        assert_eq!(config.iou_threshold, 0.4);
        assert!(config.ai_service_token.is_none());
    }

    #[test]
    fn test_tracked_queues_from_comma_list() {
        let mut vars = required();
        vars.push(("TRACKED_QUEUES".to_string(), "video".to_string()));
        vars.push(("POLL_INTERVAL_SECS".to_string(), "0".to_string()));
        let config: AppConfig = envy::from_iter(vars).unwrap();
        assert_eq!(config.tracked_queues, vec![QueueName::Video]);

        let reconciler = config.reconciler();
        assert_eq!(reconciler.queues, vec![QueueName::Video]);
        assert_eq!(reconciler.poll_interval, Duration::from_secs(1));
    }

    #[test]
    fn test_out_of_range_values_rejected() {
        let mut vars = required();
        vars.push(("BATCH_SIZE".to_string(), "5000".to_string()));
        let config: AppConfig = envy::from_iter(vars).unwrap();
        assert!(config.validate().is_err());

        let mut vars = required();
        vars.push(("IOU_THRESHOLD".to_string(), "1.5".to_string()));
        let config: AppConfig = envy::from_iter(vars).unwrap();
        assert!(config.validate().is_err());

        let config: AppConfig = envy::from_iter(required()).unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_list_sizes_must_be_positive() {
        for (key, value) in [
            ("RECENT_JOBS_LIMIT", "-1"),
            ("RECENT_JOBS_LIMIT", "0"),
            ("ACTIVITY_LOG_CAPACITY", "0"),
        ] {
            let mut vars = required();
            vars.push((key.to_string(), value.to_string()));
            let config: AppConfig = envy::from_iter(vars).unwrap();
            assert!(config.validate().is_err(), "{key}={value} should be rejected");
        }

        let mut vars = required();
        vars.push(("RECENT_JOBS_LIMIT".to_string(), "1".to_string()));
        vars.push(("ACTIVITY_LOG_CAPACITY".to_string(), "1".to_string()));
        let config: AppConfig = envy::from_iter(vars).unwrap();
        assert!(config.validate().is_ok());
    }
}
