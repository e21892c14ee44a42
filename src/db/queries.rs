use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use std::str::FromStr;

use crate::models::job::{Job, JobStatus, QueueName, Worker, WorkerStatus};
use crate::models::stats::QueueCounts;
use crate::services::source::SourceError;

const JOB_COLUMNS: &str =
    "id, status, created_at, started_at, completed_at, error_message, worker_id, payload";

fn parse_column<T: FromStr>(column: &'static str, value: String) -> Result<T, SourceError> {
    T::from_str(&value).map_err(|_| SourceError::Decode { column, value })
}

fn job_from_row(queue: QueueName, row: &PgRow) -> Result<Job, SourceError> {
    let status: String = row.try_get("status")?;
    let payload: Option<serde_json::Value> = row.try_get("payload")?;

    Ok(Job {
        id: row.try_get("id")?,
        queue_name: queue,
        status: parse_column("status", status)?,
        created_at: row.try_get("created_at")?,
        started_at: row.try_get("started_at")?,
        completed_at: row.try_get("completed_at")?,
        error_message: row.try_get("error_message")?,
        worker_id: row.try_get("worker_id")?,
        payload: payload.unwrap_or(serde_json::Value::Null),
    })
}

/// Count a queue's rows by status with a full scan.
pub async fn queue_stats(pool: &PgPool, queue: QueueName) -> Result<QueueCounts, SourceError> {
    let sql = format!(
        "SELECT status, COUNT(*) AS count FROM {} GROUP BY status",
        queue.table()
    );
    let rows = sqlx::query(&sql).fetch_all(pool).await?;

    let mut counted = Vec::with_capacity(rows.len());
    for row in rows {
        let status: String = row.try_get("status")?;
        let count: i64 = row.try_get("count")?;
        match JobStatus::from_str(&status) {
            Ok(status) => counted.push((status, u64::try_from(count).unwrap_or(0))),
            Err(_) => {
                tracing::warn!(queue = %queue, status = %status, count, "Ignoring rows with unknown status");
            }
        }
    }
    Ok(QueueCounts::from_rows(counted))
}

/// Most recently created jobs, newest first.
pub async fn recent_jobs(pool: &PgPool, queue: QueueName, limit: i64) -> Result<Vec<Job>, SourceError> {
    let sql = format!(
        "SELECT {} FROM {} ORDER BY created_at DESC LIMIT $1",
        JOB_COLUMNS,
        queue.table()
    );
    let rows = sqlx::query(&sql).bind(limit).fetch_all(pool).await?;
    rows.iter().map(|r| job_from_row(queue, r)).collect()
}

/// Jobs currently held by a worker.
pub async fn active_jobs(pool: &PgPool, queue: QueueName) -> Result<Vec<Job>, SourceError> {
    let sql = format!(
        "SELECT {} FROM {} WHERE status = 'processing' ORDER BY started_at ASC NULLS LAST",
        JOB_COLUMNS,
        queue.table()
    );
    let rows = sqlx::query(&sql).fetch_all(pool).await?;
    rows.iter().map(|r| job_from_row(queue, r)).collect()
}

pub async fn workers(pool: &PgPool) -> Result<Vec<Worker>, SourceError> {
    let rows = sqlx::query(
        r#"
        SELECT worker_id, queue_name, current_job_id, started_at, status
        FROM processing_workers
        ORDER BY worker_id
        "#,
    )
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|r| {
            let queue_name: Option<String> = r.try_get("queue_name")?;
            let status: String = r.try_get("status")?;
            Ok(Worker {
                worker_id: r.try_get("worker_id")?,
                queue_name: queue_name
                    .map(|q| parse_column("queue_name", q))
                    .transpose()?,
                current_job_id: r.try_get("current_job_id")?,
                started_at: r.try_get("started_at")?,
                status: WorkerStatus::from_str(&status).unwrap_or(WorkerStatus::Offline),
            })
        })
        .collect()
}

/// Delete pending jobs. Jobs already claimed by a worker are left alone.
pub async fn clear_pending(pool: &PgPool, queue: QueueName) -> Result<u64, SourceError> {
    let sql = format!("DELETE FROM {} WHERE status = 'pending'", queue.table());
    let result = sqlx::query(&sql).execute(pool).await?;
    Ok(result.rows_affected())
}
