use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::item::CrawlResult;
use crate::models::job::{JobStatus, ScrapeJob};

const JOB_COLUMNS: &str = "id, url, status, progress, total, result, error, created_at, updated_at";

fn job_from_row(row: &PgRow) -> Result<ScrapeJob, sqlx::Error> {
    let status_str: String = row.try_get("status")?;
    // Unknown strings default to processing rather than failing the read.
    let status = status_str.parse().unwrap_or(JobStatus::Processing);

    Ok(ScrapeJob {
        id: row.try_get("id")?,
        url: row.try_get("url")?,
        status,
        progress: row.try_get("progress")?,
        total: row.try_get("total")?,
        result: row.try_get("result")?,
        error: row.try_get("error")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Insert a new crawl job in the `processing` state
pub async fn create_job(pool: &PgPool, url: &str) -> Result<ScrapeJob, sqlx::Error> {
    let row = sqlx::query(&format!(
        r#"
        INSERT INTO scrape_jobs (url, status, progress, total)
        VALUES ($1, 'processing', 0, 0)
        RETURNING {JOB_COLUMNS}
        "#,
    ))
    .bind(url)
    .fetch_one(pool)
    .await?;

    job_from_row(&row)
}

/// Get a job by ID
pub async fn get_job(pool: &PgPool, job_id: Uuid) -> Result<Option<ScrapeJob>, sqlx::Error> {
    let row = sqlx::query(&format!(
        r#"
        SELECT {JOB_COLUMNS}
        FROM scrape_jobs
        WHERE id = $1
        "#,
    ))
    .bind(job_id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(job_from_row).transpose()
}

/// List recent jobs, newest first
pub async fn list_jobs(pool: &PgPool, limit: i64) -> Result<Vec<ScrapeJob>, sqlx::Error> {
    let rows = sqlx::query(&format!(
        r#"
        SELECT {JOB_COLUMNS}
        FROM scrape_jobs
        ORDER BY created_at DESC
        LIMIT $1
        "#,
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    rows.iter().map(job_from_row).collect()
}

/// Record the discovered URL count once discovery finishes
pub async fn update_total(pool: &PgPool, job_id: Uuid, total: i32) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE scrape_jobs
        SET total = $1, updated_at = NOW()
        WHERE id = $2
        "#,
    )
    .bind(total)
    .bind(job_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Record the cumulative attempted-URL count after a batch
pub async fn update_progress(pool: &PgPool, job_id: Uuid, progress: i32) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE scrape_jobs
        SET progress = $1, updated_at = NOW()
        WHERE id = $2
        "#,
    )
    .bind(progress)
    .bind(job_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Write a non-terminal result checkpoint so polling clients see live
/// progress mid-run. Does not touch `status`.
pub async fn checkpoint_result(
    pool: &PgPool,
    job_id: Uuid,
    result: &CrawlResult,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE scrape_jobs
        SET result = $1, updated_at = NOW()
        WHERE id = $2
        "#,
    )
    .bind(serde_json::to_value(result).map_err(|e| sqlx::Error::Encode(Box::new(e)))?)
    .bind(job_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Write a terminal status together with the final result payload
pub async fn finalize_job(
    pool: &PgPool,
    job_id: Uuid,
    status: JobStatus,
    progress: i32,
    total: i32,
    result: &CrawlResult,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE scrape_jobs
        SET status = $1, progress = $2, total = $3, result = $4, updated_at = NOW()
        WHERE id = $5
        "#,
    )
    .bind(status.to_string())
    .bind(progress)
    .bind(total)
    .bind(serde_json::to_value(result).map_err(|e| sqlx::Error::Encode(Box::new(e)))?)
    .bind(job_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Mark a job partial with whatever items were salvaged, leaving
/// `progress` and `total` as last recorded
pub async fn mark_partial(
    pool: &PgPool,
    job_id: Uuid,
    result: &CrawlResult,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE scrape_jobs
        SET status = 'partial', result = $1, updated_at = NOW()
        WHERE id = $2
        "#,
    )
    .bind(serde_json::to_value(result).map_err(|e| sqlx::Error::Encode(Box::new(e)))?)
    .bind(job_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Mark a job failed with an error message
pub async fn fail_job(pool: &PgPool, job_id: Uuid, error: &str) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE scrape_jobs
        SET status = 'failed', error = $1, updated_at = NOW()
        WHERE id = $2
        "#,
    )
    .bind(error)
    .bind(job_id)
    .execute(pool)
    .await?;

    Ok(())
}
