use chrono::{DateTime, Utc};
use garde::Validate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::job::ScrapeJob;

/// Request to start a background crawl of a site.
#[derive(Debug, Deserialize, Validate)]
pub struct CrawlRequest {
    #[garde(length(min = 1, max = 2048))]
    pub url: String,
}

/// Response after submitting a crawl.
#[derive(Debug, Serialize)]
pub struct CrawlResponse {
    pub job_id: Uuid,
    pub status: String,
    pub message: String,
}

/// Response for polling a crawl job.
#[derive(Debug, Serialize)]
pub struct JobStatusResponse {
    pub job_id: Uuid,
    pub url: String,
    pub status: String,
    pub progress: i32,
    pub total: i32,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<ScrapeJob> for JobStatusResponse {
    fn from(job: ScrapeJob) -> Self {
        Self {
            job_id: job.id,
            url: job.url,
            status: job.status.to_string(),
            progress: job.progress,
            total: job.total,
            result: job.result,
            error: job.error,
            created_at: job.created_at,
        }
    }
}

/// One entry in the job history listing. Omits the (potentially large)
/// `result` payload.
#[derive(Debug, Serialize)]
pub struct JobSummary {
    pub job_id: Uuid,
    pub url: String,
    pub status: String,
    pub progress: i32,
    pub total: i32,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<ScrapeJob> for JobSummary {
    fn from(job: ScrapeJob) -> Self {
        Self {
            job_id: job.id,
            url: job.url,
            status: job.status.to_string(),
            progress: job.progress,
            total: job.total,
            error: job.error,
            created_at: job.created_at,
        }
    }
}
