use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use garde::Validate;
use serde::Deserialize;
use url::Url;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::db::queries;
use crate::models::crawl::{CrawlRequest, CrawlResponse, JobStatusResponse, JobSummary};
use crate::services::crawler;

const DEFAULT_HISTORY_LIMIT: i64 = 20;
const MAX_HISTORY_LIMIT: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub limit: Option<i64>,
}

/// POST /api/v1/crawl — start a background crawl of a site.
///
/// Validates the seed URL synchronously, inserts the job row, spawns the
/// crawl task onto the runtime, and returns the job id immediately. The
/// job store is the only channel between the running job and its
/// observers.
pub async fn start_crawl(
    State(state): State<AppState>,
    Json(request): Json<CrawlRequest>,
) -> Result<Json<CrawlResponse>, StatusCode> {
    request.validate().map_err(|_| StatusCode::BAD_REQUEST)?;

    let seed = Url::parse(request.url.trim()).map_err(|_| StatusCode::BAD_REQUEST)?;
    if !matches!(seed.scheme(), "http" | "https") || seed.host_str().is_none() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let job = queries::create_job(&state.db, seed.as_str())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "failed to create crawl job");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    tracing::info!(job_id = %job.id, url = %seed, "starting background crawl");
    metrics::counter!("crawl_jobs_total").increment(1);

    tokio::spawn(crawler::run_crawl_job(state.clone(), job.id, seed));

    Ok(Json(CrawlResponse {
        job_id: job.id,
        status: job.status.to_string(),
        message: "Crawl started in background".to_string(),
    }))
}

/// GET /api/v1/crawl/{job_id} — poll a crawl job.
pub async fn get_job_status(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<JobStatusResponse>, StatusCode> {
    match queries::get_job(&state.db, job_id).await {
        Ok(Some(job)) => Ok(Json(job.into())),
        Ok(None) => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            tracing::error!(job_id = %job_id, error = %e, "failed to load crawl job");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// GET /api/v1/crawl — recent crawl jobs, newest first.
pub async fn list_jobs(
    State(state): State<AppState>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<Vec<JobSummary>>, StatusCode> {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT);

    match queries::list_jobs(&state.db, limit).await {
        Ok(jobs) => Ok(Json(jobs.into_iter().map(JobSummary::from).collect())),
        Err(e) => {
            tracing::error!(error = %e, "failed to list crawl jobs");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
