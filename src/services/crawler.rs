//! Crawl job controller.
//!
//! [`run_crawl_job`] is spawned onto the runtime by the submit handler and
//! owns the whole lifecycle of one job: link discovery, the scheduler run,
//! periodic result checkpoints, and exactly one terminal status write. The
//! job store row is the only channel back to polling clients; a failure on
//! any path still resolves the row out of `processing`.

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use url::Url;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::db::queries;
use crate::models::item::{CrawlResult, ScrapedItem};
use crate::models::job::JobStatus;
use crate::services::classifier;
use crate::services::discovery::Discovered;
use crate::services::extractor::ExtractError;
use crate::services::scheduler;

/// Wall-clock budget for one job, measured from job start.
const JOB_TIME_BUDGET: Duration = Duration::from_secs(300);

/// How often accumulated items are checkpointed into the job row.
const CHECKPOINT_INTERVAL: Duration = Duration::from_secs(15);

/// A run that extracted at least this share of the discovered URLs counts
/// as complete; anything less is partial.
const COMPLETION_RATIO: f64 = 0.8;

#[derive(Debug, thiserror::Error)]
enum CrawlError {
    #[error("link discovery failed: {0}")]
    Discovery(#[from] ExtractError),

    #[error("job store error: {0}")]
    Store(#[from] sqlx::Error),
}

/// Entry point for the spawned background task. Never panics the runtime;
/// all failure paths resolve the job row to a terminal status.
pub async fn run_crawl_job(state: AppState, job_id: Uuid, seed: Url) {
    let started = Instant::now();
    let items: Arc<Mutex<Vec<ScrapedItem>>> = Arc::new(Mutex::new(Vec::new()));

    let checkpointer = tokio::spawn(checkpoint_loop(
        state.db.clone(),
        job_id,
        seed.to_string(),
        Arc::clone(&items),
    ));

    let outcome = crawl_site(&state, job_id, &seed, &items, started).await;
    checkpointer.abort();

    if let Err(e) = outcome {
        tracing::error!(job_id = %job_id, error = %e, "crawl job failed");

        // Salvage whatever was accumulated before the failure.
        let salvaged = items.lock().unwrap().clone();
        if salvaged.is_empty() {
            if let Err(store_err) = queries::fail_job(&state.db, job_id, &e.to_string()).await {
                tracing::error!(job_id = %job_id, error = %store_err, "failed to record job failure");
            }
            metrics::counter!("crawl_jobs_failed").increment(1);
        } else {
            let result = CrawlResult::checkpoint(seed.as_str(), salvaged);
            if let Err(store_err) = queries::mark_partial(&state.db, job_id, &result).await {
                tracing::error!(job_id = %job_id, error = %store_err, "failed to record partial result");
            }
            metrics::counter!("crawl_jobs_partial").increment(1);
        }
    }

    metrics::histogram!("crawl_job_duration_seconds").record(started.elapsed().as_secs_f64());
}

/// The fallible body of a job. Terminal writes for the success paths
/// happen in here; an `Err` return means no terminal status was written
/// yet and the caller must resolve the row.
async fn crawl_site(
    state: &AppState,
    job_id: Uuid,
    seed: &Url,
    items: &Arc<Mutex<Vec<ScrapedItem>>>,
    started: Instant,
) -> Result<(), CrawlError> {
    let deadline = started + JOB_TIME_BUDGET;

    let urls = match state.discovery.discover(&state.extractor, seed).await? {
        Discovered::Urls(urls) => urls,
        Discovered::SeedPageOnly(page) => {
            // Nothing to crawl beyond the seed itself: one item, done.
            let title = page.title_or(seed.as_str());
            let content_type = classifier::classify_crawled_page(seed.as_str(), &title, &page.content);
            let item = ScrapedItem {
                title,
                content: page.content,
                content_type,
                source_url: seed.to_string(),
            };
            items.lock().unwrap().push(item.clone());

            let result = CrawlResult::finished(seed.as_str(), vec![item], 1);
            queries::finalize_job(&state.db, job_id, JobStatus::Completed, 1, 1, &result).await?;

            tracing::info!(job_id = %job_id, site = %seed, "completed single-page crawl");
            metrics::counter!("crawl_jobs_completed").increment(1);
            metrics::counter!("crawl_pages_scraped").increment(1);
            return Ok(());
        }
    };

    queries::update_total(&state.db, job_id, urls.len() as i32).await?;
    tracing::info!(job_id = %job_id, site = %seed, total = urls.len(), "starting crawl");

    let pool = state.db.clone();
    let summary = scheduler::crawl_urls(&state.extractor, &urls, deadline, items, |attempted| {
        let pool = pool.clone();
        async move {
            if let Err(e) = queries::update_progress(&pool, job_id, attempted as i32).await {
                tracing::warn!(job_id = %job_id, error = %e, "failed to record crawl progress");
            }
        }
    })
    .await;

    let final_items = items.lock().unwrap().clone();
    let scraped = final_items.len();
    let status = resolve_final_status(scraped, urls.len(), summary.timed_out);
    let result = CrawlResult::finished(seed.as_str(), final_items, urls.len());

    // Last-write-wins on the row; if the store is gone there is nothing
    // more useful to do than log it.
    if let Err(e) = queries::finalize_job(
        &state.db,
        job_id,
        status,
        summary.attempted as i32,
        urls.len() as i32,
        &result,
    )
    .await
    {
        tracing::error!(job_id = %job_id, error = %e, "failed to save final crawl status");
    }

    tracing::info!(
        job_id = %job_id,
        site = %seed,
        %status,
        scraped,
        attempted = summary.attempted,
        total = urls.len(),
        timed_out = summary.timed_out,
        "crawl finished"
    );

    match status {
        JobStatus::Completed => metrics::counter!("crawl_jobs_completed").increment(1),
        _ => metrics::counter!("crawl_jobs_partial").increment(1),
    }
    metrics::counter!("crawl_pages_scraped").increment(scraped as u64);

    Ok(())
}

/// Terminal status for a finished scheduler run. A timeout truncation is
/// partial no matter the ratio; otherwise the 80% threshold decides.
fn resolve_final_status(scraped: usize, total: usize, timed_out: bool) -> JobStatus {
    if timed_out {
        return JobStatus::Partial;
    }
    if scraped as f64 >= total as f64 * COMPLETION_RATIO {
        JobStatus::Completed
    } else {
        JobStatus::Partial
    }
}

/// Periodically writes accumulated items into the job row, without
/// touching `status`, so polling clients see live progress mid-run.
/// Aborted by the owner once the crawl settles.
async fn checkpoint_loop(
    pool: sqlx::PgPool,
    job_id: Uuid,
    site: String,
    items: Arc<Mutex<Vec<ScrapedItem>>>,
) {
    let mut interval = tokio::time::interval(CHECKPOINT_INTERVAL);
    // The first tick completes immediately; skip it so checkpoints start
    // one full interval after job start.
    interval.tick().await;

    loop {
        interval.tick().await;

        let snapshot = items.lock().unwrap().clone();
        if snapshot.is_empty() {
            continue;
        }

        let count = snapshot.len();
        let result = CrawlResult::checkpoint(&site, snapshot);
        match queries::checkpoint_result(&pool, job_id, &result).await {
            Ok(()) => tracing::debug!(job_id = %job_id, items = count, "checkpointed crawl progress"),
            Err(e) => tracing::warn!(job_id = %job_id, error = %e, "checkpoint write failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_is_always_partial() {
        assert_eq!(resolve_final_status(100, 100, true), JobStatus::Partial);
        assert_eq!(resolve_final_status(99, 100, true), JobStatus::Partial);
        assert_eq!(resolve_final_status(0, 100, true), JobStatus::Partial);
    }

    #[test]
    fn test_ratio_threshold() {
        assert_eq!(resolve_final_status(80, 100, false), JobStatus::Completed);
        assert_eq!(resolve_final_status(79, 100, false), JobStatus::Partial);
        assert_eq!(resolve_final_status(100, 100, false), JobStatus::Completed);
        assert_eq!(resolve_final_status(4, 5, false), JobStatus::Completed);
        assert_eq!(resolve_final_status(3, 5, false), JobStatus::Partial);
    }
}
