//! Adaptive-concurrency crawl scheduler.
//!
//! Drives the discovered URL set through the extraction endpoint in
//! sequential batches sized at the current concurrency level. The level
//! hill-climbs between fixed bounds: sustained success raises it, sustained
//! rate limiting lowers it. All pacing state is owned by the single task
//! running the job and threaded through the batch loop explicitly; nothing
//! here is shared across jobs.

use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

use crate::models::item::ScrapedItem;
use crate::services::classifier;
use crate::services::extractor::{ExtractError, ExtractorClient};

/// Concurrency bounds. Starts aggressive, backs off under sustained 429s.
const MIN_CONCURRENCY: usize = 8;
const INITIAL_CONCURRENCY: usize = 12;
const MAX_CONCURRENCY: usize = 20;

/// Consecutive successes required to raise concurrency by one.
const RAISE_AFTER_SUCCESSES: u32 = 10;

/// Consecutive rate-limited outcomes required to lower concurrency by one.
const LOWER_AFTER_RATE_LIMITS: u32 = 3;

/// Pacing delay between batches.
const BATCH_DELAY: Duration = Duration::from_millis(500);

/// Pages with trimmed content at or below this many characters are dropped.
const MIN_CONTENT_CHARS: usize = 200;

/// Concurrency level plus the streaks that move it. Owned by the batch
/// loop; outcomes are folded in deterministic order after each batch.
#[derive(Debug)]
pub struct AdaptiveConcurrency {
    current: usize,
    consecutive_successes: u32,
    consecutive_rate_limits: u32,
}

impl AdaptiveConcurrency {
    pub fn new() -> Self {
        Self {
            current: INITIAL_CONCURRENCY,
            consecutive_successes: 0,
            consecutive_rate_limits: 0,
        }
    }

    pub fn current(&self) -> usize {
        self.current
    }

    /// A fetch completed with a 2xx. Ten in a row raise the level by one,
    /// up to the maximum.
    fn record_success(&mut self) {
        self.consecutive_rate_limits = 0;
        self.consecutive_successes += 1;

        if self.consecutive_successes >= RAISE_AFTER_SUCCESSES && self.current < MAX_CONCURRENCY {
            self.current += 1;
            self.consecutive_successes = 0;
            tracing::info!(concurrency = self.current, "increased crawl concurrency");
        }
    }

    /// A fetch ended rate-limited after retries. Three in a row lower the
    /// level by one, never below the minimum.
    fn record_rate_limited(&mut self) {
        self.consecutive_successes = 0;
        self.consecutive_rate_limits += 1;

        if self.consecutive_rate_limits >= LOWER_AFTER_RATE_LIMITS && self.current > MIN_CONCURRENCY
        {
            self.current -= 1;
            self.consecutive_rate_limits = 0;
            tracing::info!(concurrency = self.current, "reduced crawl concurrency due to rate limits");
        }
    }
}

impl Default for AdaptiveConcurrency {
    fn default() -> Self {
        Self::new()
    }
}

/// What the batch loop reports back to the job controller.
#[derive(Debug, Clone, Copy)]
pub struct CrawlSummary {
    /// URLs attempted, whether or not they yielded an item.
    pub attempted: usize,
    /// True when the wall-clock deadline stopped the loop before the URL
    /// set was exhausted.
    pub timed_out: bool,
}

/// Crawl `urls` until the set is exhausted or `deadline` passes.
///
/// Accepted items are appended to `items` as batches complete so the
/// controller's checkpoint timer sees them mid-run; `report_progress`
/// receives the cumulative attempted count after every batch. The deadline
/// is checked before each batch; once exceeded, the loop stops without
/// starting the next batch.
pub async fn crawl_urls<F, Fut>(
    extractor: &ExtractorClient,
    urls: &[String],
    deadline: Instant,
    items: &Mutex<Vec<ScrapedItem>>,
    mut report_progress: F,
) -> CrawlSummary
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = ()>,
{
    let mut pacing = AdaptiveConcurrency::new();
    let mut attempted = 0;

    while attempted < urls.len() {
        if Instant::now() >= deadline {
            tracing::warn!(
                attempted,
                total = urls.len(),
                "crawl deadline reached, stopping with partial results"
            );
            return CrawlSummary {
                attempted,
                timed_out: true,
            };
        }

        let batch_end = (attempted + pacing.current()).min(urls.len());
        let batch = &urls[attempted..batch_end];

        let outcomes =
            futures::future::join_all(batch.iter().map(|url| extractor.extract(url))).await;

        for (url, outcome) in batch.iter().zip(outcomes) {
            match outcome {
                Ok(page) => {
                    pacing.record_success();

                    if page.content.trim().is_empty()
                        || page.content.chars().count() <= MIN_CONTENT_CHARS
                    {
                        tracing::debug!(%url, "content too short, dropping");
                        continue;
                    }

                    let title = page.title_or(url);
                    let content_type =
                        classifier::classify_crawled_page(url, &title, &page.content);
                    tracing::debug!(%url, %content_type, "scraped page");

                    items.lock().unwrap().push(ScrapedItem {
                        title,
                        content: page.content,
                        content_type,
                        source_url: url.clone(),
                    });
                }
                Err(ExtractError::RateLimited) => {
                    pacing.record_rate_limited();
                    tracing::debug!(%url, "rate limited");
                }
                Err(e) => {
                    // Permanent or retry-exhausted failure: drop the URL,
                    // the crawl continues. Leaves both streaks untouched.
                    tracing::debug!(%url, error = %e, "fetch failed, dropping URL");
                }
            }
        }

        attempted = batch_end;
        report_progress(attempted).await;

        if attempted < urls.len() {
            tokio::time::sleep(BATCH_DELAY).await;
        }
    }

    CrawlSummary {
        attempted,
        timed_out: false,
    }
}
