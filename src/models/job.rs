use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Status of a crawl job. `Processing` is the only non-terminal state;
/// a job never leaves `Completed`, `Partial`, or `Failed`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Display, EnumString, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum JobStatus {
    Processing,
    Completed,
    Partial,
    Failed,
}

impl JobStatus {
    /// Whether the status admits no further transitions.
    pub fn is_terminal(self) -> bool {
        !matches!(self, JobStatus::Processing)
    }
}

/// A crawl job record as stored in `scrape_jobs`.
///
/// `progress` counts URLs attempted; `total` counts URLs discovered and
/// stays 0 until discovery finishes. `result` holds the serialized
/// [`CrawlResult`](crate::models::item::CrawlResult) once at least one item
/// has been produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeJob {
    pub id: Uuid,
    pub url: String,
    pub status: JobStatus,
    pub progress: i32,
    pub total: i32,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_string_round_trip() {
        for status in [
            JobStatus::Processing,
            JobStatus::Completed,
            JobStatus::Partial,
            JobStatus::Failed,
        ] {
            let parsed: JobStatus = status.to_string().parse().unwrap();
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn test_terminal_states() {
        assert!(!JobStatus::Processing.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Partial.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
    }
}
