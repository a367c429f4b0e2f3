use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Coarse content-type label assigned to an extracted page.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Display, EnumString, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ContentType {
    LinkedinPost,
    RedditComment,
    PodcastTranscript,
    Book,
    Blog,
    CallTranscript,
    Other,
}

/// One extracted page. Immutable once produced; `source_url` is unique
/// within a job's item set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScrapedItem {
    pub title: String,
    pub content: String,
    pub content_type: ContentType,
    pub source_url: String,
}

/// The job's `result` payload. Periodic checkpoints omit `total` (it may
/// not be known yet); terminal writes always include it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlResult {
    pub site: String,
    pub items: Vec<ScrapedItem>,
    pub scraped: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<usize>,
}

impl CrawlResult {
    pub fn checkpoint(site: &str, items: Vec<ScrapedItem>) -> Self {
        let scraped = items.len();
        Self {
            site: site.to_string(),
            items,
            scraped,
            total: None,
        }
    }

    pub fn finished(site: &str, items: Vec<ScrapedItem>, total: usize) -> Self {
        let scraped = items.len();
        Self {
            site: site.to_string(),
            items,
            scraped,
            total: Some(total),
        }
    }
}
