//! Content-type classification for extracted pages.
//!
//! Two deterministic classifiers over `(url, title, content)`, matched
//! case-insensitively in a fixed order. They differ in check order and in
//! their default label: crawled pages are overwhelmingly article-like, so
//! [`classify_crawled_page`] falls back to `Blog`, while the standalone
//! classifier used for ad-hoc pages falls back to `Other`. The divergence
//! is deliberate (see DESIGN.md) and must not be unified silently.

use regex::Regex;
use std::sync::OnceLock;

use crate::models::item::ContentType;

/// `/YYYY/MM/` date segment in a path, a strong blog-permalink signal.
fn date_path_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"/\d{4}/\d{2}/").expect("valid regex"))
}

/// Classify a page reached by the crawl scheduler. Defaults to `Blog`.
pub fn classify_crawled_page(url: &str, title: &str, content: &str) -> ContentType {
    let url = url.to_lowercase();
    let title = title.to_lowercase();
    let content = content.to_lowercase();

    if url.contains("/blog") || url.contains("/post") {
        return ContentType::Blog;
    }
    if url.contains("/podcast") || content.contains("transcript") {
        return ContentType::PodcastTranscript;
    }
    if url.contains("linkedin.com") {
        return ContentType::LinkedinPost;
    }
    if url.contains("reddit.com") {
        return ContentType::RedditComment;
    }
    if title.contains("book") || content.contains("chapter") {
        return ContentType::Book;
    }

    ContentType::Blog
}

/// Classify an arbitrary page outside a crawl (host signals first, broader
/// path heuristics, then transcript markers). Defaults to `Other`.
pub fn classify_standalone(url: &str, title: &str, content: &str) -> ContentType {
    let url = url.to_lowercase();
    let title = title.to_lowercase();
    let content = content.to_lowercase();

    if url.contains("linkedin.com") || title.contains("linkedin") {
        return ContentType::LinkedinPost;
    }
    if url.contains("reddit.com") || title.contains("reddit") {
        return ContentType::RedditComment;
    }
    if url.contains("/podcast")
        || title.contains("podcast")
        || url.contains("/episode")
        || content.contains("transcript")
        || content.contains("listen to")
    {
        return ContentType::PodcastTranscript;
    }
    if url.contains("/book")
        || title.contains("chapter")
        || title.contains("book")
        || url.contains("/chapter")
    {
        return ContentType::Book;
    }
    if url.contains("/blog")
        || url.contains("/post")
        || url.contains("/article")
        || url.contains("/guide")
        || url.contains("/learn")
        || url.contains("/topics")
        || url.contains("/interview")
        || url.contains("/insights")
        || url.contains("/news")
        || date_path_pattern().is_match(&url)
        || title.contains("guide")
    {
        return ContentType::Blog;
    }
    if content.contains("speaker:")
        || content.contains("transcript:")
        || title.contains("call transcript")
    {
        return ContentType::CallTranscript;
    }

    ContentType::Other
}
