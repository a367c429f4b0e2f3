//! Link discovery for a seed site.
//!
//! Three fallback strategies, tried in priority order:
//! 1. feed/sitemap probing at conventional paths, short-circuiting on the
//!    first feed that yields same-host URLs;
//! 2. probing conventional content-section paths through the extraction
//!    service;
//! 3. extracting same-host links from the seed page's own markdown.
//!
//! Strategies 2 and 3 are unioned; deduplication by exact URL string is
//! owned here and nowhere else. Navigation/utility paths are filtered from
//! the output of every strategy. An empty result means the caller must fall
//! back to treating the seed page itself as the sole item, so when strategy
//! 3 runs, the fetched seed page is handed back for reuse.

use regex::Regex;
use reqwest::Client;
use std::collections::HashSet;
use std::sync::OnceLock;
use std::time::Duration;
use url::Url;

use crate::services::extractor::{ExtractError, ExtractedPage, ExtractorClient};

/// Timeout for direct feed probes and extraction-service path probes.
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Delay between consecutive content-section probes.
const PROBE_DELAY: Duration = Duration::from_millis(200);

/// Conventional feed and sitemap locations, probed relative to the origin.
const FEED_PATHS: &[&str] = &[
    "/feed",
    "/feed.xml",
    "/rss",
    "/rss.xml",
    "/atom.xml",
    "/sitemap.xml",
    "/blog/feed",
    "/blog/rss",
];

/// Conventional content-section paths probed through the extraction service.
const CONTENT_SECTION_PATHS: &[&str] = &[
    "/blog",
    "/articles",
    "/posts",
    "/learn",
    "/guides",
    "/resources",
    "/news",
];

/// Navigation/utility path fragments that never lead to content. Kept
/// short on purpose; everything not matched is retained to avoid
/// under-collection.
const NAV_PATH_PATTERNS: &[&str] = &[
    "/signup",
    "/login",
    "/logout",
    "/signin",
    "/register",
    "/about",
    "/contact",
    "/privacy",
    "/terms",
    "/faq",
    "/pricing",
    "/features",
    "/careers",
    "/jobs",
    "/support",
    "/help",
    "/demo",
    "/account",
    "/settings",
];

fn markdown_link_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").expect("valid regex"))
}

fn bare_url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"https?://[^\s\)]+").expect("valid regex"))
}

fn asset_extension_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"(?i)\.(svg|png|jpg|jpeg|gif|ico|css|js)$").expect("valid regex"))
}

fn feed_loc_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"<loc>([^<]+)</loc>").expect("valid regex"))
}

fn feed_link_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"<link>([^<]+)</link>").expect("valid regex"))
}

/// Outcome of link discovery.
#[derive(Debug)]
pub enum Discovered {
    /// Candidate content URLs, deduplicated and filtered.
    Urls(Vec<String>),
    /// No candidate URLs anywhere; the already-fetched seed page is the
    /// whole crawl.
    SeedPageOnly(ExtractedPage),
}

/// Discovers candidate content URLs for a seed site.
pub struct LinkDiscovery {
    http: Client,
}

impl LinkDiscovery {
    pub fn new() -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(PROBE_TIMEOUT).build()?;
        Ok(Self { http })
    }

    /// Run the discovery strategies against `seed`.
    ///
    /// Errors only when nothing was found by feeds or path probes *and* the
    /// seed page itself could not be extracted; a feed or common-path miss
    /// is a normal fallback trigger, not an error.
    pub async fn discover(
        &self,
        extractor: &ExtractorClient,
        seed: &Url,
    ) -> Result<Discovered, ExtractError> {
        let from_feed = self.discover_feed(seed).await;
        if !from_feed.is_empty() {
            tracing::info!(site = %seed, count = from_feed.len(), "discovered URLs via feed");
            return Ok(Discovered::Urls(from_feed));
        }

        tracing::info!(site = %seed, "no feed found, probing content sections");
        let mut urls = self.probe_content_sections(extractor, seed).await;

        match extractor.extract(seed.as_str()).await {
            Ok(page) => {
                let mut seen: HashSet<String> = urls.iter().cloned().collect();
                for link in extract_links(&page.content, seed) {
                    if seen.insert(link.clone()) {
                        urls.push(link);
                    }
                }
                if urls.is_empty() {
                    tracing::info!(site = %seed, "no links anywhere, falling back to seed page");
                    return Ok(Discovered::SeedPageOnly(page));
                }
                tracing::info!(site = %seed, count = urls.len(), "discovered URLs via page links");
                Ok(Discovered::Urls(urls))
            }
            Err(e) if !urls.is_empty() => {
                // The probes already produced candidates; losing the seed
                // page costs one URL, not the whole crawl.
                tracing::warn!(site = %seed, error = %e, "seed page fetch failed, using probed links");
                Ok(Discovered::Urls(urls))
            }
            Err(e) => Err(e),
        }
    }

    /// Probe conventional feed paths, returning the URL set of the first
    /// feed that yields same-host entries.
    async fn discover_feed(&self, seed: &Url) -> Vec<String> {
        for path in FEED_PATHS {
            let Ok(feed_url) = seed.join(path) else {
                continue;
            };

            let body = match self.http.get(feed_url.clone()).send().await {
                Ok(resp) if resp.status().is_success() => match resp.text().await {
                    Ok(body) => body,
                    Err(_) => continue,
                },
                _ => continue,
            };

            if looks_like_feed(&body) {
                let urls = extract_feed_urls(&body, seed);
                if !urls.is_empty() {
                    tracing::info!(feed = %feed_url, count = urls.len(), "found feed");
                    return urls;
                }
            }
        }

        Vec::new()
    }

    /// Probe conventional content-section paths through the extraction
    /// service, collecting same-host links from each page that resolves.
    async fn probe_content_sections(&self, extractor: &ExtractorClient, seed: &Url) -> Vec<String> {
        let mut discovered = Vec::new();
        let mut seen = HashSet::new();

        for path in CONTENT_SECTION_PATHS {
            let Ok(probe) = seed.join(path) else {
                continue;
            };

            match extractor.extract_once(probe.as_str(), PROBE_TIMEOUT).await {
                Ok(page) => {
                    for link in extract_links(&page.content, seed) {
                        if seen.insert(link.clone()) {
                            discovered.push(link);
                        }
                    }
                }
                Err(e) => {
                    tracing::debug!(probe = %probe, error = %e, "content-section probe missed");
                }
            }

            tokio::time::sleep(PROBE_DELAY).await;
        }

        discovered
    }
}

/// Whether a response body is an RSS/Atom feed or a sitemap.
fn looks_like_feed(body: &str) -> bool {
    body.contains("<rss") || body.contains("<feed") || body.contains("<urlset")
}

/// Extract same-host URLs from `<loc>`/`<link>` elements of a feed or
/// sitemap body. Entries must be absolute URLs.
pub fn extract_feed_urls(xml: &str, seed: &Url) -> Vec<String> {
    let mut urls = Vec::new();
    let mut seen = HashSet::new();

    for pattern in [feed_loc_pattern(), feed_link_pattern()] {
        for capture in pattern.captures_iter(xml) {
            let Ok(url) = Url::parse(capture[1].trim()) else {
                continue;
            };
            if url.host_str() != seed.host_str() {
                continue;
            }
            let url = url.to_string();
            if !is_nav_path(&url) && seen.insert(url.clone()) {
                urls.push(url);
            }
        }
    }

    urls
}

/// Extract same-host content links from markdown text.
///
/// Two passes whose matches overlap on purpose: explicit `[label](url)`
/// markup (relative URLs resolve against the seed) and bare absolute URLs.
/// Asset files, the seed's own path, and navigation paths are dropped; the
/// union is deduplicated by exact URL string.
pub fn extract_links(markdown: &str, seed: &Url) -> Vec<String> {
    let mut links = Vec::new();
    let mut seen = HashSet::new();

    let mut push = |url: Url| {
        if url.host_str() != seed.host_str() {
            return;
        }
        if url.path() == seed.path() {
            return;
        }
        let url = url.to_string();
        if asset_extension_pattern().is_match(&url) || is_nav_path(&url) {
            return;
        }
        if seen.insert(url.clone()) {
            links.push(url);
        }
    };

    for capture in markdown_link_pattern().captures_iter(markdown) {
        if let Ok(url) = seed.join(capture[2].trim()) {
            push(url);
        }
    }

    for found in bare_url_pattern().find_iter(markdown) {
        if let Ok(url) = Url::parse(found.as_str()) {
            push(url);
        }
    }

    links
}

/// Whether a URL points at a known non-content path (login, pricing, ...).
pub fn is_nav_path(url: &str) -> bool {
    let lower = url.to_lowercase();
    NAV_PATH_PATTERNS.iter().any(|p| lower.contains(p))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed() -> Url {
        Url::parse("https://example.com/").unwrap()
    }

    #[test]
    fn test_feed_detection() {
        assert!(looks_like_feed("<?xml version=\"1.0\"?><rss version=\"2.0\">"));
        assert!(looks_like_feed("<feed xmlns=\"http://www.w3.org/2005/Atom\">"));
        assert!(looks_like_feed("<urlset xmlns=\"...\">"));
        assert!(!looks_like_feed("<html><body>not a feed</body></html>"));
    }

    #[test]
    fn test_sitemap_loc_extraction() {
        let xml = r#"
            <urlset>
                <url><loc>https://example.com/blog/one</loc></url>
                <url><loc>https://example.com/blog/two</loc></url>
                <url><loc>https://other.com/blog/three</loc></url>
            </urlset>
        "#;
        let urls = extract_feed_urls(xml, &seed());
        assert_eq!(
            urls,
            vec![
                "https://example.com/blog/one".to_string(),
                "https://example.com/blog/two".to_string(),
            ]
        );
    }

    #[test]
    fn test_rss_link_extraction_dedups() {
        let xml = r#"
            <rss><channel>
                <item><link>https://example.com/post-a</link></item>
                <item><link>https://example.com/post-a</link></item>
                <item><link>relative-not-a-url</link></item>
            </channel></rss>
        "#;
        let urls = extract_feed_urls(xml, &seed());
        assert_eq!(urls, vec!["https://example.com/post-a".to_string()]);
    }

    #[test]
    fn test_feed_urls_nav_filtered() {
        let xml = r#"
            <urlset>
                <url><loc>https://example.com/blog/one</loc></url>
                <url><loc>https://example.com/pricing</loc></url>
            </urlset>
        "#;
        let urls = extract_feed_urls(xml, &seed());
        assert_eq!(urls, vec!["https://example.com/blog/one".to_string()]);
    }

    #[test]
    fn test_markdown_links_resolve_relative() {
        let md = "See [the guide](/guides-of-rust) and [other](https://example.com/articles/x).";
        let urls = extract_links(md, &seed());
        assert_eq!(
            urls,
            vec![
                "https://example.com/guides-of-rust".to_string(),
                "https://example.com/articles/x".to_string(),
            ]
        );
    }

    #[test]
    fn test_bare_urls_extracted() {
        let md = "Read https://example.com/blog/bare-post for more.";
        let urls = extract_links(md, &seed());
        assert_eq!(urls, vec!["https://example.com/blog/bare-post".to_string()]);
    }

    #[test]
    fn test_overlapping_passes_dedup() {
        let md = "[Post](https://example.com/blog/p1) at https://example.com/blog/p1";
        let urls = extract_links(md, &seed());
        assert_eq!(urls.len(), 1);
    }

    #[test]
    fn test_offsite_links_dropped() {
        let md = "[Elsewhere](https://other.com/blog/x) and https://other.com/y";
        assert!(extract_links(md, &seed()).is_empty());
    }

    #[test]
    fn test_asset_links_dropped() {
        let md = "![logo](https://example.com/logo.svg) [styles](https://example.com/app.CSS) \
                  [post](https://example.com/writing/p)";
        let urls = extract_links(md, &seed());
        assert_eq!(urls, vec!["https://example.com/writing/p".to_string()]);
    }

    #[test]
    fn test_seed_path_excluded() {
        let base = Url::parse("https://example.com/landing").unwrap();
        let md = "[self](https://example.com/landing) [other](https://example.com/story)";
        let urls = extract_links(md, &base);
        assert_eq!(urls, vec!["https://example.com/story".to_string()]);
    }

    #[test]
    fn test_nav_links_filtered() {
        let md = "[login](https://example.com/login) [pricing](https://example.com/pricing) \
                  [post](https://example.com/writing/p) [about](https://example.com/about-us)";
        let urls = extract_links(md, &seed());
        assert_eq!(urls, vec!["https://example.com/writing/p".to_string()]);
    }

    #[test]
    fn test_nav_filter_case_insensitive() {
        assert!(is_nav_path("https://example.com/Pricing"));
        assert!(is_nav_path("https://example.com/team/ABOUT"));
        assert!(!is_nav_path("https://example.com/writing/p"));
    }
}
