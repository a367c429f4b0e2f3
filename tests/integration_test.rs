//! Integration tests against a live PostgreSQL instance.
//!
//! Note: these require a running PostgreSQL configured via DATABASE_URL
//! (migrations are applied on startup).
//!
//! Run with: cargo test --test integration_test -- --ignored

use siteharvest::app_state::AppState;
use siteharvest::config::AppConfig;
use siteharvest::db::{self, queries};
use siteharvest::models::item::{ContentType, CrawlResult, ScrapedItem};
use siteharvest::models::job::JobStatus;
use siteharvest::services::crawler;
use siteharvest::services::discovery::LinkDiscovery;
use siteharvest::services::extractor::ExtractorClient;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn sample_item(source_url: &str) -> ScrapedItem {
    ScrapedItem {
        title: "A post".to_string(),
        content: "body ".repeat(60),
        content_type: ContentType::Blog,
        source_url: source_url.to_string(),
    }
}

/// Job row lifecycle: create, checkpoint, finalize.
#[tokio::test]
#[ignore] // Requires a running PostgreSQL instance
async fn test_job_row_lifecycle() {
    let config = AppConfig::from_env().expect("Failed to load config");
    let pool = db::init_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");
    db::run_migrations(&pool).await.expect("Failed to run migrations");

    // 1. Create
    let job = queries::create_job(&pool, "https://example.com/")
        .await
        .expect("Failed to create job");
    assert_eq!(job.status, JobStatus::Processing);
    assert_eq!(job.progress, 0);
    assert_eq!(job.total, 0);
    assert!(job.result.is_none());

    // 2. Read back
    let fetched = queries::get_job(&pool, job.id)
        .await
        .expect("Failed to get job")
        .expect("Job not found");
    assert_eq!(fetched.id, job.id);
    assert_eq!(fetched.url, "https://example.com/");

    // 3. Discovery finished
    queries::update_total(&pool, job.id, 5)
        .await
        .expect("Failed to update total");
    queries::update_progress(&pool, job.id, 2)
        .await
        .expect("Failed to update progress");

    // 4. Mid-run checkpoint does not touch status
    let checkpoint = CrawlResult::checkpoint(
        "https://example.com/",
        vec![sample_item("https://example.com/a")],
    );
    queries::checkpoint_result(&pool, job.id, &checkpoint)
        .await
        .expect("Failed to checkpoint");

    let mid = queries::get_job(&pool, job.id)
        .await
        .expect("Failed to get job")
        .expect("Job not found");
    assert_eq!(mid.status, JobStatus::Processing);
    assert_eq!(mid.total, 5);
    assert_eq!(mid.progress, 2);
    let result = mid.result.expect("checkpoint should persist a result");
    assert_eq!(result["scraped"], 1);
    assert!(result.get("total").is_none());

    // 5. Finalize
    let final_result = CrawlResult::finished(
        "https://example.com/",
        vec![
            sample_item("https://example.com/a"),
            sample_item("https://example.com/b"),
        ],
        5,
    );
    queries::finalize_job(&pool, job.id, JobStatus::Partial, 5, 5, &final_result)
        .await
        .expect("Failed to finalize");

    let done = queries::get_job(&pool, job.id)
        .await
        .expect("Failed to get job")
        .expect("Job not found");
    assert_eq!(done.status, JobStatus::Partial);
    assert_eq!(done.progress, 5);
    let result = done.result.expect("final result missing");
    assert_eq!(result["scraped"], 2);
    assert_eq!(result["total"], 5);

    // 6. Listing returns newest first and includes this job
    let listed = queries::list_jobs(&pool, 20).await.expect("Failed to list jobs");
    assert!(listed.iter().any(|j| j.id == job.id));
}

/// Failure bookkeeping: error message lands on the row.
#[tokio::test]
#[ignore] // Requires a running PostgreSQL instance
async fn test_failed_job_records_error() {
    let config = AppConfig::from_env().expect("Failed to load config");
    let pool = db::init_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");
    db::run_migrations(&pool).await.expect("Failed to run migrations");

    let job = queries::create_job(&pool, "https://example.com/")
        .await
        .expect("Failed to create job");

    queries::fail_job(&pool, job.id, "link discovery failed: boom")
        .await
        .expect("Failed to fail job");

    let failed = queries::get_job(&pool, job.id)
        .await
        .expect("Failed to get job")
        .expect("Job not found");
    assert_eq!(failed.status, JobStatus::Failed);
    assert_eq!(failed.error.as_deref(), Some("link discovery failed: boom"));
}

/// Full background run against mocked remotes: sitemap discovery, two
/// pages extracted, job resolves to completed.
#[tokio::test]
#[ignore] // Requires a running PostgreSQL instance
async fn test_full_crawl_job_completes() {
    let config = AppConfig::from_env().expect("Failed to load config");
    let pool = db::init_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");
    db::run_migrations(&pool).await.expect("Failed to run migrations");

    let site = MockServer::start().await;
    let extractor_server = MockServer::start().await;

    let sitemap = format!(
        r#"<urlset>
            <url><loc>{0}/blog/one</loc></url>
            <url><loc>{0}/blog/two</loc></url>
        </urlset>"#,
        site.uri()
    );
    Mock::given(method("GET"))
        .and(path("/sitemap.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(sitemap))
        .mount(&site)
        .await;

    for slug in ["one", "two"] {
        let page_url = format!("{}/blog/{slug}", site.uri());
        Mock::given(method("GET"))
            .and(path(format!("/{page_url}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {
                    "title": format!("Post {slug}"),
                    "content": format!("# Post {slug}\n\n{}", "words ".repeat(60)),
                }
            })))
            .mount(&extractor_server)
            .await;
    }

    let extractor = ExtractorClient::new(&extractor_server.uri(), None)
        .expect("Failed to build extractor client");
    let discovery = LinkDiscovery::new().expect("Failed to build discovery");
    let state = AppState::new(pool.clone(), extractor, discovery);

    let job = queries::create_job(&pool, &format!("{}/", site.uri()))
        .await
        .expect("Failed to create job");
    let seed = Url::parse(&format!("{}/", site.uri())).unwrap();

    crawler::run_crawl_job(state, job.id, seed).await;

    let done = queries::get_job(&pool, job.id)
        .await
        .expect("Failed to get job")
        .expect("Job not found");
    assert_eq!(done.status, JobStatus::Completed);
    assert_eq!(done.progress, 2);
    assert_eq!(done.total, 2);

    let result = done.result.expect("final result missing");
    assert_eq!(result["scraped"], 2);
    assert_eq!(result["total"], 2);
    let items = result["items"].as_array().expect("items array");
    assert_eq!(items.len(), 2);

    // No duplicate source URLs in the item set.
    let mut sources: Vec<&str> = items
        .iter()
        .map(|i| i["source_url"].as_str().unwrap())
        .collect();
    sources.sort_unstable();
    sources.dedup();
    assert_eq!(sources.len(), 2);
}
