//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end.

use devread_crawler::config::{
    Config, CrawlerConfig, FetcherConfig, PaginationConfig, SelectorConfig, SiteConfig,
    StorageConfig, UserAgentConfig,
};
use devread_crawler::crawler::{crawl_all, crawl_site};
use devread_crawler::Post;
use devread_crawler::storage::{MemoryPostRepository, RunStatus, SqlitePostRepository};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration with one site served by `server_uri`
fn create_test_config(server_uri: &str, pagination: PaginationConfig, db_path: &str) -> Config {
    Config {
        crawler: CrawlerConfig {
            page_concurrency: Some(1),
            worker_count: Some(2),
            queue_capacity: None,
        },
        fetcher: FetcherConfig {
            initial_interval_ms: 5, // Very short for testing
            multiplier: 1.5,
            max_interval_secs: 1,
            max_attempts: Some(5),
            max_elapsed_secs: None,
            timeout_secs: 5,
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        storage: StorageConfig {
            database_path: db_path.to_string(),
        },
        sites: vec![test_site("mock-blog", server_uri, pagination)],
    }
}

fn test_site(name: &str, server_uri: &str, pagination: PaginationConfig) -> SiteConfig {
    SiteConfig {
        name: name.to_string(),
        page_url: format!("{}/posts?page={{page}}", server_uri),
        base_url: None,
        pagination,
        selectors: SelectorConfig {
            post: "div[class=post]".to_string(),
            title: "h3.post__title > a".to_string(),
            link: None,
            tag: Some("span.tagging > a".to_string()),
        },
    }
}

/// Renders a listing page with `(title, slug)` posts and an optional next link
fn listing(posts: &[(&str, &str)], next_page: Option<u32>) -> String {
    let mut body = String::from("<html><body>");
    for (title, slug) in posts {
        body.push_str(&format!(
            r##"<div class="post"><h3 class="post__title"><a href="/posts/{}">{}</a></h3><span class="tagging"><a>#Rust</a></span></div>"##,
            slug, title
        ));
    }
    if let Some(n) = next_page {
        body.push_str(&format!(
            r#"<nav><a class="next" href="/posts?page={}">Next</a></nav>"#,
            n
        ));
    }
    body.push_str("</body></html>");
    body
}

async fn mount_page(server: &MockServer, page: u32, body: String) {
    Mock::given(method("GET"))
        .and(path("/posts"))
        .and(query_param("page", page.to_string()))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_shared_post_is_created_once() {
    let mock_server = MockServer::start().await;
    mount_page(
        &mock_server,
        1,
        listing(&[("Async Rust", "async-rust"), ("Ownership", "ownership")], None),
    )
    .await;
    mount_page(
        &mock_server,
        2,
        listing(&[("Ownership", "ownership"), ("Lifetimes", "lifetimes")], None),
    )
    .await;

    let config = create_test_config(
        &mock_server.uri(),
        PaginationConfig::FixedRange { pages: 2 },
        ":memory:",
    );
    let repo = Arc::new(MemoryPostRepository::new());

    let summary = crawl_site(
        &config.sites[0],
        &config,
        repo.clone(),
        CancellationToken::new(),
    )
    .await
    .expect("crawl should succeed");

    assert_eq!(repo.len(), 3);
    assert_eq!(repo.calls().creates, 3);
    assert_eq!(repo.calls().updates, 0);
    assert_eq!(summary.pages_processed, 2);
    assert_eq!(summary.candidates, 4);
    assert_eq!(summary.created, 3);
    assert_eq!(summary.unchanged, 1);
}

#[tokio::test]
async fn test_link_following_discovers_pages() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, 1, listing(&[("First", "first")], Some(2))).await;
    mount_page(&mock_server, 2, listing(&[("Second", "second")], Some(3))).await;
    mount_page(&mock_server, 3, listing(&[("Third", "third")], None)).await;

    let config = create_test_config(
        &mock_server.uri(),
        PaginationConfig::LinkFollowing {
            next_selector: "a.next".to_string(),
        },
        ":memory:",
    );
    let repo = Arc::new(MemoryPostRepository::new());

    let summary = crawl_site(
        &config.sites[0],
        &config,
        repo.clone(),
        CancellationToken::new(),
    )
    .await
    .expect("crawl should succeed");

    assert_eq!(summary.pages_processed, 3);
    assert_eq!(repo.len(), 3);

    for name in ["First", "Second", "Third"] {
        let expected = Post::new(
            name,
            format!("{}/posts/{}", mock_server.uri(), name.to_lowercase()),
            "",
        );
        let stored = repo.get(&expected.identity).expect("post should be stored");
        assert_eq!(stored.name, name);
        assert_eq!(stored.tag, "rust");
    }
}

#[tokio::test]
async fn test_transient_failures_are_retried() {
    let mock_server = MockServer::start().await;

    // First three requests fail, then the page is served
    Mock::given(method("GET"))
        .and(path("/posts"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(3)
        .expect(3)
        .mount(&mock_server)
        .await;
    mount_page(&mock_server, 1, listing(&[("Retried", "retried")], None)).await;

    let config = create_test_config(
        &mock_server.uri(),
        PaginationConfig::FixedRange { pages: 1 },
        ":memory:",
    );
    let repo = Arc::new(MemoryPostRepository::new());

    let summary = crawl_site(
        &config.sites[0],
        &config,
        repo.clone(),
        CancellationToken::new(),
    )
    .await
    .expect("crawl should succeed");

    assert_eq!(summary.pages_processed, 1);
    assert_eq!(summary.pages_failed, 0);
    assert_eq!(summary.created, 1);
}

#[tokio::test]
async fn test_failed_page_does_not_fail_run() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, 1, listing(&[("Kept", "kept")], None)).await;
    Mock::given(method("GET"))
        .and(path("/posts"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;
    mount_page(&mock_server, 3, listing(&[("Also kept", "also-kept")], None)).await;

    let mut config = create_test_config(
        &mock_server.uri(),
        PaginationConfig::FixedRange { pages: 3 },
        ":memory:",
    );
    config.fetcher.max_attempts = Some(2);
    let repo = Arc::new(MemoryPostRepository::new());

    let summary = crawl_site(
        &config.sites[0],
        &config,
        repo.clone(),
        CancellationToken::new(),
    )
    .await
    .expect("a failed page should not fail the run");

    assert_eq!(summary.pages_processed, 2);
    assert_eq!(summary.pages_failed, 1);
    assert_eq!(repo.len(), 2);
}

#[tokio::test]
async fn test_recrawl_is_idempotent() {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("posts.db");

    let mock_server = MockServer::start().await;
    mount_page(
        &mock_server,
        1,
        listing(&[("One", "one"), ("Two", "two")], None),
    )
    .await;
    mount_page(&mock_server, 2, listing(&[("Three", "three")], None)).await;

    let config = create_test_config(
        &mock_server.uri(),
        PaginationConfig::FixedRange { pages: 2 },
        db_path.to_str().unwrap(),
    );
    let repo = Arc::new(SqlitePostRepository::new(&db_path).expect("Failed to open storage"));

    let first = crawl_site(
        &config.sites[0],
        &config,
        repo.clone(),
        CancellationToken::new(),
    )
    .await
    .unwrap();
    assert_eq!(first.created, 3);

    let second = crawl_site(
        &config.sites[0],
        &config,
        repo.clone(),
        CancellationToken::new(),
    )
    .await
    .unwrap();
    assert_eq!(second.created, 0);
    assert_eq!(second.updated, 0);
    assert_eq!(second.unchanged, 3);
    assert_eq!(repo.count_posts().unwrap(), 3);
}

#[tokio::test]
async fn test_run_ledger_records_summary() {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("posts.db");

    let mock_server = MockServer::start().await;
    mount_page(&mock_server, 1, listing(&[("Logged", "logged")], None)).await;

    let config = create_test_config(
        &mock_server.uri(),
        PaginationConfig::FixedRange { pages: 1 },
        db_path.to_str().unwrap(),
    );
    let repo = Arc::new(SqlitePostRepository::new(&db_path).unwrap());
    let site = &config.sites[0];

    let run_id = repo.create_run(&site.name, "test-hash").unwrap();
    let summary = crawl_site(site, &config, repo.clone(), CancellationToken::new())
        .await
        .unwrap();
    repo.complete_run(run_id, RunStatus::Completed, &summary)
        .unwrap();

    let run = repo.get_latest_run(&site.name).unwrap().unwrap();
    assert_eq!(run.id, run_id);
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.config_hash, "test-hash");
    assert_eq!(run.posts_created, 1);
    assert!(run.finished_at.is_some());
}

#[tokio::test]
async fn test_cancelled_crawl_writes_nothing() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, 1, listing(&[("Skipped", "skipped")], None)).await;

    let config = create_test_config(
        &mock_server.uri(),
        PaginationConfig::FixedRange { pages: 1 },
        ":memory:",
    );
    let repo = Arc::new(MemoryPostRepository::new());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let summary = crawl_site(&config.sites[0], &config, repo.clone(), cancel)
        .await
        .unwrap();

    assert_eq!(summary.pages_skipped, 1);
    assert!(repo.is_empty());
}

#[tokio::test]
async fn test_crawl_all_merges_sites() {
    let first_server = MockServer::start().await;
    mount_page(&first_server, 1, listing(&[("Alpha", "alpha")], None)).await;
    let second_server = MockServer::start().await;
    mount_page(
        &second_server,
        1,
        listing(&[("Beta", "beta"), ("Gamma", "gamma")], None),
    )
    .await;

    let mut config = create_test_config(
        &first_server.uri(),
        PaginationConfig::FixedRange { pages: 1 },
        ":memory:",
    );
    config.sites.push(test_site(
        "second-blog",
        &second_server.uri(),
        PaginationConfig::FixedRange { pages: 1 },
    ));
    let repo = Arc::new(MemoryPostRepository::new());

    let total = crawl_all(&config, repo.clone(), CancellationToken::new()).await;

    assert_eq!(total.pages_processed, 2);
    assert_eq!(total.created, 3);
    assert_eq!(repo.len(), 3);
}
