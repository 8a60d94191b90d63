//! Integration tests for the crawler
//!
//! These tests use wiremock to serve a small site and run the full crawl
//! cycle end-to-end, including resuming from the checkpoint it leaves.

use post_harvest::config::{
    Config, CrawlerConfig, ExtractConfig, FetcherConfig, OutputConfig, StoreBackend,
};
use post_harvest::crawler::Coordinator;
use post_harvest::frontier::load_checkpoint;
use post_harvest::storage::open_store;
use post_harvest::CrawlError;
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn create_test_config(base_url: &str, dir: &TempDir, backend: StoreBackend) -> Config {
    Config {
        crawler: CrawlerConfig {
            domain: base_url.to_string(),
            seeds: vec![format!("{}/posts/", base_url)],
            target_pattern: r"/posts/\d+/".to_string(),
            all_pattern: "/posts/.*".to_string(),
            exclude_pattern: Some(".*/hidden/.*".to_string()),
            excluded_params: vec!["utm_source".to_string()],
            checkpoint_interval_secs: 60,
        },
        fetcher: FetcherConfig::default(),
        extract: ExtractConfig::default(),
        output: OutputConfig {
            checkpoint_path: dir.path().join("state.txt").display().to_string(),
            content_dir: dir.path().join("content").display().to_string(),
            backend,
        },
    }
}

fn post_page(id: &str, label: &str, paragraphs: &[&str], links: &[&str]) -> String {
    let paragraphs: String = paragraphs.iter().map(|p| format!("<p>{}</p>", p)).collect();
    let links: String = links
        .iter()
        .map(|href| format!(r#"<a href="{}">link</a>"#, href))
        .collect();
    format!(
        r#"<html><body>
        <shreddit-post id="{id}">
            <span slot="post-flair">{label}</span>
            <div class="text-neutral-content">{paragraphs}</div>
        </shreddit-post>
        {links}
        </body></html>"#
    )
}

fn listing_page(links: &[&str]) -> String {
    let links: String = links
        .iter()
        .map(|href| format!(r#"<a href="{}">link</a>"#, href))
        .collect();
    format!("<html><body>{}</body></html>", links)
}

async fn mount_page(server: &MockServer, route: &str, template: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(template)
        .expect(1)
        .mount(server)
        .await;
}

/// A listing with two pages of posts: two stored posts, one missing post,
/// one excluded link and one off-site link
async fn mount_site(server: &MockServer) {
    mount_page(
        server,
        "/posts/",
        ResponseTemplate::new(200).set_body_string(listing_page(&[
            "/posts/1/",
            "/posts/2/?utm_source=feed",
            "/posts/page-2",
            "/posts/hidden/secret",
            "https://elsewhere.example/posts/9/",
            "/about",
        ])),
    )
    .await;

    mount_page(
        server,
        "/posts/page-2",
        ResponseTemplate::new(200).set_body_string(listing_page(&["/posts/3/", "/posts/1/#top"])),
    )
    .await;

    mount_page(
        server,
        "/posts/1/",
        ResponseTemplate::new(200).set_body_string(post_page(
            "t3_one",
            "Not the A-hole",
            &["Hello, World.", "(Second) line"],
            &["/posts/", "/posts/2/"],
        )),
    )
    .await;

    mount_page(
        server,
        "/posts/2/",
        ResponseTemplate::new(200).set_body_string(post_page(
            "t3_two",
            "Asshole",
            &["Another post"],
            &["/posts/1/"],
        )),
    )
    .await;

    mount_page(server, "/posts/3/", ResponseTemplate::new(404)).await;
}

async fn crawl_small_site(backend: StoreBackend) {
    let server = MockServer::start().await;
    mount_site(&server).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), &dir, backend);

    let mut coordinator = Coordinator::new(config.clone(), false).unwrap();
    let summary = coordinator.run().await.unwrap();

    assert_eq!(summary.pages_fetched, 5);
    assert_eq!(summary.records_stored, 2);
    assert_eq!(summary.urls_seen, 5);
    assert_eq!(summary.urls_crawled, 5);
    assert_eq!(summary.passes, 4);

    let store = coordinator.store();
    let keys: Vec<String> = store.keys().unwrap().into_iter().collect();
    assert_eq!(keys, vec!["t3_one".to_string(), "t3_two".to_string()]);

    let one = store.get("t3_one").unwrap();
    assert_eq!(one.label, "Not the A-hole");
    assert_eq!(one.text, "hello world second line");
    assert!(store
        .get_raw("t3_one")
        .unwrap()
        .unwrap()
        .contains(r#"<shreddit-post id="t3_one">"#));
    assert_eq!(store.get("t3_two").unwrap().text, "another post");

    let frontier = load_checkpoint(Path::new(&config.output.checkpoint_path)).unwrap();
    assert_eq!(frontier.len_all(), 5);
    assert_eq!(frontier.len_matching(), 3);
    assert_eq!(frontier.len_crawled(), 5);
    assert_eq!(frontier.pending_targets(), 0);
    assert!(frontier.validate(&format!("{}/posts/hidden/secret", server.uri())).is_none());
}

#[tokio::test]
async fn test_full_crawl_with_file_store() {
    crawl_small_site(StoreBackend::Files).await;
}

#[tokio::test]
async fn test_full_crawl_with_sqlite_store() {
    crawl_small_site(StoreBackend::Sqlite).await;
}

#[tokio::test]
async fn test_resume_does_not_refetch() {
    let server = MockServer::start().await;
    mount_site(&server).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), &dir, StoreBackend::Files);

    Coordinator::new(config.clone(), false)
        .unwrap()
        .run()
        .await
        .unwrap();

    // Every mock expects exactly one request, so a refetch fails the test
    // when the server is dropped.
    let mut resumed = Coordinator::new(config.clone(), false).unwrap();
    assert_eq!(resumed.frontier().len_crawled(), 5);

    let summary = resumed.run().await.unwrap();
    assert_eq!(summary.passes, 1);
    assert_eq!(summary.pages_fetched, 0);
    assert_eq!(summary.records_stored, 0);
    assert_eq!(resumed.store().keys().unwrap().len(), 2);

    assert!(Path::new(&format!("{}.bak", config.output.checkpoint_path)).exists());
}

#[tokio::test]
async fn test_fatal_status_leaves_resumable_checkpoint() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        "/posts/",
        ResponseTemplate::new(200).set_body_string(listing_page(&["/posts/page-2"])),
    )
    .await;
    mount_page(&server, "/posts/page-2", ResponseTemplate::new(204)).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), &dir, StoreBackend::Files);

    let result = Coordinator::new(config.clone(), false)
        .unwrap()
        .run()
        .await;
    assert!(matches!(
        result,
        Err(CrawlError::UnexpectedStatus { status: 204, .. })
    ));

    let frontier = load_checkpoint(Path::new(&config.output.checkpoint_path)).unwrap();
    assert_eq!(frontier.len_all(), 2);
    assert_eq!(frontier.len_crawled(), 1);
    assert!(frontier.already_crawled(&format!("{}/posts/", server.uri())));
    assert!(!frontier.already_crawled(&format!("{}/posts/page-2", server.uri())));
}

#[tokio::test]
async fn test_target_without_identifier_is_not_stored() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        "/posts/",
        ResponseTemplate::new(200).set_body_string(listing_page(&["/posts/7/"])),
    )
    .await;
    mount_page(
        &server,
        "/posts/7/",
        ResponseTemplate::new(200).set_body_string(
            r#"<html><body><div class="text-neutral-content"><p>orphan</p></div></body></html>"#,
        ),
    )
    .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), &dir, StoreBackend::Files);

    let summary = Coordinator::new(config.clone(), false)
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(summary.pages_fetched, 2);
    assert_eq!(summary.records_stored, 0);
    assert_eq!(summary.urls_crawled, 2);

    let store = open_store(config.output.backend, Path::new(&config.output.content_dir)).unwrap();
    assert!(store.keys().unwrap().is_empty());
}
