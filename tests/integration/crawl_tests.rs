//! Integration tests for the crawler
//!
//! These tests use wiremock to serve a small gallery site and check the
//! downloaded folder tree and run statistics end-to-end.

use gallery_harvest::config::Config;
use gallery_harvest::crawler::{part_path, Coordinator};
use gallery_harvest::input::{load_seed_links, SeedLink};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::{NamedTempFile, TempDir};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Creates a test configuration writing below `root`, with short delays
fn create_test_config(root: &Path) -> Config {
    let mut config = Config::default();
    config.http.backoff_base_ms = 5;
    config.http.backoff_max_ms = 20;
    config.download.retry_delay_ms = 10;
    config.download.timeout_secs = 5;
    config.output.root = root.display().to_string();
    config
}

fn category_html(title: Option<&str>, total_pages: Option<u32>, albums: &[(&str, &str)]) -> String {
    let crumbs = title
        .map(|t| {
            format!(
                r#"<div class="yupoo-crumbs categories__box-right-header">
                   <a class="yupoo-crumbs-span" href="/">Home</a>
                   <a class="yupoo-crumbs-span" href="/categories/1" title="{}">{}</a>
                   </div>"#,
                t, t
            )
        })
        .unwrap_or_default();

    let cards: String = albums
        .iter()
        .map(|(href, title)| format!(r#"<a class="album__main" href="{}" title="{}">x</a>"#, href, title))
        .collect();

    format!(
        "<html><body>{}<div>{}</div>{}</body></html>",
        crumbs,
        cards,
        pagination_html(total_pages)
    )
}

fn album_html(total_pages: Option<u32>, images: &[(&str, &str)]) -> String {
    let cards: String = images
        .iter()
        .map(|(src, title)| {
            format!(
                r#"<div class="showalbum__children image__main">
                   <img data-origin-src="{}" src="thumb.jpg"/><h3 title="{}">{}</h3></div>"#,
                src, title, title
            )
        })
        .collect();

    format!(
        "<html><body>{}{}</body></html>",
        cards,
        pagination_html(total_pages)
    )
}

fn pagination_html(total_pages: Option<u32>) -> String {
    total_pages
        .map(|n| {
            format!(
                r#"<form class="pagination__jumpwrap"><span>第</span><input value="1"/><span>共{}页</span></form>"#,
                n
            )
        })
        .unwrap_or_default()
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body)
        .insert_header("content-type", "text/html; charset=utf-8")
}

fn image(bytes: &[u8]) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_bytes(bytes.to_vec())
        .insert_header("content-type", "image/jpeg")
}

fn create_seed_table(urls: &[String]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "Name,URL").unwrap();
    for (i, url) in urls.iter().enumerate() {
        writeln!(file, "category {},{}", i, url).unwrap();
    }
    file.flush().unwrap();
    file
}

fn list_files(root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in std::fs::read_dir(&dir).unwrap() {
            let entry = entry.unwrap();
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else {
                files.push(path.strip_prefix(root).unwrap().to_path_buf());
            }
        }
    }
    files.sort();
    files
}

#[tokio::test]
async fn test_full_crawl_with_duplicate_titles() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let referer = format!("{}/", base_url);

    // Category page 2 (more specific mock first)
    Mock::given(method("GET"))
        .and(path("/categories/1"))
        .and(query_param("page", "2"))
        .respond_with(html(category_html(Some("Jackets"), Some(2), &[])))
        .expect(1)
        .mount(&mock_server)
        .await;

    // Category page 1 is fetched exactly once
    Mock::given(method("GET"))
        .and(path("/categories/1"))
        .respond_with(html(category_html(
            Some("Jackets"),
            Some(2),
            &[("/albums/10?uid=1", "Spring/Summer")],
        )))
        .expect(1)
        .mount(&mock_server)
        .await;

    // Album with a single page and two cards sharing a title
    let first_src = format!("{}/img/first.jpg", base_url);
    let second_src = format!("{}/img/second.jpg", base_url);
    Mock::given(method("GET"))
        .and(path("/albums/10"))
        .and(query_param("uid", "1"))
        .respond_with(html(album_html(
            None,
            &[(first_src.as_str(), "A"), (second_src.as_str(), "A")],
        )))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/img/first.jpg"))
        .and(header("referer", referer.as_str()))
        .respond_with(image(b"first"))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/img/second.jpg"))
        .and(header("referer", referer.as_str()))
        .respond_with(image(b"second"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let out = TempDir::new().unwrap();
    let table = create_seed_table(&[format!("{}/categories/1", base_url)]);
    let seeds = load_seed_links(table.path()).expect("Failed to load seeds");

    let mut coordinator =
        Coordinator::new(create_test_config(out.path())).expect("Failed to create coordinator");
    let stats = coordinator.run(&seeds).await;

    let album = out.path().join("Jackets").join("Spring_Summer");
    assert_eq!(std::fs::read(album.join("1_A.jpg")).unwrap(), b"first");
    assert_eq!(std::fs::read(album.join("1_A_2.jpg")).unwrap(), b"second");
    assert_eq!(
        list_files(out.path()),
        vec![
            PathBuf::from("Jackets/Spring_Summer/1_A.jpg"),
            PathBuf::from("Jackets/Spring_Summer/1_A_2.jpg"),
        ]
    );

    assert_eq!(stats.seeds_processed, 1);
    assert_eq!(stats.category_pages_processed, 2);
    assert_eq!(stats.category_pages_empty, 1);
    assert_eq!(stats.albums_processed, 1);
    assert_eq!(stats.album_pages_processed, 1);
    assert_eq!(stats.images_downloaded, 2);
    assert!(!stats.has_failures());
}

#[tokio::test]
async fn test_failures_are_isolated() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    // Category: 3 pages; page 2 is gone, page 3 lists nothing
    Mock::given(method("GET"))
        .and(path("/categories/7"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/categories/7"))
        .and(query_param("page", "3"))
        .respond_with(html(category_html(Some("Bags"), Some(3), &[])))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/categories/7"))
        .respond_with(html(category_html(
            Some("Bags"),
            Some(3),
            &[
                ("/albums/missing?uid=1", "Broken album"),
                ("/albums/good?uid=1", "Good one"),
            ],
        )))
        .expect(1)
        .mount(&mock_server)
        .await;

    // First album cannot be fetched at all
    Mock::given(method("GET"))
        .and(path("/albums/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    // Second album: page 1 image always fails, page 2 image works
    let ok_src = format!("{}/img/ok.jpg", base_url);
    let broken_src = format!("{}/img/broken.jpg", base_url);
    Mock::given(method("GET"))
        .and(path("/albums/good"))
        .and(query_param("page", "2"))
        .respond_with(html(album_html(
            Some(2),
            &[(ok_src.as_str(), "ok")],
        )))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/albums/good"))
        .respond_with(html(album_html(
            Some(2),
            &[(broken_src.as_str(), "broken")],
        )))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/img/broken.jpg"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/img/ok.jpg"))
        .respond_with(image(b"ok"))
        .expect(1)
        .mount(&mock_server)
        .await;

    // A second seed whose first page is unreachable
    Mock::given(method("GET"))
        .and(path("/categories/404"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let out = TempDir::new().unwrap();
    let seeds = vec![
        SeedLink::new(&format!("{}/categories/7", base_url)),
        SeedLink::new(&format!("{}/categories/404", base_url)),
    ];

    let mut coordinator =
        Coordinator::new(create_test_config(out.path())).expect("Failed to create coordinator");
    let stats = coordinator.run(&seeds).await;

    let good = out.path().join("Bags").join("Good one");
    assert_eq!(std::fs::read(good.join("2_ok.jpg")).unwrap(), b"ok");
    assert!(!good.join("1_broken.jpg").exists());
    assert!(!part_path(&good.join("1_broken.jpg")).exists());

    assert_eq!(stats.seeds_processed, 1);
    assert_eq!(stats.seeds_failed, 1);
    assert_eq!(stats.category_pages_processed, 2);
    assert_eq!(stats.category_pages_failed, 1);
    assert_eq!(stats.category_pages_empty, 1);
    assert_eq!(stats.albums_processed, 1);
    assert_eq!(stats.albums_failed, 1);
    assert_eq!(stats.album_pages_processed, 2);
    assert_eq!(stats.images_downloaded, 1);
    assert_eq!(stats.images_skipped, 1);
    assert_eq!(stats.failures(), 4);
}

#[tokio::test]
async fn test_missing_title_and_pagination_use_defaults() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/categories/3"))
        .respond_with(html(category_html(None, None, &[("/albums/5?uid=1", "")])))
        .expect(1)
        .mount(&mock_server)
        .await;
    let src = format!("{}/img/x.jpg", base_url);
    Mock::given(method("GET"))
        .and(path("/albums/5"))
        .respond_with(html(album_html(None, &[(src.as_str(), "Look: 1")])))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/img/x.jpg"))
        .respond_with(image(b"x"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let out = TempDir::new().unwrap();
    let mut coordinator =
        Coordinator::new(create_test_config(out.path())).expect("Failed to create coordinator");
    let stats = coordinator
        .run(&[SeedLink::new(&format!("{}/categories/3", base_url))])
        .await;

    assert_eq!(
        list_files(out.path()),
        vec![PathBuf::from("Unknown_Category/Untitled/1_Look_ 1.jpg")]
    );
    assert_eq!(stats.category_pages_processed, 1);
    assert_eq!(stats.images_downloaded, 1);
}

#[tokio::test]
async fn test_rerun_with_skip_existing() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/categories/9"))
        .respond_with(html(category_html(
            Some("Hats"),
            None,
            &[("/albums/1?uid=1", "Summer")],
        )))
        .mount(&mock_server)
        .await;
    let src = format!("{}/img/h.jpg", base_url);
    Mock::given(method("GET"))
        .and(path("/albums/1"))
        .respond_with(html(album_html(None, &[(src.as_str(), "h")])))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/img/h.jpg"))
        .respond_with(image(b"hat"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let out = TempDir::new().unwrap();
    let mut config = create_test_config(out.path());
    config.download.skip_existing = true;
    let seeds = vec![SeedLink::new(&format!("{}/categories/9", base_url))];

    let first = Coordinator::new(config.clone())
        .expect("Failed to create coordinator")
        .run(&seeds)
        .await;
    let second = Coordinator::new(config)
        .expect("Failed to create coordinator")
        .run(&seeds)
        .await;

    assert_eq!(first.images_downloaded, 1);
    assert_eq!(second.images_downloaded, 0);
    assert_eq!(second.images_already_present, 1);
    assert_eq!(
        std::fs::read(out.path().join("Hats").join("Summer").join("1_h.jpg")).unwrap(),
        b"hat"
    );
}

#[tokio::test]
async fn test_untitled_albums_do_not_overwrite_each_other() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/categories/2"))
        .respond_with(html(category_html(
            Some("Cat"),
            None,
            &[("/albums/1?uid=1", ""), ("/albums/2?uid=1", "")],
        )))
        .expect(1)
        .mount(&mock_server)
        .await;

    for (album, bytes) in [("1", "one"), ("2", "two")] {
        let src = format!("{}/img/{}.jpg", base_url, album);
        Mock::given(method("GET"))
            .and(path(format!("/albums/{}", album)))
            .respond_with(html(album_html(None, &[(src.as_str(), "IMG")])))
            .expect(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/img/{}.jpg", album)))
            .respond_with(image(bytes.as_bytes()))
            .expect(1)
            .mount(&mock_server)
            .await;
    }

    let out = TempDir::new().unwrap();
    let mut coordinator =
        Coordinator::new(create_test_config(out.path())).expect("Failed to create coordinator");
    let stats = coordinator
        .run(&[SeedLink::new(&format!("{}/categories/2", base_url))])
        .await;

    assert_eq!(
        list_files(out.path()),
        vec![
            PathBuf::from("Cat/Untitled/1_IMG.jpg"),
            PathBuf::from("Cat/Untitled_2/1_IMG.jpg"),
        ]
    );
    let category = out.path().join("Cat");
    assert_eq!(std::fs::read(category.join("Untitled").join("1_IMG.jpg")).unwrap(), b"one");
    assert_eq!(std::fs::read(category.join("Untitled_2").join("1_IMG.jpg")).unwrap(), b"two");
    assert_eq!(stats.images_downloaded, 2);
}

#[tokio::test]
async fn test_untitled_categories_get_separate_folders() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    for category in ["4", "5"] {
        let src = format!("{}/img/{}.jpg", base_url, category);
        Mock::given(method("GET"))
            .and(path(format!("/categories/{}", category)))
            .respond_with(html(category_html(
                None,
                None,
                &[(format!("/albums/{}?uid=1", category).as_str(), "Look")],
            )))
            .expect(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/albums/{}", category)))
            .respond_with(html(album_html(None, &[(src.as_str(), "a")])))
            .expect(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/img/{}.jpg", category)))
            .respond_with(image(category.as_bytes()))
            .expect(1)
            .mount(&mock_server)
            .await;
    }

    let out = TempDir::new().unwrap();
    let mut coordinator =
        Coordinator::new(create_test_config(out.path())).expect("Failed to create coordinator");
    let stats = coordinator
        .run(&[
            SeedLink::new(&format!("{}/categories/4", base_url)),
            SeedLink::new(&format!("{}/categories/5", base_url)),
        ])
        .await;

    assert_eq!(
        list_files(out.path()),
        vec![
            PathBuf::from("Unknown_Category/Look/1_a.jpg"),
            PathBuf::from("Unknown_Category_2/Look/1_a.jpg"),
        ]
    );
    assert_eq!(stats.images_downloaded, 2);
}

/// Serves an album page and records whether the given files were complete
/// on disk at the moment it was requested
struct RecordsFinishedFiles {
    files: Vec<PathBuf>,
    finished: Arc<Mutex<Option<bool>>>,
    body: String,
}

impl Respond for RecordsFinishedFiles {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let all_there = self.files.iter().all(|file| file.is_file());
        *self.finished.lock().unwrap() = Some(all_there);
        html(self.body.clone())
    }
}

#[tokio::test]
async fn test_next_album_page_waits_for_previous_batch() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let out = TempDir::new().unwrap();
    let album_dir = out.path().join("Coats").join("Winter");

    Mock::given(method("GET"))
        .and(path("/categories/8"))
        .respond_with(html(category_html(
            Some("Coats"),
            None,
            &[("/albums/8?uid=1", "Winter")],
        )))
        .mount(&mock_server)
        .await;

    let slow_a = format!("{}/img/slow-a.jpg", base_url);
    let slow_b = format!("{}/img/slow-b.jpg", base_url);
    let fast = format!("{}/img/fast.jpg", base_url);

    let finished = Arc::new(Mutex::new(None));
    Mock::given(method("GET"))
        .and(path("/albums/8"))
        .and(query_param("page", "2"))
        .respond_with(RecordsFinishedFiles {
            files: vec![album_dir.join("1_a.jpg"), album_dir.join("1_b.jpg")],
            finished: Arc::clone(&finished),
            body: album_html(Some(2), &[(fast.as_str(), "c")]),
        })
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/albums/8"))
        .respond_with(html(album_html(
            Some(2),
            &[(slow_a.as_str(), "a"), (slow_b.as_str(), "b")],
        )))
        .expect(1)
        .mount(&mock_server)
        .await;

    for (route, bytes) in [("/img/slow-a.jpg", b"a"), ("/img/slow-b.jpg", b"b")] {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(image(bytes).set_delay(Duration::from_millis(300)))
            .expect(1)
            .mount(&mock_server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/img/fast.jpg"))
        .respond_with(image(b"c"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut coordinator =
        Coordinator::new(create_test_config(out.path())).expect("Failed to create coordinator");
    let stats = coordinator
        .run(&[SeedLink::new(&format!("{}/categories/8", base_url))])
        .await;

    assert_eq!(*finished.lock().unwrap(), Some(true));
    assert_eq!(stats.album_pages_processed, 2);
    assert_eq!(stats.images_downloaded, 3);
    assert!(album_dir.join("2_c.jpg").is_file());
}

#[tokio::test]
async fn test_redirected_category_resolves_links_on_final_host() {
    let old_host = MockServer::start().await;
    let new_host = MockServer::start().await;
    let new_base = new_host.uri();
    let referer = format!("{}/", new_base);

    Mock::given(method("GET"))
        .and(path("/categories/6"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("Location", format!("{}/categories/6", new_base).as_str()),
        )
        .expect(1)
        .mount(&old_host)
        .await;

    Mock::given(method("GET"))
        .and(path("/categories/6"))
        .respond_with(html(category_html(
            Some("Scarves"),
            None,
            &[("/albums/6?uid=1", "Wool")],
        )))
        .expect(1)
        .mount(&new_host)
        .await;
    let src = format!("{}/img/w.jpg", new_base);
    Mock::given(method("GET"))
        .and(path("/albums/6"))
        .respond_with(html(album_html(None, &[(src.as_str(), "w")])))
        .expect(1)
        .mount(&new_host)
        .await;
    Mock::given(method("GET"))
        .and(path("/img/w.jpg"))
        .and(header("referer", referer.as_str()))
        .respond_with(image(b"wool"))
        .expect(1)
        .mount(&new_host)
        .await;

    let out = TempDir::new().unwrap();
    let mut coordinator =
        Coordinator::new(create_test_config(out.path())).expect("Failed to create coordinator");
    let stats = coordinator
        .run(&[SeedLink::new(&format!("{}/categories/6", old_host.uri()))])
        .await;

    assert_eq!(
        std::fs::read(out.path().join("Scarves").join("Wool").join("1_w.jpg")).unwrap(),
        b"wool"
    );
    assert_eq!(stats.albums_processed, 1);
    assert!(!stats.has_failures());
}

#[test]
fn test_missing_input_table_is_fatal() {
    let result = load_seed_links(Path::new("/nonexistent/input.csv"));
    assert!(result.is_err());
}
