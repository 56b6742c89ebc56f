//! Integration tests for the audit engine
//!
//! These tests use wiremock to create mock HTTP servers and run complete
//! audits end-to-end: CSS extraction, crawling, matching and aggregation.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use stylesweep::auth::{build_login_client, form_login, LoginForm};
use stylesweep::crawler::{FetchObserver, ResponseMeta};
use stylesweep::{
    audit, AuditRequest, AuditResult, CssSource, FetchError, PageSet, PageTarget, SessionState,
};
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// An HTML response
fn html_page(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body.to_string())
        .insert_header("content-type", "text/html; charset=utf-8")
}

/// Mounts an HTML page that must be fetched exactly `times` times
async fn mount_page(server: &MockServer, page: &str, body: &str, times: u64) {
    Mock::given(method("GET"))
        .and(path(page))
        .respond_with(html_page(body))
        .expect(times)
        .mount(server)
        .await;
}

fn crawl_request(seeds: Vec<String>, css: &str) -> AuditRequest {
    AuditRequest {
        pages: PageSet {
            crawl: seeds.into_iter().map(PageTarget::url).collect(),
            ..Default::default()
        },
        css: vec![CssSource::Inline(css.to_string())],
        ..Default::default()
    }
}

fn matches(result: &AuditResult, rule: &str) -> u64 {
    result.selectors[rule].matches_in_html
}

#[tokio::test]
async fn test_crawl_follows_same_host_links() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(
        &mock_server,
        "/markup1.html",
        r#"<html><body class="foo">
            <a href="/markup1.html">self</a>
            <a href="/markup2.html">next</a>
            <a href="http://127.0.0.1:1/elsewhere.html">other port</a>
            <a href="http://example.invalid/">other host</a>
        </body></html>"#,
        1,
    )
    .await;
    mount_page(
        &mock_server,
        "/markup2.html",
        r#"<html><body><p class="bar"></p><a href="markup1.html">back</a></body></html>"#,
        1,
    )
    .await;

    let result = audit(crawl_request(
        vec![format!("{}/markup1.html", base_url)],
        ".foo {} .bar {} .baz {}",
    ))
    .await
    .unwrap();

    assert_eq!(matches(&result, ".foo"), 1);
    assert_eq!(matches(&result, ".bar"), 1);
    assert_eq!(matches(&result, ".baz"), 0);
    assert_eq!(result.total, 3);
    assert_eq!(result.total_used, 2);
    assert_eq!(result.total_unused, 1);
    assert_eq!(result.pages.matched, 2);
    assert!(result.load_errors.is_empty());
}

#[tokio::test]
async fn test_crawl_relative_paths() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(
        &mock_server,
        "/path1/relative_paths.html",
        r#"<html><body>
            <a href="relative1.html">1</a>
            <a href="../relative2.html">2</a>
            <a href="/relative3.html">3</a>
            <a href="../path2/relative4.html">4</a>
        </body></html>"#,
        1,
    )
    .await;
    mount_page(&mock_server, "/path1/relative1.html", "<p class='r1'></p>", 1).await;
    mount_page(&mock_server, "/relative2.html", "<p class='r2'></p>", 1).await;
    mount_page(&mock_server, "/relative3.html", "<p class='r3'></p>", 1).await;
    mount_page(&mock_server, "/path2/relative4.html", "<p class='r4'></p>", 1).await;

    let result = audit(crawl_request(
        vec![format!("{}/path1/relative_paths.html", base_url)],
        ".r1 {} .r2 {} .r3 {} .r4 {}",
    ))
    .await
    .unwrap();

    for rule in [".r1", ".r2", ".r3", ".r4"] {
        assert_eq!(matches(&result, rule), 1, "rule {}", rule);
    }
    assert_eq!(result.pages.matched, 5);
}

#[tokio::test]
async fn test_include_pages_are_not_followed() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(
        &mock_server,
        "/markup1.html",
        r#"<body class="foo"><a href="/markup2.html">next</a></body>"#,
        1,
    )
    .await;
    mount_page(&mock_server, "/markup2.html", r#"<p class="bar"></p>"#, 0).await;

    let request = AuditRequest {
        pages: PageSet {
            include: vec![PageTarget::url(format!("{}/markup1.html", base_url))],
            ..Default::default()
        },
        css: vec![CssSource::Inline(".foo {} .bar {}".to_string())],
        ..Default::default()
    };
    let result = audit(request).await.unwrap();

    assert_eq!(matches(&result, ".foo"), 1);
    assert_eq!(matches(&result, ".bar"), 0);
}

#[tokio::test]
async fn test_excluded_pages_are_never_fetched() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(
        &mock_server,
        "/index.html",
        r#"<body>
            <a href="/sub/a.html">sub</a>
            <a href="/sub/deeper/b.html">deeper</a>
            <a href="/private.html?tab=1">private</a>
            <a href="/public.html">public</a>
            <a href="/report.pdf">pdf</a>
        </body>"#,
        1,
    )
    .await;
    mount_page(&mock_server, "/sub/a.html", "<p class='sub'></p>", 0).await;
    mount_page(&mock_server, "/sub/deeper/b.html", "<p class='sub'></p>", 0).await;
    mount_page(&mock_server, "/private.html", "<p class='private'></p>", 0).await;
    mount_page(&mock_server, "/report.pdf", "", 0).await;
    mount_page(&mock_server, "/public.html", "<p class='public'></p>", 1).await;

    let mut request = crawl_request(
        vec![format!("{}/index.html", base_url)],
        ".sub {} .private {} .public {}",
    );
    request.pages.exclude = vec![
        format!("{}/sub/*", base_url),
        format!("{}/private.html", base_url),
        r"regex:\.pdf$".to_string(),
    ];

    let result = audit(request).await.unwrap();
    assert_eq!(matches(&result, ".public"), 1);
    assert_eq!(matches(&result, ".sub"), 0);
    assert_eq!(matches(&result, ".private"), 0);
}

#[tokio::test]
async fn test_excluded_seed_is_never_fetched() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(&mock_server, "/index.html", "<p class='foo'></p>", 0).await;

    let mut request = crawl_request(vec![format!("{}/index.html", base_url)], ".foo {}");
    request.pages.exclude = vec![format!("{}/index.html", base_url)];

    let result = audit(request).await.unwrap();
    assert_eq!(matches(&result, ".foo"), 0);
    assert_eq!(result.pages.matched, 0);
    assert_eq!(result.pages.skipped, 1);
}

#[tokio::test]
async fn test_cookie_visits_each_page_twice() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let page_url = format!("{}/markup1.html", base_url);

    // Logged-in variant first so it wins over the generic mock
    Mock::given(method("GET"))
        .and(path("/markup1.html"))
        .and(header("cookie", "sessionid=1234"))
        .and(header("referer", page_url.as_str()))
        .respond_with(html_page(
            r#"<html><body class="foo"><p class="logged-in"></p><a href="/markup2.html">2</a></body></html>"#,
        ))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/markup1.html"))
        .respond_with(html_page(
            r#"<html><body class="foo"><p class="logged-out"></p><a href="/markup2.html">2</a></body></html>"#,
        ))
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_page(&mock_server, "/markup2.html", "<p class='second'></p>", 2).await;

    let mut request = crawl_request(
        vec![page_url.clone()],
        ".logged-in {} .logged-out {} .foo {} .second {}",
    );
    request.cookie = Some("sessionid=1234".to_string());

    let result = audit(request).await.unwrap();
    assert_eq!(matches(&result, ".foo"), 2);
    assert_eq!(matches(&result, ".logged-in"), 1);
    assert_eq!(matches(&result, ".logged-out"), 1);
    assert_eq!(matches(&result, ".second"), 2);
    assert_eq!(result.pages.matched, 4);
}

#[tokio::test]
async fn test_configured_headers_are_sent_everywhere() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/site.css"))
        .and(header("accept-language", "en"))
        .and(header("x-audit", "stylesweep"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(".foo {} .member {}")
                .insert_header("content-type", "text/css"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/index.html"))
        .and(header("accept-language", "en"))
        .and(header("x-audit", "stylesweep"))
        .and(header("cookie", "sessionid=42"))
        .respond_with(html_page("<body class='foo'><p class='member'></p></body>"))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/index.html"))
        .and(header("accept-language", "en"))
        .and(header("x-audit", "stylesweep"))
        .respond_with(html_page("<body class='foo'></body>"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let request = AuditRequest {
        pages: PageSet {
            crawl: vec![PageTarget::url(format!("{}/index.html", base_url))],
            ..Default::default()
        },
        css: vec![CssSource::Url(format!("{}/site.css", base_url))],
        headers: vec![
            ("Accept-Language".to_string(), "en".to_string()),
            ("X-Audit".to_string(), "stylesweep".to_string()),
        ],
        cookie: Some("sessionid=42".to_string()),
        ..Default::default()
    };

    let result = audit(request).await.unwrap();
    assert!(result.load_errors.is_empty());
    assert_eq!(matches(&result, ".foo"), 2);
    assert_eq!(matches(&result, ".member"), 1);
    assert_eq!(result.pages.matched, 2);
}

#[tokio::test]
async fn test_observer_sees_every_fetch_and_load_errors_are_recorded() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(
        &mock_server,
        "/index.html",
        r#"<body class="foo"><a href="/missing.html">x</a><a href="/data.json">y</a></body>"#,
        1,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/missing.html"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/data.json"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("{}")
                .insert_header("content-type", "application/json"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorder = Arc::clone(&seen);
    let observer: Arc<dyn FetchObserver> = Arc::new(
        move |meta: &ResponseMeta, requested: &str, session: SessionState| {
            recorder
                .lock()
                .unwrap()
                .push((requested.to_string(), meta.status, session));
        },
    );

    let mut request = crawl_request(vec![format!("{}/index.html", base_url)], ".foo {}");
    request.observer = Some(observer);

    let result = audit(request).await.unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 3);
    assert!(seen
        .iter()
        .any(|(url, status, _)| url.ends_with("/missing.html") && *status == Some(404)));

    assert_eq!(result.load_errors.len(), 2);
    assert_eq!(result.pages.failed, 2);
    assert_eq!(matches(&result, ".foo"), 1);

    let missing = result
        .load_errors
        .iter()
        .find(|e| e.locator.ends_with("/missing.html"))
        .unwrap();
    assert!(matches!(missing.error, FetchError::Status { status: 404 }));
    assert_eq!(missing.session, SessionState::Anonymous);

    let json = result
        .load_errors
        .iter()
        .find(|e| e.locator.ends_with("/data.json"))
        .unwrap();
    assert!(matches!(json.error, FetchError::ContentMismatch { .. }));
}

#[tokio::test]
async fn test_timeout_is_a_load_error() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/slow.html"))
        .respond_with(html_page("<p class='slow'></p>").set_delay(Duration::from_millis(1000)))
        .mount(&mock_server)
        .await;
    mount_page(&mock_server, "/fast.html", "<p class='fast'></p>", 1).await;

    let mut request = crawl_request(
        vec![
            format!("{}/slow.html", base_url),
            format!("{}/fast.html", base_url),
        ],
        ".slow {} .fast {}",
    );
    request.timeout = Duration::from_millis(100);

    let result = audit(request).await.unwrap();
    assert_eq!(matches(&result, ".fast"), 1);
    assert_eq!(matches(&result, ".slow"), 0);
    assert_eq!(result.load_errors.len(), 1);
    assert!(matches!(
        result.load_errors[0].error,
        FetchError::Timeout { timeout_ms: 100 }
    ));
}

#[tokio::test]
async fn test_query_strings_crawl_versus_include() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    // Include entries keep their query string
    Mock::given(method("GET"))
        .and(path("/search/"))
        .and(query_param("q", "foo"))
        .respond_with(html_page("<p class='included'></p>"))
        .expect(1)
        .mount(&mock_server)
        .await;
    // Crawl seeds are stripped to /search/ and collapse into one visit
    mount_page(&mock_server, "/search/", "<p class='crawled'></p>", 1).await;

    let request = AuditRequest {
        pages: PageSet {
            crawl: vec![
                PageTarget::url(format!("{}/search/?q=bar", base_url)),
                PageTarget::url(format!("{}/search/?q=baz", base_url)),
            ],
            include: vec![PageTarget::url(format!("{}/search/?q=foo", base_url))],
            exclude: vec![],
        },
        css: vec![CssSource::Inline(".included {} .crawled {}".to_string())],
        ..Default::default()
    };

    let result = audit(request).await.unwrap();
    assert_eq!(matches(&result, ".included"), 1);
    assert_eq!(matches(&result, ".crawled"), 1);
}

#[tokio::test]
async fn test_whitelist_and_ignored_rules() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(&mock_server, "/", "<body class='foo bar'></body>", 1).await;

    let mut request = crawl_request(
        vec![format!("{}/", base_url)],
        ".foo {} .bar {} .unused {} @font-face { font-family: x }",
    );
    request.whitelist = vec![".bar".to_string()];

    let result = audit(request).await.unwrap();
    assert_eq!(result.total, 4);
    assert_eq!(result.total_used, 1);
    assert_eq!(result.total_unused, 1);
    assert_eq!(result.total_whitelisted, 1);
    assert_eq!(result.total_ignored, 1);
    assert_eq!(matches(&result, ".bar"), 0);
}

#[tokio::test]
async fn test_duplicates_across_sources() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/rules1.css"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(".foo {} .bar {} .foo {}")
                .insert_header("content-type", "text/css"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/missing.css"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;
    mount_page(&mock_server, "/", "<body class='foo'></body>", 1).await;

    let request = AuditRequest {
        pages: PageSet {
            crawl: vec![PageTarget::url(format!("{}/", base_url))],
            ..Default::default()
        },
        css: vec![
            CssSource::sniff(&format!("{}/rules1.css", base_url)),
            CssSource::sniff(&format!("{}/missing.css", base_url)),
            CssSource::sniff(".foo {}"),
        ],
        ..Default::default()
    };

    let result = audit(request).await.unwrap();
    let foo = &result.selectors[".foo"];
    assert_eq!(foo.occurrences_in_css, 3);
    assert_eq!(foo.matches_in_html, 1);
    assert_eq!(result.selectors[".bar"].occurrences_in_css, 1);
    assert_eq!(result.total_duplicates, 1);
}

#[tokio::test]
async fn test_bounded_concurrency_still_drains() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    let links: String = (0..12)
        .map(|i| format!("<a href='/page{}.html'>{}</a>", i, i))
        .collect();
    mount_page(&mock_server, "/", &format!("<body>{}</body>", links), 1).await;
    for i in 0..12 {
        mount_page(
            &mock_server,
            &format!("/page{}.html", i),
            "<p class='item'></p><a href='/'>home</a>",
            1,
        )
        .await;
    }

    let mut request = crawl_request(vec![format!("{}/", base_url)], ".item {}");
    request.max_concurrent_fetches = 2;

    let result = audit(request).await.unwrap();
    assert_eq!(matches(&result, ".item"), 12);
    assert_eq!(result.pages.matched, 13);
}

#[tokio::test]
async fn test_file_and_inline_pages() {
    let dir = TempDir::new().unwrap();
    let page = dir.path().join("page.html");
    std::fs::write(
        &page,
        "<html><body class='from-file'><a href='other.html'>x</a></body></html>",
    )
    .unwrap();
    let css = dir.path().join("style.css");
    std::fs::write(&css, ".from-file {} .inline {} .nowhere:hover {}").unwrap();

    let request = AuditRequest {
        pages: PageSet {
            crawl: vec![PageTarget::sniff(&page.to_string_lossy())],
            include: vec![
                PageTarget::sniff("<html><body><p class='inline'></p></body></html>"),
                PageTarget::file(dir.path().join("absent.html").to_string_lossy()),
            ],
            exclude: vec![],
        },
        css: vec![CssSource::sniff(&css.to_string_lossy())],
        ..Default::default()
    };

    let result = audit(request).await.unwrap();
    assert_eq!(matches(&result, ".from-file"), 1);
    assert_eq!(matches(&result, ".inline"), 1);
    assert_eq!(matches(&result, ".nowhere:hover"), 0);
    // A missing file is an empty page, not a load error
    assert!(result.load_errors.is_empty());
    assert_eq!(result.pages.matched, 3);
}

#[tokio::test]
async fn test_empty_inputs_return_empty_result() {
    let mock_server = MockServer::start().await;

    let no_css = crawl_request(vec![format!("{}/", mock_server.uri())], ".foo {}");
    let no_css = AuditRequest {
        css: vec![],
        ..no_css
    };
    let result = audit(no_css).await.unwrap();
    assert_eq!(result.total, 0);

    let no_pages = AuditRequest {
        css: vec![CssSource::Inline(".foo {}".to_string())],
        ..Default::default()
    };
    let result = audit(no_pages).await.unwrap();
    assert_eq!(result.total, 0);
    assert!(result.selectors.is_empty());

    let requests = mock_server.received_requests().await.unwrap();
    assert!(requests.is_empty());
}

#[tokio::test]
async fn test_invalid_exclude_pattern_is_an_error() {
    let mut request = crawl_request(vec!["http://127.0.0.1:1/".to_string()], ".foo {}");
    request.pages.exclude = vec!["regex:([".to_string()];
    assert!(audit(request).await.is_err());
}

#[tokio::test]
async fn test_form_login() {
    let mock_server = MockServer::start().await;
    let login_url = format!("{}/accounts/login/", mock_server.uri());

    Mock::given(method("GET"))
        .and(path("/accounts/login/"))
        .respond_with(
            html_page(
                r#"<form method="post">
                    <input type="hidden" name="csrfmiddlewaretoken" value="tok123">
                    <input name="username"><input name="password" type="password">
                </form>"#,
            )
            .insert_header("set-cookie", "csrftoken=csrf456; Path=/"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/accounts/login/"))
        .and(header("x-csrftoken", "tok123"))
        .and(header("cookie", "csrftoken=csrf456"))
        .and(body_string_contains("username=foo"))
        .and(body_string_contains("csrfmiddlewaretoken=tok123"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("location", "/")
                .insert_header("set-cookie", "sessionid=abc789; HttpOnly; Path=/"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = build_login_client("TestSweep/1.0").unwrap();
    let cookie = form_login(
        &client,
        &LoginForm {
            login_url,
            username: "foo".to_string(),
            password: "bar".to_string(),
        },
    )
    .await
    .unwrap();

    assert_eq!(cookie, "sessionid=abc789;csrftoken=csrf456");
}

#[tokio::test]
async fn test_form_login_without_token_fails() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/login/"))
        .respond_with(html_page("<form></form>"))
        .mount(&mock_server)
        .await;

    let client = build_login_client("TestSweep/1.0").unwrap();
    let result = form_login(
        &client,
        &LoginForm {
            login_url: format!("{}/login/", mock_server.uri()),
            username: "foo".to_string(),
            password: "bar".to_string(),
        },
    )
    .await;

    assert!(result.is_err());
}

#[tokio::test]
async fn test_observer_counts_dual_sessions() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(&mock_server, "/", "<body class='foo'></body>", 2).await;

    let count = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&count);
    let observer: Arc<dyn FetchObserver> = Arc::new(
        move |_meta: &ResponseMeta, _requested: &str, _session: SessionState| {
            counter.fetch_add(1, Ordering::SeqCst);
        },
    );

    let mut request = crawl_request(vec![format!("{}/", base_url)], ".foo {}");
    request.cookie = Some("sessionid=1".to_string());
    request.observer = Some(observer);

    let result = audit(request).await.unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 2);
    assert_eq!(matches(&result, ".foo"), 2);
}
