//! Integration tests for the harvest pipeline
//!
//! These tests use wiremock to create mock HTTP servers and run complete
//! crawls end-to-end, checking the delimited output file.

use encoding_rs::WINDOWS_1251;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use text_harvest::config::{
    BodySelector, ColumnSpec, Config, ContentConfig, CrawlerConfig, DiscoveryRule, Field,
    HttpConfig, OutputConfig, PageRange, SeedEntry, SiteConfig, TitleSource,
};
use text_harvest::crawler::harvest;
use text_harvest::{Coordinator, PageOutcome};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration writing `Заголовок;Текст` rows to `output`
fn create_test_config(output: &Path, site: SiteConfig) -> Config {
    Config {
        crawler: CrawlerConfig {
            delay_ms: 10, // Very short for testing
            timeout_secs: 5,
            max_concurrent_fetches: 1,
            max_records: None,
        },
        http: HttpConfig::default(),
        output: OutputConfig {
            path: output.to_string_lossy().into_owned(),
            delimiter: ';',
            byte_order_mark: false,
            columns: vec![
                ColumnSpec::new(Field::Title, "Заголовок"),
                ColumnSpec::new(Field::Body, "Текст"),
            ],
        },
        site,
        submissions: None,
    }
}

fn seed_site(seed: String, depth: u8) -> SiteConfig {
    SiteConfig {
        seeds: vec![SeedEntry {
            url: seed,
            label: None,
        }],
        pages: None,
        depth,
        first_level: None,
        second_level: None,
        emit_links: false,
        content: ContentConfig::default(),
    }
}

fn authors_rule() -> DiscoveryRule {
    DiscoveryRule::HeaderAnchored {
        header: "Авторы".to_string(),
        cap: 5,
        containers: ["h2", "b", "strong", "div", "font"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
    }
}

fn works_rule() -> DiscoveryRule {
    DiscoveryRule::ListItems {
        item_tags: vec!["li".to_string()],
        first_anchor_only: true,
    }
}

fn html_page(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(format!("<html><body>{}</body></html>", body))
        .insert_header("content-type", "text/html; charset=utf-8")
}

async fn mount(server: &MockServer, route: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(response)
        .mount(server)
        .await;
}

/// Reads the output file into rows (header included)
fn read_rows(output: &Path, delimiter: u8) -> Vec<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .from_path(output)
        .expect("Failed to open output");

    reader
        .records()
        .map(|record| {
            record
                .expect("Malformed row")
                .iter()
                .map(|field| field.to_string())
                .collect()
        })
        .collect()
}

#[tokio::test]
async fn test_depth_two_header_anchored_crawl() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("out.csv");

    mount(
        &server,
        "/",
        html_page(
            r#"<h2>Авторы</h2>
            <ul>
                <li><a href="/a1">Первый</a></li>
                <li><a href="/a2">Второй</a></li>
            </ul>
            <h2>Ссылки</h2>
            <ul><li><a href="/elsewhere">Не сюда</a></li></ul>"#,
        ),
    )
    .await;
    mount(
        &server,
        "/a1",
        html_page("<h1>Глава первая</h1><pre>Глава 1. Тест. [1] Сноска ***</pre>"),
    )
    .await;
    mount(
        &server,
        "/a2",
        html_page("<h1>Глава вторая</h1><pre>Вторая\n\tстрока</pre>"),
    )
    .await;

    let mut site = seed_site(format!("{}/", server.uri()), 2);
    site.first_level = Some(authors_rule());
    let config = create_test_config(&output, site);

    let stats = Coordinator::new(config)
        .expect("Failed to create coordinator")
        .run()
        .await
        .expect("Run failed");

    assert_eq!(stats.records_written(), 2);
    assert_eq!(stats.links_discovered, 2);

    let mut rows = read_rows(&output, b';');
    assert_eq!(rows.remove(0), vec!["Заголовок", "Текст"]);
    rows.sort();
    assert_eq!(
        rows,
        vec![
            vec!["Глава вторая".to_string(), "Вторая  строка".to_string()],
            vec!["Глава первая".to_string(), "Глава 1. Тест.  Сноска".to_string()],
        ]
    );
}

#[tokio::test]
async fn test_depth_three_crawl_with_labels() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("catalog.csv");

    mount(
        &server,
        "/",
        html_page(
            r#"<b>Авторы</b>
            <ul>
                <li><a href="belaew/">Беляев Александр</a></li>
                <li><a href="efremov/">Ефремов Иван</a></li>
            </ul>
            <h3>Журналы</h3>"#,
        ),
    )
    .await;
    mount(
        &server,
        "/belaew/",
        html_page(
            r#"<ul>
                <li><a href="amphibia.txt">Человек-амфибия</a> (роман)</li>
                <li><a href="dowel.txt">Голова профессора Доуэля</a></li>
            </ul>"#,
        ),
    )
    .await;
    mount(
        &server,
        "/efremov/",
        html_page(
            r#"<ul>
                <li><a href="andromeda.txt">Туманность Андромеды</a></li>
                <li><a href="/belaew/amphibia.txt">Беляев (ссылка)</a></li>
            </ul>"#,
        ),
    )
    .await;
    for (route, title) in [
        ("/belaew/amphibia.txt", "Человек-амфибия"),
        ("/belaew/dowel.txt", "Голова профессора Доуэля"),
        ("/efremov/andromeda.txt", "Туманность Андромеды"),
    ] {
        mount(
            &server,
            route,
            html_page(&format!("<h2>{}</h2><pre>Текст произведения</pre>", title)),
        )
        .await;
    }

    let mut site = seed_site(format!("{}/", server.uri()), 3);
    site.seeds[0].label = Some("Фантастика".to_string());
    site.first_level = Some(authors_rule());
    site.second_level = Some(works_rule());

    let mut config = create_test_config(&output, site);
    config.output.delimiter = ',';
    config.output.columns = vec![
        ColumnSpec::new(Field::Section, "Раздел"),
        ColumnSpec::new(Field::Author, "Автор"),
        ColumnSpec::new(Field::Title, "Название"),
        ColumnSpec::new(Field::Url, "Ссылка"),
    ];

    let stats = Coordinator::new(config)
        .expect("Failed to create coordinator")
        .run()
        .await
        .expect("Run failed");

    assert_eq!(stats.records_written(), 3);
    assert_eq!(stats.duplicates_skipped(), 1);

    let mut rows = read_rows(&output, b',');
    assert_eq!(rows.remove(0), vec!["Раздел", "Автор", "Название", "Ссылка"]);
    rows.sort();

    let base = server.uri();
    assert_eq!(
        rows,
        vec![
            vec![
                "Фантастика".to_string(),
                "Беляев Александр".to_string(),
                "Голова профессора Доуэля".to_string(),
                format!("{}/belaew/dowel.txt", base),
            ],
            vec![
                "Фантастика".to_string(),
                "Беляев Александр".to_string(),
                "Человек-амфибия".to_string(),
                format!("{}/belaew/amphibia.txt", base),
            ],
            vec![
                "Фантастика".to_string(),
                "Ефремов Иван".to_string(),
                "Туманность Андромеды".to_string(),
                format!("{}/efremov/andromeda.txt", base),
            ],
        ]
    );
}

#[tokio::test]
async fn test_timed_out_leaf_is_skipped() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("out.csv");

    mount(
        &server,
        "/",
        html_page(
            r#"<ul>
                <li><a href="/fast1">1</a></li>
                <li><a href="/slow">2</a></li>
                <li><a href="/fast2">3</a></li>
            </ul>"#,
        ),
    )
    .await;
    mount(&server, "/fast1", html_page("<pre>Первый</pre>")).await;
    mount(&server, "/fast2", html_page("<pre>Третий</pre>")).await;
    mount(
        &server,
        "/slow",
        html_page("<pre>Слишком поздно</pre>").set_delay(Duration::from_secs(3)),
    )
    .await;

    let mut site = seed_site(format!("{}/", server.uri()), 2);
    site.first_level = Some(works_rule());
    let mut config = create_test_config(&output, site);
    config.crawler.timeout_secs = 1;

    let stats = Coordinator::new(config)
        .expect("Failed to create coordinator")
        .run()
        .await
        .expect("Run failed");

    assert_eq!(stats.count(PageOutcome::TimedOut), 1);
    assert_eq!(stats.records_written(), 2);

    let rows = read_rows(&output, b';');
    assert_eq!(rows.len(), 1 + 2);
    assert!(rows.iter().all(|row| row[1] != "Слишком поздно"));
}

#[tokio::test]
async fn test_failed_and_empty_leaves_are_not_written() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("out.csv");

    mount(
        &server,
        "/",
        html_page(
            r#"<ul>
                <li><a href="/ok">ok</a></li>
                <li><a href="/missing">404</a></li>
                <li><a href="/empty">empty</a></li>
                <li><a href="/noise">noise</a></li>
            </ul>"#,
        ),
    )
    .await;
    mount(&server, "/ok", html_page("<pre>Есть текст</pre>")).await;
    mount(&server, "/missing", ResponseTemplate::new(404)).await;
    mount(&server, "/empty", html_page("<h1>Без тела</h1><p>абзац</p>")).await;
    mount(&server, "/noise", html_page("<pre>[1] ***** [2]</pre>")).await;

    let mut site = seed_site(format!("{}/", server.uri()), 2);
    site.first_level = Some(works_rule());
    let config = create_test_config(&output, site);

    let stats = Coordinator::new(config)
        .expect("Failed to create coordinator")
        .run()
        .await
        .expect("Run failed");

    assert_eq!(stats.records_written(), 1);
    assert_eq!(stats.count(PageOutcome::HttpError), 1);
    assert_eq!(stats.count(PageOutcome::EmptyBody), 2);

    let rows = read_rows(&output, b';');
    assert_eq!(
        rows,
        vec![
            vec!["Заголовок".to_string(), "Текст".to_string()],
            vec!["Без названия".to_string(), "Есть текст".to_string()],
        ]
    );
}

#[tokio::test]
async fn test_missing_header_abandons_branch() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("out.csv");

    mount(
        &server,
        "/",
        html_page(r#"<ul><li><a href="/a1">A</a></li></ul>"#),
    )
    .await;

    let mut site = seed_site(format!("{}/", server.uri()), 2);
    site.first_level = Some(authors_rule());
    let config = create_test_config(&output, site);

    let stats = Coordinator::new(config)
        .expect("Failed to create coordinator")
        .run()
        .await
        .expect("Run failed");

    assert_eq!(stats.count(PageOutcome::NoLinks), 1);
    assert_eq!(stats.records_written(), 0);
    assert_eq!(read_rows(&output, b';').len(), 1);
}

#[tokio::test]
async fn test_legacy_encoding_is_decoded() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("out.csv");

    let page = "<html><head><title>Рассказ</title></head><body><pre>\
        Это была длинная зимняя ночь, и в старом доме на окраине города никто не спал. \
        Писатель сидел за столом и переписывал главу своего романа.</pre></body></html>";
    let (bytes, _, _) = WINDOWS_1251.encode(page);
    mount(
        &server,
        "/story.txt",
        ResponseTemplate::new(200)
            .set_body_bytes(bytes.into_owned())
            .insert_header("content-type", "text/html"),
    )
    .await;

    let site = seed_site(format!("{}/story.txt", server.uri()), 1);
    let config = create_test_config(&output, site);

    let stats = harvest(config).await.expect("Run failed");
    assert_eq!(stats.records_written(), 1);

    let rows = read_rows(&output, b';');
    assert_eq!(rows[1][0], "Рассказ");
    assert!(rows[1][1].starts_with("Это была длинная зимняя ночь"));
}

#[tokio::test]
async fn test_paginated_pages_stop_at_record_cap() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("news.csv");

    for id in 1..=5 {
        mount(
            &server,
            &format!("/material-print/{}", id),
            html_page(&format!(
                r#"<h1>Новость {}</h1><p class="text-8">Абзац один.</p><p class="text-8">Абзац&nbsp;два.</p>"#,
                id
            )),
        )
        .await;
    }

    let site = SiteConfig {
        seeds: vec![],
        pages: Some(PageRange {
            url_template: format!("{}/material-print/{{id}}", server.uri()),
            start: 1,
            end: 5,
        }),
        depth: 1,
        first_level: None,
        second_level: None,
        emit_links: false,
        content: ContentConfig::default(),
    };
    let mut config = create_test_config(&output, site);
    config.crawler.max_records = Some(3);

    let stats = Coordinator::new(config)
        .expect("Failed to create coordinator")
        .run()
        .await
        .expect("Run failed");

    assert_eq!(stats.records_written(), 3);
    assert!(stats.stopped_early);

    let rows = read_rows(&output, b';');
    assert_eq!(rows.len(), 1 + 3);
    assert_eq!(rows[1][1], "Абзац один. Абзац два.");
}

#[tokio::test]
async fn test_table_of_contents_with_link_titles_and_bom() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("code.csv");

    mount(
        &server,
        "/document/",
        html_page(
            r#"<div class="document-page__toc">
                <a href="/document/ch1/">Глава 1</a>
                <a href="/document/art1/">Статья 1. Общие положения</a>
            </div>"#,
        ),
    )
    .await;
    mount(
        &server,
        "/document/art1/",
        html_page(
            r#"<h1>Кодекс</h1><div class="document-page__content">
                <p>Настоящий кодекс определяет порядок.</p>
                <script>track();</script>
                <table><tr><td>сноска</td></tr></table>
            </div>"#,
        ),
    )
    .await;

    let mut site = seed_site(format!("{}/document/", server.uri()), 2);
    site.first_level = Some(DiscoveryRule::TagBlock {
        selector: "div.document-page__toc".to_string(),
        text_prefix: Some("Статья".to_string()),
    });
    site.content = ContentConfig {
        body_selectors: vec![BodySelector::first("div.document-page__content")],
        strip_tables: true,
        title_source: TitleSource::LinkText,
        ..ContentConfig::default()
    };

    let mut config = create_test_config(&output, site);
    config.output.byte_order_mark = true;

    let stats = Coordinator::new(config)
        .expect("Failed to create coordinator")
        .run()
        .await
        .expect("Run failed");
    assert_eq!(stats.records_written(), 1);

    let bytes = std::fs::read(&output).unwrap();
    assert!(bytes.starts_with(b"\xEF\xBB\xBF"));
    let text = String::from_utf8(bytes[3..].to_vec()).unwrap();
    assert_eq!(
        text,
        "Заголовок;Текст\nСтатья 1. Общие положения;Настоящий кодекс определяет порядок.\n"
    );
}

#[tokio::test]
async fn test_cancelled_run_leaves_header_only() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("out.csv");

    mount(&server, "/", html_page("<pre>никогда</pre>")).await;

    let config = create_test_config(&output, seed_site(format!("{}/", server.uri()), 1));
    let coordinator = Coordinator::new(config).expect("Failed to create coordinator");
    coordinator.cancellation_token().cancel();

    let stats = coordinator.run().await.expect("Run failed");
    assert!(stats.stopped_early);
    assert_eq!(stats.pages_fetched, 0);
    assert_eq!(read_rows(&output, b';'), vec![vec!["Заголовок", "Текст"]]);
}

#[tokio::test]
async fn test_link_catalog_lists_works_without_fetching_them() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("lib_books.csv");

    mount(
        &server,
        "/LITRA/",
        html_page(
            r#"<ul><li><a href="PUSHKIN/">Пушкин Александр</a></li></ul>
            <p><a href="GOGOL/">Гоголь Николай</a></p>"#,
        ),
    )
    .await;
    mount(
        &server,
        "/LITRA/PUSHKIN/",
        html_page(
            r#"<pre><a href="onegin.txt">Евгений Онегин</a>
            <a href="tales.zip">Сказки</a>
            <a href="blank.txt"> </a></pre>"#,
        ),
    )
    .await;
    mount(
        &server,
        "/LITRA/GOGOL/",
        html_page(r#"<pre><a href="nos.txt">Нос</a></pre>"#),
    )
    .await;

    // Work pages must never be requested
    for route in [
        "/LITRA/PUSHKIN/onegin.txt",
        "/LITRA/PUSHKIN/tales.zip",
        "/LITRA/GOGOL/nos.txt",
    ] {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(404))
            .expect(0)
            .mount(&server)
            .await;
    }

    let mut site = seed_site(format!("{}/LITRA/", server.uri()), 3);
    site.seeds[0].label = Some("РУССКАЯ КЛАССИКА".to_string());
    site.first_level = Some(DiscoveryRule::ListItems {
        item_tags: vec!["li".to_string(), "p".to_string()],
        first_anchor_only: true,
    });
    site.second_level = Some(DiscoveryRule::TagBlock {
        selector: "pre".to_string(),
        text_prefix: None,
    });
    site.emit_links = true;

    let mut config = create_test_config(&output, site);
    config.output.delimiter = ',';
    config.output.columns = vec![
        ColumnSpec::new(Field::Section, "Раздел"),
        ColumnSpec::new(Field::Author, "Автор"),
        ColumnSpec::new(Field::Title, "Название"),
        ColumnSpec::new(Field::Url, "Ссылка"),
    ];

    let stats = Coordinator::new(config)
        .expect("Failed to create coordinator")
        .run()
        .await
        .expect("Run failed");

    assert_eq!(stats.records_written(), 3);
    assert_eq!(stats.pages_fetched, 3);

    let base = server.uri();
    let rows = read_rows(&output, b',');
    assert_eq!(
        rows,
        vec![
            vec![
                "Раздел".to_string(),
                "Автор".to_string(),
                "Название".to_string(),
                "Ссылка".to_string(),
            ],
            vec![
                "РУССКАЯ КЛАССИКА".to_string(),
                "Пушкин Александр".to_string(),
                "Евгений Онегин".to_string(),
                format!("{}/LITRA/PUSHKIN/onegin.txt", base),
            ],
            vec![
                "РУССКАЯ КЛАССИКА".to_string(),
                "Пушкин Александр".to_string(),
                "Сказки".to_string(),
                format!("{}/LITRA/PUSHKIN/tales.zip", base),
            ],
            vec![
                "РУССКАЯ КЛАССИКА".to_string(),
                "Гоголь Николай".to_string(),
                "Нос".to_string(),
                format!("{}/LITRA/GOGOL/nos.txt", base),
            ],
        ]
    );
}
