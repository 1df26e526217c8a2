//! End-to-end tests of the SQL path against SQLite.
//!
//! The same statements the importer issues against MySQL run here through
//! the `Any` driver, so these cover the table descriptors, the join, row
//! decoding and error classification.

mod common;

use std::sync::Arc;

use tempfile::TempDir;
use wp_sql_import::config::{CategoryLookup, OutputConfig};
use wp_sql_import::db::SqlSource;
use wp_sql_import::diagnostics::{CapturedDiagnostics, Diagnostics, Level};
use wp_sql_import::error::ImportError;
use wp_sql_import::importer::{
    list_content, read_site_config, CategoryIndex, ImportArgs, WordpressSqlImporter,
};
use wp_sql_import::models::{ContentItem, OptionRow, PostInfo, PostKind, PostRow};
use wp_sql_import::source::WordpressSource;
use wp_sql_import::tables::WordpressTables;
use wp_sql_import::traits::{run_import, ImportSummary};
use wp_sql_import::writer::SiteWriter;

async fn source(prefix: &str) -> SqlSource {
    let conn = common::memory_blog(prefix).await;
    SqlSource::from_connection(conn, WordpressTables::new(prefix).unwrap())
}

fn post<'a>(items: &'a [ContentItem], slug: &str) -> &'a PostInfo {
    items
        .iter()
        .find_map(|i| match i {
            ContentItem::Post(info) if info.slug == slug => Some(info),
            _ => None,
        })
        .unwrap_or_else(|| panic!("no post with slug {}", slug))
}

#[tokio::test]
async fn test_site_config_from_sql() {
    let mut src = source("wp_").await;
    let cfg = read_site_config(&mut src).await.unwrap();

    assert_eq!(cfg.title, "My Blog");
    assert_eq!(cfg.description, "A test blog");
    assert_eq!(cfg.authors.len(), 1);
    let alice = &cfg.authors["alice"];
    assert_eq!(alice.email, "a@x.com");
    assert_eq!(alice.display_name, "Alice");
    assert_eq!(alice.author_id, 1);

    let again = read_site_config(&mut src).await.unwrap();
    assert_eq!(cfg, again);
    src.close().await.unwrap();
}

#[tokio::test]
async fn test_enumerates_posts_pages_and_attachments() {
    let mut src = source("wp_").await;
    let diag = CapturedDiagnostics::new();
    let items = list_content(&mut src, None, diag.as_ref(), false)
        .await
        .unwrap()
        .collect_all()
        .await
        .unwrap();

    // hello, release, about, logo; the revision is skipped.
    assert_eq!(items.len(), 4);
    assert!(items.contains(&ContentItem::Attachment {
        url: "http://x/wp-content/uploads/2015/06/logo.png".to_string()
    }));

    let hello = post(&items, "hello");
    assert_eq!(hello.kind, PostKind::Post);
    assert_eq!(hello.author, "alice");
    assert!(hello.categories.is_empty());
    assert_eq!(hello.post_id, 10);
    assert_eq!(hello.post_guid, "http://x/hello");
    assert_eq!(hello.content, "<p>Hello</p>");
    assert_eq!(
        hello.datetime.map(|d| d.to_string()).as_deref(),
        Some("2015-06-01 09:30:00")
    );

    let release = post(&items, "release");
    assert_eq!(release.categories, vec!["news", "announcements"]);
    assert_eq!(release.excerpt, "Short");

    let about = post(&items, "about");
    assert_eq!(about.kind, PostKind::Page);
    assert_eq!(about.author, "");

    assert_eq!(diag.messages(Level::Warn), vec!["No author on about"]);
    assert_eq!(
        diag.messages(Level::Debug),
        vec!["Skipping taxonomy 'post_tag' on: release"]
    );
}

#[tokio::test]
async fn test_text_columns_returned_as_bytes_decode() {
    // MySQL reports CAST(<TEXT> AS CHAR) as a BLOB type; SQLite BLOBs reach
    // the row decoders the same way.
    let mut conn = common::memory_blog("wp_").await;

    let option: OptionRow = sqlx::query_as(
        "SELECT CAST('blogname' AS BLOB) AS option_name, \
         X'4d7920426c6f67' AS option_value",
    )
    .fetch_one(&mut conn)
    .await
    .unwrap();
    assert_eq!(option.option_name, "blogname");
    assert_eq!(option.option_value, "My Blog");

    let post: PostRow = sqlx::query_as(
        "SELECT 10 AS id, 1 AS post_author, '2015-06-01 09:30:00' AS post_date, \
         X'3c703e48693c2f703e' AS post_content, CAST('Hi' AS BLOB) AS post_title, \
         CAST('Short' AS BLOB) AS post_excerpt, 'publish' AS post_status, \
         'hi' AS post_name, 'http://x/hi' AS guid, 'post' AS post_type",
    )
    .fetch_one(&mut conn)
    .await
    .unwrap();
    assert_eq!(post.id, 10);
    assert_eq!(post.post_content, "<p>Hi</p>");
    assert_eq!(post.post_title, "Hi");
    assert_eq!(post.post_excerpt, "Short");
    assert_eq!(post.post_type, "post");
}

#[tokio::test]
async fn test_prefetch_matches_per_post_join() {
    let diag = CapturedDiagnostics::new();

    let mut per_post_src = source("wp_").await;
    let per_post = list_content(&mut per_post_src, None, diag.as_ref(), false)
        .await
        .unwrap()
        .collect_all()
        .await
        .unwrap();

    let mut prefetch_src = source("wp_").await;
    let index = CategoryIndex::from_rows(prefetch_src.all_terms().await.unwrap());
    assert_eq!(index.len(), 1);
    let prefetched = list_content(&mut prefetch_src, Some(&index), diag.as_ref(), false)
        .await
        .unwrap()
        .collect_all()
        .await
        .unwrap();

    assert_eq!(per_post, prefetched);
}

#[tokio::test]
async fn test_custom_prefix() {
    let mut src = source("blog2_").await;
    let cfg = read_site_config(&mut src).await.unwrap();
    assert_eq!(cfg.title, "My Blog");
}

#[tokio::test]
async fn test_missing_table_is_schema_error() {
    let conn = common::memory_blog("wp_").await;
    let mut src = SqlSource::from_connection(conn, WordpressTables::new("other_").unwrap());

    match read_site_config(&mut src).await {
        Err(ImportError::Schema { table, .. }) => assert_eq!(table, "other_options"),
        other => panic!("expected schema error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_missing_description_is_missing_config() {
    let mut conn = common::memory_blog("wp_").await;
    common::execute_all(
        &mut conn,
        &["DELETE FROM wp_options WHERE option_name = 'blogdescription'".to_string()],
    )
    .await;

    let mut src = SqlSource::from_connection(conn, WordpressTables::new("wp_").unwrap());
    match read_site_config(&mut src).await {
        Err(ImportError::MissingConfig(name)) => assert_eq!(name, "blogdescription"),
        other => panic!("expected MissingConfig, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unknown_post_type_aborts() {
    let mut conn = common::memory_blog("wp_").await;
    common::execute_all(
        &mut conn,
        &["INSERT INTO wp_posts (ID, post_author, post_name, post_type) VALUES (5, 1, 'w', 'widget')"
            .to_string()],
    )
    .await;
    let mut src = SqlSource::from_connection(conn, WordpressTables::new("wp_").unwrap());
    let diag = CapturedDiagnostics::new();

    let err = list_content(&mut src, None, diag.as_ref(), false)
        .await
        .unwrap()
        .collect_all()
        .await
        .unwrap_err();
    assert!(matches!(err, ImportError::UnknownPostType(ref t) if t == "widget"));
}

#[tokio::test]
async fn test_queries_after_close_fail_with_connection_error() {
    let mut src = source("wp_").await;
    src.close().await.unwrap();
    src.close().await.unwrap();
    assert!(matches!(
        src.posts().await,
        Err(ImportError::Connection { .. })
    ));
}

#[tokio::test]
async fn test_full_import_into_site_directory() {
    let tmp = TempDir::new().unwrap();
    let url = common::file_blog(&tmp.path().join("blog.db"), "wp_", &[]).await;
    let out = tmp.path().join("site");

    for lookup in [CategoryLookup::PerPost, CategoryLookup::Prefetch] {
        let diag = CapturedDiagnostics::new();
        let diagnostics: Arc<dyn Diagnostics> = diag.clone();
        let mut args = ImportArgs::new(url.clone());
        args.category_lookup = lookup;
        let importer = WordpressSqlImporter::new(args, diagnostics.clone());
        let mut writer = SiteWriter::new(
            &OutputConfig {
                dir: out.clone(),
                download_attachments: false,
                overwrite: true,
            },
            diagnostics,
        );

        let summary = run_import(&importer, &mut writer).await.unwrap();
        assert_eq!(
            summary,
            ImportSummary {
                posts: 2,
                pages: 1,
                attachments: 1,
                written: 4,
                skipped: 0,
            }
        );
        assert!(diag.messages(Level::Info)[0].starts_with("Connecting to "));
    }

    let release = std::fs::read_to_string(out.join("posts/2015-07-04_release.html")).unwrap();
    assert!(release.contains("categories = [\"news\", \"announcements\"]"));
    assert!(release.contains("author = \"alice\""));
    assert!(release.ends_with("<p>Out now</p>\n"));
    assert!(out.join("posts/2015-06-01_hello.html").exists());
    assert!(out.join("pages/about.html").exists());
    assert!(out.join("config.toml").exists());
    assert_eq!(
        std::fs::read_to_string(out.join("attachments.txt")).unwrap(),
        "http://x/wp-content/uploads/2015/06/logo.png\n"
    );
}

#[tokio::test]
async fn test_import_failure_still_reports_error_after_partial_output() {
    let tmp = TempDir::new().unwrap();
    let url = common::file_blog(
        &tmp.path().join("blog.db"),
        "wp_",
        &["INSERT INTO wp_posts (ID, post_author, post_name, post_type) VALUES (99, 1, 'menu', 'nav_menu_item')"
            .to_string()],
    )
    .await;

    let diag = CapturedDiagnostics::new();
    let importer = WordpressSqlImporter::new(ImportArgs::new(url.clone()), diag.clone());
    let mut writer = SiteWriter::new(
        &OutputConfig {
            dir: tmp.path().join("site"),
            download_attachments: false,
            overwrite: false,
        },
        diag.clone(),
    );
    let err = run_import(&importer, &mut writer).await.unwrap_err();
    assert!(matches!(err, ImportError::UnknownPostType(ref t) if t == "nav_menu_item"));

    let mut args = ImportArgs::new(url);
    args.skip_unknown_post_types = true;
    let importer = WordpressSqlImporter::new(args, diag.clone());
    let mut writer = SiteWriter::new(
        &OutputConfig {
            dir: tmp.path().join("site2"),
            download_attachments: false,
            overwrite: false,
        },
        diag.clone(),
    );
    let summary = run_import(&importer, &mut writer).await.unwrap();
    assert_eq!(summary.total(), 4);
}

#[tokio::test]
async fn test_unreachable_database_is_connection_error() {
    let tmp = TempDir::new().unwrap();
    let url = format!(
        "sqlite://{}",
        tmp.path().join("missing/dir/blog.db").display()
    );
    let importer = WordpressSqlImporter::new(ImportArgs::new(url), CapturedDiagnostics::new());
    let mut writer = wp_sql_import::writer::DryRunSink::default();

    let err = run_import(&importer, &mut writer).await.unwrap_err();
    assert!(matches!(err, ImportError::Connection { .. }));
}
