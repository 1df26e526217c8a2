//! Seeds a SQLite database with the WordPress tables the importer reads.

#![allow(dead_code)]

use sqlx::any::install_default_drivers;
use sqlx::{AnyConnection, Connection};

pub fn schema(prefix: &str) -> Vec<String> {
    vec![
        format!(
            "CREATE TABLE {p}options (
                option_id INTEGER PRIMARY KEY,
                option_name TEXT NOT NULL,
                option_value TEXT NOT NULL,
                autoload TEXT NOT NULL DEFAULT 'yes'
            )",
            p = prefix
        ),
        format!(
            "CREATE TABLE {p}users (
                ID INTEGER PRIMARY KEY,
                user_login TEXT NOT NULL,
                user_pass TEXT NOT NULL DEFAULT '',
                user_nicename TEXT NOT NULL DEFAULT '',
                user_email TEXT NOT NULL DEFAULT '',
                user_url TEXT NOT NULL DEFAULT '',
                display_name TEXT NOT NULL DEFAULT ''
            )",
            p = prefix
        ),
        format!(
            "CREATE TABLE {p}posts (
                ID INTEGER PRIMARY KEY,
                post_author INTEGER NOT NULL DEFAULT 0,
                post_date TEXT NOT NULL DEFAULT '0000-00-00 00:00:00',
                post_content TEXT NOT NULL DEFAULT '',
                post_title TEXT NOT NULL DEFAULT '',
                post_excerpt TEXT NOT NULL DEFAULT '',
                post_status TEXT NOT NULL DEFAULT 'publish',
                post_name TEXT NOT NULL DEFAULT '',
                guid TEXT NOT NULL DEFAULT '',
                post_type TEXT NOT NULL DEFAULT 'post'
            )",
            p = prefix
        ),
        format!(
            "CREATE TABLE {p}term_relationships (
                object_id INTEGER NOT NULL,
                term_taxonomy_id INTEGER NOT NULL,
                term_order INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (object_id, term_taxonomy_id)
            )",
            p = prefix
        ),
        format!(
            "CREATE TABLE {p}term_taxonomy (
                term_taxonomy_id INTEGER PRIMARY KEY,
                term_id INTEGER NOT NULL,
                taxonomy TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                parent INTEGER NOT NULL DEFAULT 0,
                count INTEGER NOT NULL DEFAULT 0
            )",
            p = prefix
        ),
        format!(
            "CREATE TABLE {p}terms (
                term_id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                slug TEXT NOT NULL,
                term_group INTEGER NOT NULL DEFAULT 0
            )",
            p = prefix
        ),
    ]
}

/// A small blog:
///
/// - options `blogname = My Blog`, `blogdescription = A test blog`
/// - user 1 `alice`
/// - post 10 `hello` by alice, no terms
/// - post 11 `release` by alice, categories `news`, `announcements`, tag `rust`
/// - page 12 `about` by a deleted user 99
/// - attachment 13, revision 14
/// - terms: 1 news (category), 2 rust (post_tag), 3 announcements (category)
pub fn blog_rows(prefix: &str) -> Vec<String> {
    let p = prefix;
    vec![
        format!("INSERT INTO {p}options (option_name, option_value) VALUES ('siteurl', 'http://x')"),
        format!("INSERT INTO {p}options (option_name, option_value) VALUES ('blogname', 'My Blog')"),
        format!(
            "INSERT INTO {p}options (option_name, option_value) VALUES ('blogdescription', 'A test blog')"
        ),
        format!(
            "INSERT INTO {p}users (ID, user_login, user_nicename, user_email, display_name) \
             VALUES (1, 'alice', 'alice', 'a@x.com', 'Alice')"
        ),
        format!(
            "INSERT INTO {p}posts (ID, post_author, post_date, post_content, post_title, post_name, guid, post_type) \
             VALUES (10, 1, '2015-06-01 09:30:00', '<p>Hello</p>', 'Hello', 'hello', 'http://x/hello', 'post')"
        ),
        format!(
            "INSERT INTO {p}posts (ID, post_author, post_date, post_content, post_title, post_excerpt, post_name, guid, post_type) \
             VALUES (11, 1, '2015-07-04 12:00:00', '<p>Out now</p>', 'Release', 'Short', 'release', 'http://x/?p=11', 'post')"
        ),
        format!(
            "INSERT INTO {p}posts (ID, post_author, post_date, post_title, post_name, guid, post_type) \
             VALUES (12, 99, '2015-01-01 00:00:00', 'About', 'about', 'http://x/?page_id=12', 'page')"
        ),
        format!(
            "INSERT INTO {p}posts (ID, post_author, post_name, guid, post_type, post_status) \
             VALUES (13, 1, 'logo', 'http://x/wp-content/uploads/2015/06/logo.png', 'attachment', 'inherit')"
        ),
        format!(
            "INSERT INTO {p}posts (ID, post_author, post_name, guid, post_type, post_status) \
             VALUES (14, 1, '11-revision-v1', 'http://x/?p=14', 'revision', 'inherit')"
        ),
        format!("INSERT INTO {p}terms (term_id, name, slug) VALUES (1, 'News', 'news')"),
        format!("INSERT INTO {p}terms (term_id, name, slug) VALUES (2, 'Rust', 'rust')"),
        format!("INSERT INTO {p}terms (term_id, name, slug) VALUES (3, 'Announcements', 'announcements')"),
        format!("INSERT INTO {p}term_taxonomy (term_taxonomy_id, term_id, taxonomy) VALUES (1, 1, 'category')"),
        format!("INSERT INTO {p}term_taxonomy (term_taxonomy_id, term_id, taxonomy) VALUES (2, 2, 'post_tag')"),
        format!("INSERT INTO {p}term_taxonomy (term_taxonomy_id, term_id, taxonomy) VALUES (3, 3, 'category')"),
        format!("INSERT INTO {p}term_relationships (object_id, term_taxonomy_id) VALUES (11, 1)"),
        format!("INSERT INTO {p}term_relationships (object_id, term_taxonomy_id) VALUES (11, 2)"),
        format!("INSERT INTO {p}term_relationships (object_id, term_taxonomy_id) VALUES (11, 3)"),
    ]
}

pub async fn execute_all(conn: &mut AnyConnection, statements: &[String]) {
    for stmt in statements {
        sqlx::query(stmt)
            .execute(&mut *conn)
            .await
            .unwrap_or_else(|e| panic!("seed statement failed: {}\n{}", e, stmt));
    }
}

/// An in-memory SQLite connection holding the blog described in [`blog_rows`].
pub async fn memory_blog(prefix: &str) -> AnyConnection {
    install_default_drivers();
    let mut conn = AnyConnection::connect("sqlite::memory:").await.unwrap();
    execute_all(&mut conn, &schema(prefix)).await;
    execute_all(&mut conn, &blog_rows(prefix)).await;
    conn
}

/// Create a SQLite file at `path` holding the blog, plus `extra` statements.
pub async fn file_blog(path: &std::path::Path, prefix: &str, extra: &[String]) -> String {
    install_default_drivers();
    let url = format!("sqlite://{}", path.display());
    let mut conn = AnyConnection::connect(&format!("{}?mode=rwc", url))
        .await
        .unwrap();
    execute_all(&mut conn, &schema(prefix)).await;
    execute_all(&mut conn, &blog_rows(prefix)).await;
    execute_all(&mut conn, extra).await;
    conn.close().await.unwrap();
    url
}
