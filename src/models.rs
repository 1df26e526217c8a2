//! Data models for an import run.
//!
//! Row records (`*Row`) are the typed shape of each query's result set.
//! [`SiteConfig`] and [`ContentItem`] are what the importer hands to the host.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use sqlx::any::AnyRow;
use sqlx::{FromRow, Row};

/// One row of `<prefix>options`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionRow {
    pub option_name: String,
    pub option_value: String,
}

/// One row of `<prefix>users`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRow {
    pub id: i64,
    pub user_login: String,
    pub user_nicename: String,
    pub user_email: String,
    pub user_url: String,
    pub display_name: String,
}

/// One row of `<prefix>posts`, with `post_date` still in its textual form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostRow {
    pub id: i64,
    pub post_author: i64,
    pub post_date: String,
    pub post_content: String,
    pub post_title: String,
    pub post_excerpt: String,
    pub post_status: String,
    pub post_name: String,
    pub guid: String,
    pub post_type: String,
}

/// One row of `term_relationships ⋈ term_taxonomy ⋈ terms`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermRow {
    pub object_id: i64,
    pub taxonomy: String,
    pub name: String,
    pub slug: String,
}

/// Read a text column from an `Any` row.
///
/// MySQL reports `CAST(<TEXT> AS CHAR)` with a BLOB column type, which the
/// `Any` driver hands back as bytes rather than text.
fn text(row: &AnyRow, column: &str) -> Result<String, sqlx::Error> {
    match row.try_get::<String, _>(column) {
        Ok(value) => Ok(value),
        Err(sqlx::Error::ColumnDecode { .. }) => {
            let bytes: Vec<u8> = row.try_get(column)?;
            Ok(text_from_bytes(bytes))
        }
        Err(e) => Err(e),
    }
}

/// Invalid UTF-8 is replaced rather than rejected; old WordPress databases
/// often hold latin1 bytes in utf8 columns.
fn text_from_bytes(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    }
}

impl<'r> FromRow<'r, AnyRow> for OptionRow {
    fn from_row(row: &'r AnyRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            option_name: text(row, "option_name")?,
            option_value: text(row, "option_value")?,
        })
    }
}

impl<'r> FromRow<'r, AnyRow> for UserRow {
    fn from_row(row: &'r AnyRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            user_login: text(row, "user_login")?,
            user_nicename: text(row, "user_nicename")?,
            user_email: text(row, "user_email")?,
            user_url: text(row, "user_url")?,
            display_name: text(row, "display_name")?,
        })
    }
}

impl<'r> FromRow<'r, AnyRow> for PostRow {
    fn from_row(row: &'r AnyRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            post_author: row.try_get("post_author")?,
            post_date: text(row, "post_date")?,
            post_content: text(row, "post_content")?,
            post_title: text(row, "post_title")?,
            post_excerpt: text(row, "post_excerpt")?,
            post_status: text(row, "post_status")?,
            post_name: text(row, "post_name")?,
            guid: text(row, "guid")?,
            post_type: text(row, "post_type")?,
        })
    }
}

impl<'r> FromRow<'r, AnyRow> for TermRow {
    fn from_row(row: &'r AnyRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            object_id: row.try_get("object_id")?,
            taxonomy: text(row, "taxonomy")?,
            name: text(row, "name")?,
            slug: text(row, "slug")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorInfo {
    pub email: String,
    pub display_name: String,
    pub author_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SiteConfig {
    pub title: String,
    pub description: String,
    /// Keyed by `user_login`; a later duplicate login replaces the earlier one.
    pub authors: BTreeMap<String, AuthorInfo>,
}

/// Whether a post row is a blog post or a standalone page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PostKind {
    Post,
    Page,
}

impl PostKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Post => "post",
            Self::Page => "page",
        }
    }
}

/// A post or page with its author and categories resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostInfo {
    #[serde(rename = "type")]
    pub kind: PostKind,
    pub slug: String,
    /// `None` for the MySQL zero date or an unparseable value.
    pub datetime: Option<NaiveDateTime>,
    pub title: String,
    pub status: String,
    pub post_id: i64,
    pub post_guid: String,
    pub content: String,
    pub excerpt: String,
    /// Author login, or empty when the author row is missing.
    pub author: String,
    pub categories: Vec<String>,
    /// Reserved for extra front matter; always empty for now.
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentItem {
    Attachment { url: String },
    Post(PostInfo),
}

impl Serialize for ContentItem {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Attachment { url } => {
                let mut s = serializer.serialize_struct("Attachment", 2)?;
                s.serialize_field("type", "attachment")?;
                s.serialize_field("url", url)?;
                s.end()
            }
            Self::Post(info) => info.serialize(serializer),
        }
    }
}

impl ContentItem {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Attachment { .. } => "attachment",
            Self::Post(info) => info.kind.as_str(),
        }
    }
}

const POST_DATE_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Parse a `post_date` column value.
///
/// WordPress stores `0000-00-00 00:00:00` for undated drafts; that and any
/// other unparseable value map to `None`.
pub fn parse_post_date(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    POST_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}
