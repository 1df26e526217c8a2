//! The WordPress SQL importer.
//!
//! Reads the site configuration, then enumerates the posts table and turns
//! each row into a [`ContentItem`]:
//!
//! | `post_type` | Result |
//! |-------------|--------|
//! | `attachment` | [`ContentItem::Attachment`] with the row's `guid` |
//! | `post`, `page` | [`ContentItem::Post`], author and categories resolved |
//! | `revision` | skipped |
//! | anything else | [`ImportError::UnknownPostType`] (or skipped with a warning when configured) |
//!
//! Categories are looked up with one join per post unless
//! [`CategoryLookup::Prefetch`] is selected, in which case every relationship
//! is fetched once and grouped by post id. Both strategies return the same
//! slugs in the same order.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::CategoryLookup;
use crate::db::SqlSource;
use crate::diagnostics::Diagnostics;
use crate::error::{ImportError, Result};
use crate::models::{
    parse_post_date, AuthorInfo, ContentItem, PostInfo, PostKind, PostRow, SiteConfig, TermRow,
};
use crate::source::WordpressSource;
use crate::traits::{ContentSequence, ImportDriver};

pub const IMPORTER_NAME: &str = "wordpress-sql";
pub const IMPORTER_DESCRIPTION: &str = "Imports a Wordpress blog from its SQL database.";

const CATEGORY_TAXONOMY: &str = "category";

/// Arguments for one `wordpress-sql` run.
#[derive(Debug, Clone)]
pub struct ImportArgs {
    pub db_url: String,
    pub prefix: String,
    pub category_lookup: CategoryLookup,
    pub skip_unknown_post_types: bool,
}

impl ImportArgs {
    pub fn new(db_url: impl Into<String>) -> Self {
        Self {
            db_url: db_url.into(),
            prefix: "wp_".to_string(),
            category_lookup: CategoryLookup::PerPost,
            skip_unknown_post_types: false,
        }
    }
}

/// Category slugs per post id, built from one pass over the term join.
#[derive(Debug, Default, Clone)]
pub struct CategoryIndex {
    by_object: HashMap<i64, Vec<TermRow>>,
}

impl CategoryIndex {
    pub fn from_rows(rows: Vec<TermRow>) -> Self {
        let mut by_object: HashMap<i64, Vec<TermRow>> = HashMap::new();
        for row in rows {
            by_object.entry(row.object_id).or_default().push(row);
        }
        Self { by_object }
    }

    /// Joined rows for one post, in original join order.
    pub fn rows_for(&self, object_id: i64) -> &[TermRow] {
        self.by_object
            .get(&object_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.by_object.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_object.is_empty()
    }
}

/// State for one import run: the row source and, in prefetch mode, the category index.
pub struct ImportContext {
    source: Box<dyn WordpressSource>,
    categories: Option<CategoryIndex>,
}

impl ImportContext {
    pub fn new(source: Box<dyn WordpressSource>) -> Self {
        Self {
            source,
            categories: None,
        }
    }
}

/// Build the [`SiteConfig`] from `blogname`, `blogdescription` and the users table.
pub async fn read_site_config(source: &mut dyn WordpressSource) -> Result<SiteConfig> {
    let title = required_option(source, "blogname").await?;
    let description = required_option(source, "blogdescription").await?;

    let mut authors = BTreeMap::new();
    for user in source.users().await? {
        authors.insert(
            user.user_login,
            AuthorInfo {
                email: user.user_email,
                display_name: user.display_name,
                author_id: user.id,
            },
        );
    }

    Ok(SiteConfig {
        title,
        description,
        authors,
    })
}

async fn required_option(source: &mut dyn WordpressSource, name: &str) -> Result<String> {
    source
        .option_value(name)
        .await?
        .ok_or_else(|| ImportError::MissingConfig(name.to_string()))
}

/// Resolve author and categories for a post or page row.
///
/// A missing author yields an empty `author` and a warning; non-category
/// taxonomies are dropped with a debug diagnostic. Neither is an error.
pub async fn enrich_post(
    source: &mut dyn WordpressSource,
    categories: Option<&CategoryIndex>,
    kind: PostKind,
    row: PostRow,
    diagnostics: &dyn Diagnostics,
) -> Result<PostInfo> {
    let author = match source.user_by_id(row.post_author).await? {
        Some(user) => user.user_login,
        None => {
            diagnostics.warn(&format!("No author on {}", row.post_name));
            String::new()
        }
    };

    // One join per post unless the index was prefetched.
    let fetched;
    let term_rows: &[TermRow] = match categories {
        Some(index) => index.rows_for(row.id),
        None => {
            fetched = source.terms_for_object(row.id).await?;
            &fetched
        }
    };
    let categories = category_slugs(term_rows, &row.post_name, diagnostics);

    Ok(PostInfo {
        kind,
        datetime: parse_post_date(&row.post_date),
        slug: row.post_name,
        title: row.post_title,
        status: row.post_status,
        post_id: row.id,
        post_guid: row.guid,
        content: row.post_content,
        excerpt: row.post_excerpt,
        author,
        categories,
        metadata: BTreeMap::new(),
    })
}

fn category_slugs(rows: &[TermRow], post_slug: &str, diagnostics: &dyn Diagnostics) -> Vec<String> {
    let mut slugs = Vec::new();
    for r in rows {
        if r.taxonomy != CATEGORY_TAXONOMY {
            diagnostics.debug(&format!(
                "Skipping taxonomy '{}' on: {}",
                r.taxonomy, post_slug
            ));
            continue;
        }
        slugs.push(r.slug.clone());
    }
    slugs
}

/// Single-pass sequence of [`ContentItem`]s over one scan of the posts table.
///
/// Each call to [`next_item`](ContentStream::next_item) enriches at most one
/// row. After the first error the stream is exhausted.
pub struct ContentStream<'a> {
    rows: std::vec::IntoIter<PostRow>,
    source: &'a mut dyn WordpressSource,
    categories: Option<&'a CategoryIndex>,
    diagnostics: &'a dyn Diagnostics,
    skip_unknown: bool,
    done: bool,
}

impl<'a> ContentStream<'a> {
    pub async fn next_item(&mut self) -> Result<Option<ContentItem>> {
        if self.done {
            return Ok(None);
        }
        match self.advance().await {
            Ok(Some(item)) => Ok(Some(item)),
            Ok(None) => {
                self.done = true;
                Ok(None)
            }
            Err(e) => {
                self.done = true;
                Err(e)
            }
        }
    }

    async fn advance(&mut self) -> Result<Option<ContentItem>> {
        while let Some(row) = self.rows.next() {
            let kind = match row.post_type.as_str() {
                "attachment" => return Ok(Some(ContentItem::Attachment { url: row.guid })),
                "post" => PostKind::Post,
                "page" => PostKind::Page,
                "revision" => continue,
                other if self.skip_unknown => {
                    self.diagnostics.warn(&format!(
                        "Skipping unknown post type '{}' on: {}",
                        other, row.post_name
                    ));
                    continue;
                }
                other => return Err(ImportError::UnknownPostType(other.to_string())),
            };
            let info = enrich_post(
                &mut *self.source,
                self.categories,
                kind,
                row,
                self.diagnostics,
            )
            .await?;
            return Ok(Some(ContentItem::Post(info)));
        }
        Ok(None)
    }

    /// Drain the stream into a vector, stopping at the first error.
    pub async fn collect_all(mut self) -> Result<Vec<ContentItem>> {
        let mut items = Vec::new();
        while let Some(item) = self.next_item().await? {
            items.push(item);
        }
        Ok(items)
    }
}

#[async_trait]
impl<'a> ContentSequence for ContentStream<'a> {
    async fn next_item(&mut self) -> Result<Option<ContentItem>> {
        ContentStream::next_item(self).await
    }
}

/// Open a [`ContentStream`] over `source`.
pub async fn list_content<'a>(
    source: &'a mut dyn WordpressSource,
    categories: Option<&'a CategoryIndex>,
    diagnostics: &'a dyn Diagnostics,
    skip_unknown: bool,
) -> Result<ContentStream<'a>> {
    let rows = source.posts().await?;
    Ok(ContentStream {
        rows: rows.into_iter(),
        source,
        categories,
        diagnostics,
        skip_unknown,
        done: false,
    })
}

/// The `wordpress-sql` importer.
pub struct WordpressSqlImporter {
    args: ImportArgs,
    diagnostics: Arc<dyn Diagnostics>,
}

impl WordpressSqlImporter {
    pub fn new(args: ImportArgs, diagnostics: Arc<dyn Diagnostics>) -> Self {
        Self { args, diagnostics }
    }
}

#[async_trait]
impl ImportDriver for WordpressSqlImporter {
    type Context = ImportContext;

    fn name(&self) -> &str {
        IMPORTER_NAME
    }

    fn description(&self) -> &str {
        IMPORTER_DESCRIPTION
    }

    async fn open(&self) -> Result<ImportContext> {
        let source = SqlSource::open(
            &self.args.db_url,
            &self.args.prefix,
            self.diagnostics.as_ref(),
        )
        .await?;
        Ok(ImportContext::new(Box::new(source)))
    }

    async fn site_config(&self, ctx: &mut ImportContext) -> Result<SiteConfig> {
        read_site_config(ctx.source.as_mut()).await
    }

    async fn list_content<'a>(
        &'a self,
        ctx: &'a mut ImportContext,
    ) -> Result<Box<dyn ContentSequence + 'a>> {
        if self.args.category_lookup == CategoryLookup::Prefetch && ctx.categories.is_none() {
            let rows = ctx.source.all_terms().await?;
            let index = CategoryIndex::from_rows(rows);
            self.diagnostics.debug(&format!(
                "Prefetched term relationships for {} objects",
                index.len()
            ));
            ctx.categories = Some(index);
        }
        let stream = list_content(
            ctx.source.as_mut(),
            ctx.categories.as_ref(),
            self.diagnostics.as_ref(),
            self.args.skip_unknown_post_types,
        )
        .await?;
        Ok(Box::new(stream))
    }

    async fn close(&self, ctx: &mut ImportContext) -> Result<()> {
        ctx.source.close().await
    }
}
