//! Host-side extension traits: the importer lifecycle, content sinks, and
//! the importer registry.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │            ImporterRegistry              │
//! │        ┌────────────────────┐            │
//! │        │  wordpress-sql     │            │
//! │        │  (ImportDriver)    │            │
//! │        └────────────────────┘            │
//! └──────────────┬───────────────────────────┘
//!                ▼
//!     run_import(): open → site_config → list_content (drained) → close
//!                ▼
//!          ContentSink (files, dry run)
//! ```
//!
//! # Usage
//!
//! ```rust
//! use wp_sql_import::traits::ImporterRegistry;
//!
//! let mut importers = ImporterRegistry::new();
//! // importers.register(Box::new(MyImporter::new()));
//! assert!(importers.is_empty());
//! ```

use async_trait::async_trait;
use std::sync::Arc;

use crate::diagnostics::Diagnostics;
use crate::error::Result;
use crate::importer::{ImportArgs, WordpressSqlImporter};
use crate::models::{ContentItem, SiteConfig};

// ═══════════════════════════════════════════════════════════════════════
// Lifecycle
// ═══════════════════════════════════════════════════════════════════════

/// A lazily produced, single-pass sequence of content items.
#[async_trait]
pub trait ContentSequence: Send {
    /// The next item, or `None` once the sequence is exhausted.
    ///
    /// After an error, implementations return `None` forever.
    async fn next_item(&mut self) -> Result<Option<ContentItem>>;
}

/// The four hooks a host drives, in order, for one import run.
///
/// 1. [`open`](ImportDriver::open) acquires the context (e.g. a connection).
/// 2. [`site_config`](ImportDriver::site_config) reads site-level settings once.
/// 3. [`list_content`](ImportDriver::list_content) is drained completely.
/// 4. [`close`](ImportDriver::close) releases the context, even after a failure.
///
/// [`run_import`] implements exactly this order.
#[async_trait]
pub trait ImportDriver: Send + Sync {
    type Context: Send;

    /// Registry name (e.g. `"wordpress-sql"`).
    fn name(&self) -> &str;

    /// One-line description for `wp-import importers`.
    fn description(&self) -> &str;

    async fn open(&self) -> Result<Self::Context>;

    async fn site_config(&self, ctx: &mut Self::Context) -> Result<SiteConfig>;

    async fn list_content<'a>(
        &'a self,
        ctx: &'a mut Self::Context,
    ) -> Result<Box<dyn ContentSequence + 'a>>;

    async fn close(&self, ctx: &mut Self::Context) -> Result<()>;
}

// ═══════════════════════════════════════════════════════════════════════
// Sinks
// ═══════════════════════════════════════════════════════════════════════

/// What a sink did with one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    /// The sink chose not to persist the item (e.g. target already exists).
    Skipped,
}

/// The host's content-writing layer.
#[async_trait]
pub trait ContentSink: Send {
    async fn write_site_config(&mut self, config: &SiteConfig) -> Result<()>;

    async fn write_item(&mut self, item: ContentItem) -> Result<WriteOutcome>;
}

/// Counts for one completed run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub posts: u64,
    pub pages: u64,
    pub attachments: u64,
    pub written: u64,
    pub skipped: u64,
}

impl ImportSummary {
    fn record(&mut self, item: &ContentItem) {
        match item.type_name() {
            "attachment" => self.attachments += 1,
            "page" => self.pages += 1,
            _ => self.posts += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.posts + self.pages + self.attachments
    }
}

/// Drive `driver` through its lifecycle into `sink`.
///
/// `close` runs on every exit path once `open` has succeeded. An error from
/// the run itself takes precedence over an error from `close`.
pub async fn run_import<D: ImportDriver + ?Sized>(
    driver: &D,
    sink: &mut dyn ContentSink,
) -> Result<ImportSummary> {
    let mut ctx = driver.open().await?;
    let outcome = drive(driver, &mut ctx, sink).await;
    let closed = driver.close(&mut ctx).await;
    let summary = outcome?;
    closed?;
    Ok(summary)
}

async fn drive<D: ImportDriver + ?Sized>(
    driver: &D,
    ctx: &mut D::Context,
    sink: &mut dyn ContentSink,
) -> Result<ImportSummary> {
    let site = driver.site_config(ctx).await?;
    sink.write_site_config(&site).await?;

    let mut summary = ImportSummary::default();
    let mut items = driver.list_content(ctx).await?;
    while let Some(item) = items.next_item().await? {
        summary.record(&item);
        match sink.write_item(item).await? {
            WriteOutcome::Written => summary.written += 1,
            WriteOutcome::Skipped => summary.skipped += 1,
        }
    }
    Ok(summary)
}

// ═══════════════════════════════════════════════════════════════════════
// Importer + Registry
// ═══════════════════════════════════════════════════════════════════════

/// Object-safe view of an importer, as stored in [`ImporterRegistry`].
#[async_trait]
pub trait Importer: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    async fn import(&self, sink: &mut dyn ContentSink) -> Result<ImportSummary>;
}

#[async_trait]
impl<D> Importer for D
where
    D: ImportDriver,
{
    fn name(&self) -> &str {
        ImportDriver::name(self)
    }

    fn description(&self) -> &str {
        ImportDriver::description(self)
    }

    async fn import(&self, sink: &mut dyn ContentSink) -> Result<ImportSummary> {
        run_import(self, sink).await
    }
}

/// Registry of importers discoverable by name.
pub struct ImporterRegistry {
    importers: Vec<Box<dyn Importer>>,
}

impl ImporterRegistry {
    /// Create an empty importer registry.
    pub fn new() -> Self {
        Self {
            importers: Vec::new(),
        }
    }

    /// Create a registry holding the built-in `wordpress-sql` importer.
    pub fn with_builtins(args: ImportArgs, diagnostics: Arc<dyn Diagnostics>) -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(WordpressSqlImporter::new(args, diagnostics)));
        registry
    }

    /// Register an importer.
    pub fn register(&mut self, importer: Box<dyn Importer>) {
        self.importers.push(importer);
    }

    /// Get all registered importers.
    pub fn importers(&self) -> &[Box<dyn Importer>] {
        &self.importers
    }

    /// Find an importer by name.
    pub fn find(&self, name: &str) -> Option<&dyn Importer> {
        self.importers
            .iter()
            .find(|i| i.name() == name)
            .map(|i| i.as_ref())
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.importers.is_empty()
    }

    /// Return the count of registered importers.
    pub fn len(&self) -> usize {
        self.importers.len()
    }
}

impl Default for ImporterRegistry {
    fn default() -> Self {
        Self::new()
    }
}
