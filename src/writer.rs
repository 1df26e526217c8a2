//! Content sinks that turn imported items into site source files.
//!
//! [`SiteWriter`] lays the site out as:
//!
//! ```text
//! <root>/config.toml                 [site] title, description, authors
//! <root>/posts/2015-06-01_hello.html front matter + content
//! <root>/pages/about.html
//! <root>/attachments.txt             one attachment URL per line
//! <root>/assets/...                  downloaded attachments (optional)
//! ```
//!
//! Each post or page file starts with TOML front matter between `+++` lines.
//! [`DryRunSink`] accepts everything and writes nothing.

use std::collections::{BTreeMap, HashSet};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tokio::io::AsyncWriteExt;

use crate::config::OutputConfig;
use crate::diagnostics::Diagnostics;
use crate::error::{ImportError, Result};
use crate::models::{ContentItem, PostInfo, PostKind, SiteConfig};
use crate::traits::{ContentSink, WriteOutcome};

pub const SITE_CONFIG_FILE: &str = "config.toml";
pub const ATTACHMENTS_FILE: &str = "attachments.txt";

#[derive(Serialize)]
struct SiteFile<'a> {
    site: &'a SiteConfig,
}

#[derive(Serialize)]
struct FrontMatter<'a> {
    title: &'a str,
    #[serde(skip_serializing_if = "is_blank")]
    author: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    time: Option<String>,
    status: &'a str,
    id: i64,
    guid: &'a str,
    categories: &'a [String],
    #[serde(skip_serializing_if = "is_blank")]
    excerpt: &'a str,
    #[serde(skip_serializing_if = "is_empty_map")]
    metadata: &'a BTreeMap<String, String>,
}

fn is_blank(s: &&str) -> bool {
    s.is_empty()
}

fn is_empty_map(m: &&BTreeMap<String, String>) -> bool {
    m.is_empty()
}

/// Render a post or page as front matter followed by its content.
pub fn render_post(info: &PostInfo) -> Result<String> {
    let front = FrontMatter {
        title: &info.title,
        author: &info.author,
        time: info
            .datetime
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string()),
        status: &info.status,
        id: info.post_id,
        guid: &info.post_guid,
        categories: &info.categories,
        excerpt: &info.excerpt,
        metadata: &info.metadata,
    };
    let header = toml::to_string(&front)
        .map_err(|e| ImportError::Output(format!("cannot render front matter: {}", e)))?;
    Ok(format!("+++\n{}+++\n{}\n", header, info.content))
}

/// Relative path of the file a post or page is written to.
pub fn post_path(info: &PostInfo) -> PathBuf {
    let slug = sanitize_slug(&info.slug);
    let slug = if slug.is_empty() {
        format!("{}-{}", info.kind.as_str(), info.post_id)
    } else {
        slug
    };
    match info.kind {
        PostKind::Post => {
            let name = match info.datetime {
                Some(dt) => format!("{}_{}.html", dt.format("%Y-%m-%d"), slug),
                None => format!("{}.html", slug),
            };
            Path::new("posts").join(name)
        }
        PostKind::Page => Path::new("pages").join(format!("{}.html", slug)),
    }
}

fn sanitize_slug(slug: &str) -> String {
    slug.trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '_' | '%' | '.') {
                c
            } else {
                '-'
            }
        })
        .collect::<String>()
        .trim_matches('.')
        .to_string()
}

/// Relative path under `assets/` for an attachment URL, if it is safe to use.
pub fn asset_path(url: &str) -> Option<PathBuf> {
    let parsed = url::Url::parse(url).ok()?;
    let relative = Path::new(parsed.path().trim_start_matches('/'));
    if relative.as_os_str().is_empty()
        || relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
    {
        return None;
    }
    Some(Path::new("assets").join(relative))
}

/// Writes the imported site into a directory.
pub struct SiteWriter {
    root: PathBuf,
    overwrite: bool,
    client: Option<reqwest::Client>,
    diagnostics: Arc<dyn Diagnostics>,
    /// URLs already in `attachments.txt`; loaded on the first attachment.
    listed: Option<HashSet<String>>,
}

impl SiteWriter {
    pub fn new(output: &OutputConfig, diagnostics: Arc<dyn Diagnostics>) -> Self {
        Self {
            root: output.dir.clone(),
            overwrite: output.overwrite,
            client: output.download_attachments.then(reqwest::Client::new),
            diagnostics,
            listed: None,
        }
    }

    /// Write `contents` to `relative` unless it exists and overwriting is off.
    async fn write_file(&self, relative: &Path, contents: &[u8]) -> Result<WriteOutcome> {
        let path = self.root.join(relative);
        if !self.overwrite && tokio::fs::try_exists(&path).await.unwrap_or(false) {
            self.diagnostics
                .warn(&format!("Skipping existing file: {}", path.display()));
            return Ok(WriteOutcome::Skipped);
        }
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ImportError::io(parent, e))?;
        }
        tokio::fs::write(&path, contents)
            .await
            .map_err(|e| ImportError::io(&path, e))?;
        self.diagnostics
            .debug(&format!("Wrote {}", path.display()));
        Ok(WriteOutcome::Written)
    }

    /// URLs listed so far. With `overwrite` the list is truncated first, so
    /// it only ever holds this run's attachments.
    async fn listed_attachments(&mut self) -> Result<&mut HashSet<String>> {
        if self.listed.is_none() {
            let path = self.root.join(ATTACHMENTS_FILE);
            let listed = if self.overwrite {
                tokio::fs::create_dir_all(&self.root)
                    .await
                    .map_err(|e| ImportError::io(&self.root, e))?;
                tokio::fs::write(&path, b"")
                    .await
                    .map_err(|e| ImportError::io(&path, e))?;
                HashSet::new()
            } else {
                match tokio::fs::read_to_string(&path).await {
                    Ok(body) => body.lines().map(str::to_string).collect(),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashSet::new(),
                    Err(e) => return Err(ImportError::io(&path, e)),
                }
            };
            self.listed = Some(listed);
        }
        Ok(self.listed.get_or_insert_with(HashSet::new))
    }

    /// Append `url` to `attachments.txt` unless it is already listed.
    async fn record_attachment(&mut self, url: &str) -> Result<WriteOutcome> {
        if self.listed_attachments().await?.contains(url) {
            self.diagnostics
                .debug(&format!("Skipping listed attachment: {}", url));
            return Ok(WriteOutcome::Skipped);
        }
        let path = self.root.join(ATTACHMENTS_FILE);
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| ImportError::io(&self.root, e))?;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| ImportError::io(&path, e))?;
        file.write_all(format!("{}\n", url).as_bytes())
            .await
            .map_err(|e| ImportError::io(&path, e))?;
        self.listed_attachments().await?.insert(url.to_string());
        Ok(WriteOutcome::Written)
    }

    async fn download(&self, client: &reqwest::Client, url: &str) -> Result<WriteOutcome> {
        let Some(relative) = asset_path(url) else {
            self.diagnostics
                .warn(&format!("Cannot derive a local path for attachment: {}", url));
            return Ok(WriteOutcome::Skipped);
        };

        let response = match client.get(url).send().await {
            Ok(r) => r,
            Err(e) => {
                self.diagnostics
                    .warn(&format!("Failed to download {}: {}", url, e));
                return Ok(WriteOutcome::Skipped);
            }
        };
        if !response.status().is_success() {
            self.diagnostics.warn(&format!(
                "Failed to download {}: HTTP {}",
                url,
                response.status()
            ));
            return Ok(WriteOutcome::Skipped);
        }
        match response.bytes().await {
            Ok(body) => self.write_file(&relative, &body).await,
            Err(e) => {
                self.diagnostics
                    .warn(&format!("Failed to download {}: {}", url, e));
                Ok(WriteOutcome::Skipped)
            }
        }
    }
}

#[async_trait]
impl ContentSink for SiteWriter {
    async fn write_site_config(&mut self, config: &SiteConfig) -> Result<()> {
        let body = toml::to_string(&SiteFile { site: config })
            .map_err(|e| ImportError::Output(format!("cannot render site config: {}", e)))?;
        self.write_file(Path::new(SITE_CONFIG_FILE), body.as_bytes())
            .await?;
        Ok(())
    }

    async fn write_item(&mut self, item: ContentItem) -> Result<WriteOutcome> {
        match item {
            ContentItem::Attachment { url } => {
                if self.record_attachment(&url).await? == WriteOutcome::Skipped {
                    return Ok(WriteOutcome::Skipped);
                }
                match &self.client {
                    Some(client) => self.download(client, &url).await,
                    None => Ok(WriteOutcome::Written),
                }
            }
            ContentItem::Post(info) => {
                let rendered = render_post(&info)?;
                self.write_file(&post_path(&info), rendered.as_bytes())
                    .await
            }
        }
    }
}

/// Accepts every item without writing anything.
///
/// With `print` set, each item is echoed to stdout as one JSON line.
#[derive(Debug, Default)]
pub struct DryRunSink {
    pub print: bool,
}

#[async_trait]
impl ContentSink for DryRunSink {
    async fn write_site_config(&mut self, config: &SiteConfig) -> Result<()> {
        if self.print {
            let line = serde_json::to_string(config)
                .map_err(|e| ImportError::Output(e.to_string()))?;
            println!("{}", line);
        }
        Ok(())
    }

    async fn write_item(&mut self, item: ContentItem) -> Result<WriteOutcome> {
        if self.print {
            let line =
                serde_json::to_string(&item).map_err(|e| ImportError::Output(e.to_string()))?;
            println!("{}", line);
        }
        Ok(WriteOutcome::Skipped)
    }
}
