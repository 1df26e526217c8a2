//! Typed row access to a WordPress database.
//!
//! The [`WordpressSource`] trait is the seam between the import logic and the
//! database. [`SqlSource`](crate::db::SqlSource) implements it over one live
//! connection; [`MemorySource`] implements it over plain vectors for tests and
//! fixtures.
//!
//! All methods take `&mut self`: a source wraps exactly one connection and
//! never runs two statements at once.

use async_trait::async_trait;

use crate::error::{ImportError, Result};
use crate::models::{PostRow, TermRow, UserRow};

#[async_trait]
pub trait WordpressSource: Send {
    /// `option_value` of the first options row named `name`, if any.
    async fn option_value(&mut self, name: &str) -> Result<Option<String>>;

    /// Every users row, in table scan order.
    async fn users(&mut self) -> Result<Vec<UserRow>>;

    /// The users row with `ID = id`, if any.
    async fn user_by_id(&mut self, id: i64) -> Result<Option<UserRow>>;

    /// Every posts row, in table scan order.
    async fn posts(&mut self) -> Result<Vec<PostRow>>;

    /// Joined term rows attached to one object, in join order.
    async fn terms_for_object(&mut self, object_id: i64) -> Result<Vec<TermRow>>;

    /// Joined term rows for every object, in join order.
    async fn all_terms(&mut self) -> Result<Vec<TermRow>>;

    /// Release the underlying connection. Calling it twice is harmless.
    async fn close(&mut self) -> Result<()>;
}

/// In-memory WordPress tables.
///
/// Rows are returned in insertion order. The term join is resolved eagerly:
/// callers add already-joined [`TermRow`]s.
#[derive(Debug, Default, Clone)]
pub struct MemorySource {
    pub options: Vec<(String, String)>,
    pub users: Vec<UserRow>,
    pub posts: Vec<PostRow>,
    pub terms: Vec<TermRow>,
    closed: bool,
    queries: usize,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_option(mut self, name: &str, value: &str) -> Self {
        self.options.push((name.to_string(), value.to_string()));
        self
    }

    pub fn with_user(mut self, user: UserRow) -> Self {
        self.users.push(user);
        self
    }

    pub fn with_post(mut self, post: PostRow) -> Self {
        self.posts.push(post);
        self
    }

    pub fn with_term(mut self, object_id: i64, taxonomy: &str, slug: &str) -> Self {
        self.terms.push(TermRow {
            object_id,
            taxonomy: taxonomy.to_string(),
            name: slug.to_string(),
            slug: slug.to_string(),
        });
        self
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Number of statements issued so far.
    pub fn query_count(&self) -> usize {
        self.queries
    }

    fn begin(&mut self, table: &str) -> Result<()> {
        if self.closed {
            return Err(ImportError::connection(format!(
                "connection closed before querying `{}`",
                table
            )));
        }
        self.queries += 1;
        Ok(())
    }
}

#[async_trait]
impl WordpressSource for MemorySource {
    async fn option_value(&mut self, name: &str) -> Result<Option<String>> {
        self.begin("options")?;
        Ok(self
            .options
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone()))
    }

    async fn users(&mut self) -> Result<Vec<UserRow>> {
        self.begin("users")?;
        Ok(self.users.clone())
    }

    async fn user_by_id(&mut self, id: i64) -> Result<Option<UserRow>> {
        self.begin("users")?;
        Ok(self.users.iter().find(|u| u.id == id).cloned())
    }

    async fn posts(&mut self) -> Result<Vec<PostRow>> {
        self.begin("posts")?;
        Ok(self.posts.clone())
    }

    async fn terms_for_object(&mut self, object_id: i64) -> Result<Vec<TermRow>> {
        self.begin("term_relationships")?;
        Ok(self
            .terms
            .iter()
            .filter(|t| t.object_id == object_id)
            .cloned()
            .collect())
    }

    async fn all_terms(&mut self) -> Result<Vec<TermRow>> {
        self.begin("term_relationships")?;
        Ok(self.terms.clone())
    }

    async fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}
