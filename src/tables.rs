//! Prefix-qualified WordPress table descriptors and the statements built from them.
//!
//! The column set of each table is fixed. Relations (`posts.post_author →
//! users.ID`, `term_relationships.term_taxonomy_id →
//! term_taxonomy.term_taxonomy_id`, `term_taxonomy.term_id → terms.term_id`)
//! only shape the joins below; nothing here enforces them.
//!
//! Every column is read through a `CAST` so that one statement decodes the same
//! way through the `Any` driver on MySQL (unsigned BIGINT, DATETIME, LONGTEXT)
//! and on SQLite.

use crate::config::is_valid_prefix;
use crate::error::{ImportError, Result};

/// How a column is projected in a `SELECT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    Text,
    Timestamp,
}

#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnKind,
    /// Result-set name; differs from `name` only for `ID`.
    pub alias: &'static str,
}

const fn int(name: &'static str) -> Column {
    Column {
        name,
        kind: ColumnKind::Integer,
        alias: name,
    }
}

const fn text(name: &'static str) -> Column {
    Column {
        name,
        kind: ColumnKind::Text,
        alias: name,
    }
}

const ID: Column = Column {
    name: "ID",
    kind: ColumnKind::Integer,
    alias: "id",
};

pub const OPTIONS_COLUMNS: &[Column] = &[text("option_name"), text("option_value")];

pub const USERS_COLUMNS: &[Column] = &[
    ID,
    text("user_login"),
    text("user_nicename"),
    text("user_email"),
    text("user_url"),
    text("display_name"),
];

pub const POSTS_COLUMNS: &[Column] = &[
    ID,
    int("post_author"),
    Column {
        name: "post_date",
        kind: ColumnKind::Timestamp,
        alias: "post_date",
    },
    text("post_content"),
    text("post_title"),
    text("post_excerpt"),
    text("post_status"),
    text("post_name"),
    text("guid"),
    text("post_type"),
];

pub const TERM_RELATIONSHIPS_COLUMNS: &[Column] = &[int("object_id"), int("term_taxonomy_id")];

pub const TERM_TAXONOMY_COLUMNS: &[Column] = &[
    int("term_taxonomy_id"),
    int("term_id"),
    text("taxonomy"),
    text("description"),
    int("parent"),
];

pub const TERMS_COLUMNS: &[Column] = &[
    int("term_id"),
    text("name"),
    text("slug"),
    int("term_group"),
];

/// A table name bound to its fixed column set.
#[derive(Debug, Clone)]
pub struct Table {
    pub name: String,
    pub columns: &'static [Column],
}

impl Table {
    fn new(prefix: &str, base: &str, columns: &'static [Column]) -> Self {
        Self {
            name: format!("{}{}", prefix, base),
            columns,
        }
    }

    fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// `CAST(<qualifier>.<col> AS ...) AS <alias>` for the requested columns.
    fn projection(&self, qualifier: &str, names: &[&str]) -> Vec<String> {
        names
            .iter()
            .filter_map(|n| self.column(n))
            .map(|c| project(qualifier, c))
            .collect()
    }

    fn full_projection(&self, qualifier: &str) -> String {
        self.columns
            .iter()
            .map(|c| project(qualifier, c))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn project(qualifier: &str, column: &Column) -> String {
    let target = match column.kind {
        ColumnKind::Integer => "SIGNED",
        ColumnKind::Text | ColumnKind::Timestamp => "CHAR",
    };
    format!(
        "CAST({}.{} AS {}) AS {}",
        qualifier, column.name, target, column.alias
    )
}

/// The six WordPress tables, qualified by a table prefix.
#[derive(Debug, Clone)]
pub struct WordpressTables {
    pub options: Table,
    pub users: Table,
    pub posts: Table,
    pub term_relationships: Table,
    pub term_taxonomy: Table,
    pub terms: Table,
}

impl WordpressTables {
    pub fn new(prefix: &str) -> Result<Self> {
        if !is_valid_prefix(prefix) {
            return Err(ImportError::InvalidPrefix(prefix.to_string()));
        }
        Ok(Self {
            options: Table::new(prefix, "options", OPTIONS_COLUMNS),
            users: Table::new(prefix, "users", USERS_COLUMNS),
            posts: Table::new(prefix, "posts", POSTS_COLUMNS),
            term_relationships: Table::new(
                prefix,
                "term_relationships",
                TERM_RELATIONSHIPS_COLUMNS,
            ),
            term_taxonomy: Table::new(prefix, "term_taxonomy", TERM_TAXONOMY_COLUMNS),
            terms: Table::new(prefix, "terms", TERMS_COLUMNS),
        })
    }

    /// Equality lookup on `option_name`; binds one parameter.
    pub fn select_option(&self) -> String {
        format!(
            "SELECT {} FROM {} o WHERE o.option_name = ?",
            self.options.full_projection("o"),
            self.options.name
        )
    }

    pub fn select_users(&self) -> String {
        format!(
            "SELECT {} FROM {} u",
            self.users.full_projection("u"),
            self.users.name
        )
    }

    /// Lookup by `ID`; binds one parameter.
    pub fn select_user_by_id(&self) -> String {
        format!("{} WHERE u.ID = ?", self.select_users())
    }

    pub fn select_posts(&self) -> String {
        format!(
            "SELECT {} FROM {} p",
            self.posts.full_projection("p"),
            self.posts.name
        )
    }

    /// `term_relationships ⋈ term_taxonomy ⋈ terms` without a filter.
    pub fn select_terms(&self) -> String {
        let mut projection = self.term_relationships.projection("tr", &["object_id"]);
        projection.extend(self.term_taxonomy.projection("tt", &["taxonomy"]));
        projection.extend(self.terms.projection("t", &["name", "slug"]));
        format!(
            "SELECT {} FROM {} tr \
             INNER JOIN {} tt ON tr.term_taxonomy_id = tt.term_taxonomy_id \
             INNER JOIN {} t ON tt.term_id = t.term_id",
            projection.join(", "),
            self.term_relationships.name,
            self.term_taxonomy.name,
            self.terms.name
        )
    }

    /// The join filtered to one post; binds one parameter.
    pub fn select_terms_for_object(&self) -> String {
        format!("{} WHERE tr.object_id = ?", self.select_terms())
    }
}
