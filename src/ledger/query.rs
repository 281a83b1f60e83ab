//! Transaction query construction.
//!
//! [`QueryFilter`] describes *what* to look for (owners, ids, tags, sort);
//! [`QueryBuilder`] adds the page window (cursor, page size) and validates the
//! combination into an immutable [`QueryDescriptor`]. The descriptor renders to
//! a GraphQL request body but also exposes its typed filter, so executors that
//! do not speak GraphQL can interpret it directly.

use serde::Serialize;
use serde_json::{Map, Value, json};
use std::fmt;
use std::str::FromStr;

use crate::constants::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

/// Errors raised while building a query.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error("invalid sort order '{0}' (expected 'oldest' or 'newest')")]
    InvalidSortOrder(String),

    #[error("page size {0} out of range (1-100)")]
    InvalidPageSize(usize),

    #[error("tag filter with an empty name")]
    EmptyTagName,

    #[error("tag filter '{0}' has no values")]
    EmptyTagValues(String),
}

/// Result ordering by block height.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum SortOrder {
    #[default]
    OldestFirst,
    NewestFirst,
}

impl SortOrder {
    /// Gateway enum literal.
    pub const fn as_gql(self) -> &'static str {
        match self {
            Self::OldestFirst => "HEIGHT_ASC",
            Self::NewestFirst => "HEIGHT_DESC",
        }
    }
}

impl FromStr for SortOrder {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "oldest" | "oldest_first" | "asc" | "height_asc" => Ok(Self::OldestFirst),
            "newest" | "newest_first" | "desc" | "height_desc" => Ok(Self::NewestFirst),
            _ => Err(QueryError::InvalidSortOrder(s.to_string())),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OldestFirst => f.write_str("oldest"),
            Self::NewestFirst => f.write_str("newest"),
        }
    }
}

/// Match transactions carrying tag `name` with any of `values`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagFilter {
    pub name: String,
    pub values: Vec<String>,
}

impl TagFilter {
    pub fn matches(&self, name: &str, value: &str) -> bool {
        self.name == name && self.values.iter().any(|v| v == value)
    }
}

/// Filter part of a query, independent of pagination.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueryFilter {
    pub owners: Vec<String>,
    pub ids: Vec<String>,
    pub tags: Vec<TagFilter>,
    pub sort: SortOrder,
}

impl QueryFilter {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn owner(mut self, owner: impl Into<String>) -> Self {
        self.owners.push(owner.into());
        self
    }

    #[must_use]
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.ids.push(id.into());
        self
    }

    #[must_use]
    pub fn tag(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.tag_any(name, [value.into()])
    }

    /// Match any of `values` for tag `name`.
    #[must_use]
    pub fn tag_any<I, S>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.push(TagFilter {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
        });
        self
    }

    #[must_use]
    pub fn sort(mut self, sort: SortOrder) -> Self {
        self.sort = sort;
        self
    }

    /// True when neither owner, id nor tag constrain the query.
    pub fn is_unfiltered(&self) -> bool {
        self.owners.is_empty() && self.ids.is_empty() && self.tags.is_empty()
    }

    fn validate(&self) -> Result<(), QueryError> {
        for tag in &self.tags {
            if tag.name.is_empty() {
                return Err(QueryError::EmptyTagName);
            }
            if tag.values.is_empty() {
                return Err(QueryError::EmptyTagValues(tag.name.clone()));
            }
        }
        Ok(())
    }
}

/// Builds a validated [`QueryDescriptor`].
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    filter: QueryFilter,
    cursor: Option<String>,
    page_size: usize,
}

impl Default for QueryBuilder {
    fn default() -> Self {
        Self::from_filter(QueryFilter::default())
    }
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_filter(filter: QueryFilter) -> Self {
        Self {
            filter,
            cursor: None,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    #[must_use]
    pub fn owner(mut self, owner: impl Into<String>) -> Self {
        self.filter = self.filter.owner(owner);
        self
    }

    #[must_use]
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.filter = self.filter.id(id);
        self
    }

    #[must_use]
    pub fn tag(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.filter = self.filter.tag(name, value);
        self
    }

    #[must_use]
    pub fn tag_any<I, S>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filter = self.filter.tag_any(name, values);
        self
    }

    #[must_use]
    pub fn sort(mut self, sort: SortOrder) -> Self {
        self.filter = self.filter.sort(sort);
        self
    }

    /// Resume after the edge carrying `cursor`.
    #[must_use]
    pub fn cursor(mut self, cursor: Option<String>) -> Self {
        self.cursor = cursor;
        self
    }

    #[must_use]
    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Validate and freeze the query.
    ///
    /// # Errors
    ///
    /// Returns an error if the page size is outside `1..=100` or a tag filter
    /// is empty. An unfiltered query is *not* an error; check
    /// [`QueryDescriptor::is_unfiltered`] and warn.
    pub fn build(self) -> Result<QueryDescriptor, QueryError> {
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(QueryError::InvalidPageSize(self.page_size));
        }
        self.filter.validate()?;
        Ok(QueryDescriptor {
            filter: self.filter,
            cursor: self.cursor,
            first: self.page_size,
        })
    }
}

const TRANSACTIONS_QUERY: &str = "query Transactions($owners: [String!], $ids: [ID!], \
$tags: [TagFilter!], $first: Int, $after: String, $sort: SortOrder) { \
transactions(owners: $owners, ids: $ids, tags: $tags, first: $first, after: $after, sort: $sort) { \
pageInfo { hasNextPage } \
edges { cursor node { id owner { address } recipient fee { winston ar } quantity { winston ar } \
data { size type } tags { name value } block { height timestamp } } } } }";

/// One page request, ready for a query executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryDescriptor {
    filter: QueryFilter,
    cursor: Option<String>,
    first: usize,
}

impl QueryDescriptor {
    pub fn filter(&self) -> &QueryFilter {
        &self.filter
    }

    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }

    /// Requested page size.
    pub fn first(&self) -> usize {
        self.first
    }

    pub fn is_unfiltered(&self) -> bool {
        self.filter.is_unfiltered()
    }

    /// GraphQL request body (`{"query": .., "variables": ..}`).
    ///
    /// Empty filter lists are omitted rather than sent as `[]`.
    pub fn to_request_body(&self) -> Value {
        let mut variables = Map::new();
        if !self.filter.owners.is_empty() {
            variables.insert("owners".into(), json!(self.filter.owners));
        }
        if !self.filter.ids.is_empty() {
            variables.insert("ids".into(), json!(self.filter.ids));
        }
        if !self.filter.tags.is_empty() {
            variables.insert("tags".into(), json!(self.filter.tags));
        }
        if let Some(cursor) = &self.cursor {
            variables.insert("after".into(), json!(cursor));
        }
        variables.insert("first".into(), json!(self.first));
        variables.insert("sort".into(), json!(self.filter.sort.as_gql()));

        json!({
            "query": TRANSACTIONS_QUERY,
            "variables": variables,
        })
    }
}
