//! Ledger access: transaction entries, query construction and pagination.

pub mod entry;
pub mod fetcher;
pub mod query;

pub use entry::{Amount, Confirmation, Entry, Tag};
pub use fetcher::{FetchOutcome, PaginatedFetcher};
pub use query::{QueryBuilder, QueryDescriptor, QueryError, QueryFilter, SortOrder, TagFilter};
