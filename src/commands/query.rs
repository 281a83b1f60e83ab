//! `arscan query` - list raw transactions.

use anyhow::{Context, Result};
use clap::Args;
use tracing::warn;

use arscan::ledger::{QueryBuilder, QueryFilter, SortOrder};
use arscan::report::{self, OutputFormat};

use super::{Session, emit};

#[derive(Args, Debug)]
pub struct QueryArgs {
    /// Owner address (repeatable)
    #[arg(long)]
    pub owner: Vec<String>,

    /// Transaction id (repeatable)
    #[arg(long)]
    pub id: Vec<String>,

    /// Tag filter as name=value; repeating a name matches any of its values
    #[arg(long = "tag", value_parser = parse_tag)]
    pub tags: Vec<(String, String)>,

    /// Sort order: newest or oldest
    #[arg(long, default_value = "newest")]
    pub sort: SortOrder,

    /// Stop after this many transactions
    #[arg(long)]
    pub limit: Option<usize>,

    /// Transactions per gateway request (1-100)
    #[arg(long)]
    pub page_size: Option<usize>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

fn parse_tag(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        },
        _ => Err(format!("expected name=value, got '{raw}'")),
    }
}

impl QueryArgs {
    fn filter(&self) -> QueryFilter {
        let mut grouped: Vec<(&str, Vec<&str>)> = Vec::new();
        for (name, value) in &self.tags {
            match grouped.iter_mut().find(|(n, _)| *n == name.as_str()) {
                Some((_, values)) => values.push(value.as_str()),
                None => grouped.push((name.as_str(), vec![value.as_str()])),
            }
        }

        let mut filter = QueryFilter::new().sort(self.sort);
        for owner in &self.owner {
            filter = filter.owner(owner);
        }
        for id in &self.id {
            filter = filter.id(id);
        }
        for (name, values) in grouped {
            filter = filter.tag_any(name, values);
        }
        filter
    }
}

/// Execute the query command.
pub async fn execute(session: &Session, args: QueryArgs) -> Result<()> {
    let filter = args.filter();
    let mut fetcher = session.fetcher();
    if let Some(page_size) = args.page_size {
        fetcher = fetcher.with_page_size(page_size);
    }

    // Surface invalid filters or page sizes before any request is made.
    QueryBuilder::from_filter(filter.clone())
        .page_size(fetcher.page_size())
        .build()
        .context("Invalid query")?;

    let outcome = fetcher.fetch(&filter, args.limit).await;

    let output = match args.format {
        OutputFormat::Text => report::render_entries_text(&outcome.entries),
        OutputFormat::Csv => report::render_entries_csv(&outcome.entries),
        OutputFormat::Json => {
            report::render_json(&outcome.entries).context("Failed to encode transactions")?
        },
    };
    emit(&output);

    if !outcome.succeeded {
        warn!(
            fetched = outcome.entries.len(),
            pages = outcome.pages,
            "Result set is incomplete"
        );
        anyhow::bail!(
            "Query stopped early after {} transaction(s)",
            outcome.entries.len()
        );
    }
    Ok(())
}
