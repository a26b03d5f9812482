//! Filtered Entity Resolver
//!
//! Runs a search for one entity kind and enforces that exactly one item
//! matches. Everything entity-specific comes from the [`FilteredSearcher`].

use super::criteria::{build_criteria, FilterConfig, FilterDefinition};
use super::error::FilterError;
use crate::vcd::query::{QueryItem, QueryType};
use anyhow::Result;

/// Search capability for one entity kind
#[allow(async_fn_in_trait)]
pub trait FilteredSearcher {
    type Item: QueryItem;

    /// Return the matching items and a human-readable explanation of the search
    async fn search(
        &self,
        query_type: QueryType,
        criteria: &FilterDefinition,
    ) -> Result<(Vec<Self::Item>, String)>;
}

/// Resolve a filter block to exactly one query item
pub async fn get_entity_by_filter<S: FilteredSearcher>(
    searcher: &S,
    query_type: QueryType,
    label: &str,
    filter: &FilterConfig,
) -> Result<S::Item> {
    let criteria = build_criteria(filter)?;

    let (mut items, explanation) = searcher.search(query_type, &criteria).await?;

    tracing::debug!(
        "{} search ({}) returned {} items",
        label,
        explanation,
        items.len()
    );

    match items.len() {
        0 => Err(FilterError::NoMatch {
            label: label.to_string(),
            explanation,
        }
        .into()),
        1 => Ok(items.remove(0)),
        _ => Err(FilterError::MultipleMatches {
            label: label.to_string(),
            names: items.iter().map(|i| i.name().to_string()).collect(),
        }
        .into()),
    }
}
