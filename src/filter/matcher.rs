//! Client-side matching
//!
//! Applies the parts of a [`FilterDefinition`] the query service cannot
//! evaluate: name and ip regular expressions, date expressions, metadata
//! values, and latest/earliest selection. All conditions must hold.

use super::criteria::{
    FilterDefinition, MetadataCriterion, FILTER_DATE, FILTER_EARLIEST, FILTER_IP, FILTER_LATEST,
};
use super::date::{compare_date, parse_rfc3339};
use super::error::FilterError;
use crate::vcd::query::QueryItem;
use anyhow::Result;
use regex::Regex;

fn compile(filter: &str, expression: &str) -> Result<Regex> {
    Regex::new(expression).map_err(|e| {
        FilterError::InvalidRegex {
            filter: filter.to_string(),
            expression: expression.to_string(),
            reason: e.to_string(),
        }
        .into()
    })
}

/// Compiled form of the client-side conditions
struct Conditions<'a> {
    name: Option<Regex>,
    ip: Option<Regex>,
    date: Option<&'a str>,
    metadata: Vec<(&'a MetadataCriterion, Regex)>,
}

impl<'a> Conditions<'a> {
    fn new(criteria: &'a FilterDefinition) -> Result<Self> {
        let name = criteria
            .name_regex()
            .map(|r| compile("name_regex", r))
            .transpose()?;
        let ip = criteria.ip().map(|r| compile("ip", r)).transpose()?;
        let metadata = criteria
            .client_side_metadata()
            .iter()
            .map(|md| Ok::<_, anyhow::Error>((md, compile("metadata value", &md.value_string())?)))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            name,
            ip,
            date: criteria.date_expression(),
            metadata,
        })
    }

    fn matches<I: QueryItem>(&self, item: &I) -> Result<bool> {
        if let Some(re) = &self.name {
            if !re.is_match(item.name()) {
                return Ok(false);
            }
        }

        if let Some(re) = &self.ip {
            let ip = item.ip().ok_or_else(|| FilterError::NotApplicable {
                filter: FILTER_IP.to_string(),
                item_type: item.item_type(),
            })?;
            if !re.is_match(ip) {
                return Ok(false);
            }
        }

        if let Some(expression) = self.date {
            let date = item_date(item, FILTER_DATE)?;
            if !compare_date(expression, date)? {
                return Ok(false);
            }
        }

        for (md, re) in &self.metadata {
            match item.metadata_value(&md.key, md.is_system) {
                Some(value) if re.is_match(&value) => {}
                _ => return Ok(false),
            }
        }

        Ok(true)
    }
}

/// Creation date of `item`, or a not-applicable error naming `filter`
fn item_date<'i, I: QueryItem>(item: &'i I, filter: &str) -> Result<&'i str> {
    item.date().ok_or_else(|| {
        FilterError::NotApplicable {
            filter: filter.to_string(),
            item_type: item.item_type(),
        }
        .into()
    })
}

/// Keep the items satisfying every condition, then apply latest/earliest selection
pub fn apply_filter<I: QueryItem>(items: Vec<I>, criteria: &FilterDefinition) -> Result<Vec<I>> {
    let conditions = Conditions::new(criteria)?;

    let mut matched = Vec::with_capacity(items.len());
    for item in items {
        if conditions.matches(&item)? {
            matched.push(item);
        }
    }

    if criteria.latest() || criteria.earliest() {
        matched = select_by_date(matched, criteria.latest())?;
    }

    Ok(matched)
}

/// Reduce to the newest (or oldest) item by creation date
fn select_by_date<I: QueryItem>(items: Vec<I>, newest: bool) -> Result<Vec<I>> {
    let filter = if newest { FILTER_LATEST } else { FILTER_EARLIEST };
    let mut best: Option<(chrono::DateTime<chrono::Utc>, I)> = None;

    for item in items {
        let date = parse_rfc3339(item_date(&item, filter)?)?;
        let better = match &best {
            None => true,
            Some((best_date, _)) if newest => date > *best_date,
            Some((best_date, _)) => date < *best_date,
        };
        if better {
            best = Some((date, item));
        }
    }

    Ok(best.map(|(_, item)| vec![item]).unwrap_or_default())
}
