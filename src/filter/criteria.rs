//! Criteria Builder
//!
//! Turns a filter block from configuration into a [`FilterDefinition`], the
//! structured criteria handed to an inventory search.

use super::error::FilterError;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

pub const FILTER_NAME_REGEX: &str = "name_regex";
pub const FILTER_IP: &str = "ip";
pub const FILTER_DATE: &str = "date";
pub const FILTER_LATEST: &str = "latest";
pub const FILTER_EARLIEST: &str = "earliest";

const SUPPORTED_FILTERS: &[&str] = &[
    FILTER_NAME_REGEX,
    FILTER_IP,
    FILTER_DATE,
    FILTER_LATEST,
    FILTER_EARLIEST,
];

/// Metadata type tag used when an entry names none
pub const DEFAULT_METADATA_TYPE: &str = "STRING";

/// One `metadata` entry of a filter block
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataConfig {
    pub key: String,
    #[serde(default)]
    pub value: Value,
    #[serde(default, rename = "type")]
    pub value_type: Option<String>,
    #[serde(default)]
    pub is_system: bool,
    #[serde(default)]
    pub use_api_search: Option<bool>,
}

/// A filter block as written in configuration.
/// Unknown keys are ignored when deserializing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    #[serde(default)]
    pub name_regex: Option<String>,
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub latest: Option<bool>,
    #[serde(default)]
    pub earliest: Option<bool>,
    #[serde(default)]
    pub metadata: Vec<MetadataConfig>,
}

/// One metadata constraint
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataCriterion {
    pub key: String,
    pub value: Value,
    pub value_type: String,
    pub is_system: bool,
}

impl MetadataCriterion {
    /// Value rendered the way it appears in query filters and results
    pub fn value_string(&self) -> String {
        match &self.value {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }

    /// Server-side query filter for this criterion
    pub fn api_filter(&self) -> String {
        format!(
            "{}=={}:{}",
            metadata_field(&self.key, self.is_system),
            self.value_type.to_uppercase(),
            self.value_string()
        )
    }
}

/// Query field name for a metadata key
pub fn metadata_field(key: &str, is_system: bool) -> String {
    if is_system {
        format!("metadata@SYSTEM:{}", key)
    } else {
        format!("metadata:{}", key)
    }
}

/// Structured search criteria.
/// Built once per lookup by [`build_criteria`] and read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterDefinition {
    filters: BTreeMap<String, String>,
    metadata: Vec<MetadataCriterion>,
    use_metadata_api_filter: bool,
}

impl FilterDefinition {
    /// Add a named filter; unknown names and repeated names are rejected
    pub(crate) fn add_filter(&mut self, key: &str, value: &str) -> Result<()> {
        if !SUPPORTED_FILTERS.contains(&key) {
            return Err(FilterError::UnsupportedFilter(key.to_string()).into());
        }
        if self.filters.contains_key(key) {
            return Err(FilterError::DuplicateFilter(key.to_string()).into());
        }
        self.filters.insert(key.to_string(), value.to_string());
        Ok(())
    }

    pub fn filter(&self, key: &str) -> Option<&str> {
        self.filters.get(key).map(|s| s.as_str())
    }

    pub fn name_regex(&self) -> Option<&str> {
        self.filter(FILTER_NAME_REGEX)
    }

    pub fn ip(&self) -> Option<&str> {
        self.filter(FILTER_IP)
    }

    pub fn date_expression(&self) -> Option<&str> {
        self.filter(FILTER_DATE)
    }

    pub fn latest(&self) -> bool {
        self.filter(FILTER_LATEST) == Some("true")
    }

    pub fn earliest(&self) -> bool {
        self.filter(FILTER_EARLIEST) == Some("true")
    }

    pub fn metadata(&self) -> &[MetadataCriterion] {
        &self.metadata
    }

    pub fn use_metadata_api_filter(&self) -> bool {
        self.use_metadata_api_filter
    }

    /// Metadata criteria that must be checked on the client
    pub fn client_side_metadata(&self) -> &[MetadataCriterion] {
        if self.use_metadata_api_filter {
            &[]
        } else {
            &self.metadata
        }
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty() && self.metadata.is_empty()
    }
}

impl fmt::Display for FilterDefinition {
    /// Human-readable rendering used as the search explanation
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = self
            .filters
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();

        for md in &self.metadata {
            parts.push(format!(
                "{}={}:{}",
                metadata_field(&md.key, md.is_system),
                md.value_type,
                md.value_string()
            ));
        }
        if !self.metadata.is_empty() {
            let mode = if self.use_metadata_api_filter { "api" } else { "client" };
            parts.push(format!("metadata_search={}", mode));
        }

        if parts.is_empty() {
            f.write_str("no criteria")
        } else {
            f.write_str(&parts.join(", "))
        }
    }
}

/// Convert metadata entries into criteria.
///
/// Returns the criteria and whether they should be pushed to the query API.
/// API search is enabled as soon as any entry asks for it. This is not
/// last-wins: a later `use_api_search: false` does not turn it back off,
/// so the outcome does not depend on entry order.
pub fn build_metadata_criteria(entries: &[MetadataConfig]) -> (Vec<MetadataCriterion>, bool) {
    let mut use_api_search = false;

    let criteria = entries
        .iter()
        .map(|entry| {
            if entry.use_api_search == Some(true) {
                use_api_search = true;
            }
            MetadataCriterion {
                key: entry.key.clone(),
                value: entry.value.clone(),
                value_type: entry
                    .value_type
                    .clone()
                    .filter(|t| !t.is_empty())
                    .unwrap_or_else(|| DEFAULT_METADATA_TYPE.to_string()),
                is_system: entry.is_system,
            }
        })
        .collect();

    (criteria, use_api_search)
}

/// Build search criteria from a filter block
pub fn build_criteria(filter: &FilterConfig) -> Result<FilterDefinition> {
    let mut criteria = FilterDefinition::default();

    if let Some(name_regex) = &filter.name_regex {
        criteria.add_filter(FILTER_NAME_REGEX, name_regex)?;
    }
    if let Some(ip) = &filter.ip {
        criteria.add_filter(FILTER_IP, ip)?;
    }
    if let Some(date) = &filter.date {
        criteria.add_filter(FILTER_DATE, date)?;
    }
    if let Some(latest) = filter.latest {
        criteria.add_filter(FILTER_LATEST, &latest.to_string())?;
    }
    if let Some(earliest) = filter.earliest {
        criteria.add_filter(FILTER_EARLIEST, &earliest.to_string())?;
    }

    if criteria.latest() && criteria.earliest() {
        return Err(FilterError::ConflictingFilters(
            FILTER_LATEST.to_string(),
            FILTER_EARLIEST.to_string(),
        )
        .into());
    }

    if !filter.metadata.is_empty() {
        let (metadata, use_api_search) = build_metadata_criteria(&filter.metadata);
        criteria.metadata = metadata;
        criteria.use_metadata_api_filter = use_api_search;
    }

    Ok(criteria)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn md(key: &str, value: Value, use_api_search: Option<bool>) -> MetadataConfig {
        MetadataConfig {
            key: key.to_string(),
            value,
            use_api_search,
            ..Default::default()
        }
    }

    #[test]
    fn test_build_criteria_stores_filters() {
        let filter = FilterConfig {
            name_regex: Some("^photon".into()),
            date: Some(">= 2020-01-01".into()),
            latest: Some(true),
            ..Default::default()
        };

        let criteria = build_criteria(&filter).unwrap();
        assert_eq!(criteria.name_regex(), Some("^photon"));
        assert_eq!(criteria.date_expression(), Some(">= 2020-01-01"));
        assert_eq!(criteria.filter(FILTER_LATEST), Some("true"));
        assert!(criteria.latest());
        assert!(criteria.ip().is_none());
        assert!(criteria.metadata().is_empty());
        assert!(!criteria.use_metadata_api_filter());
    }

    #[test]
    fn test_latest_false_is_stored_as_string() {
        let filter = FilterConfig {
            latest: Some(false),
            ..Default::default()
        };
        let criteria = build_criteria(&filter).unwrap();
        assert_eq!(criteria.filter(FILTER_LATEST), Some("false"));
        assert!(!criteria.latest());
    }

    #[test]
    fn test_latest_and_earliest_conflict() {
        let filter = FilterConfig {
            latest: Some(true),
            earliest: Some(true),
            ..Default::default()
        };
        let err = build_criteria(&filter).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<FilterError>(),
            Some(FilterError::ConflictingFilters(_, _))
        ));
    }

    #[test]
    fn test_add_filter_rejects_duplicates_and_unknown_names() {
        let mut criteria = FilterDefinition::default();
        criteria.add_filter(FILTER_IP, "10.0.0.1").unwrap();

        let err = criteria.add_filter(FILTER_IP, "10.0.0.2").unwrap_err();
        assert_eq!(err.to_string(), "filter 'ip' already defined");

        let err = criteria.add_filter("color", "blue").unwrap_err();
        assert_eq!(err.to_string(), "filter 'color' not supported");
    }

    #[test]
    fn test_metadata_criteria_defaults_type() {
        let entries = vec![MetadataConfig {
            key: "os".into(),
            value: json!("ubuntu"),
            value_type: None,
            is_system: true,
            use_api_search: None,
        }];

        let (criteria, use_api) = build_metadata_criteria(&entries);
        assert!(!use_api);
        assert_eq!(criteria.len(), 1);
        assert_eq!(criteria[0].value_type, DEFAULT_METADATA_TYPE);
        assert!(criteria[0].is_system);
        assert_eq!(criteria[0].api_filter(), "metadata@SYSTEM:os==STRING:ubuntu");
    }

    #[test]
    fn test_metadata_api_search_enabled_by_any_entry() {
        let entries = vec![
            md("a", json!("1"), Some(true)),
            md("b", json!("2"), Some(false)),
            md("c", json!("3"), None),
        ];

        let filter = FilterConfig {
            metadata: entries,
            ..Default::default()
        };
        let criteria = build_criteria(&filter).unwrap();
        assert!(criteria.use_metadata_api_filter());
        assert_eq!(criteria.metadata().len(), 3);
        assert!(criteria.client_side_metadata().is_empty());
    }

    #[test]
    fn test_unknown_keys_are_ignored_when_deserializing() {
        let filter: FilterConfig = serde_json::from_value(json!({
            "name_regex": "^db",
            "color": "blue"
        }))
        .unwrap();

        let criteria = build_criteria(&filter).unwrap();
        assert_eq!(criteria.name_regex(), Some("^db"));
    }

    #[test]
    fn test_explanation_lists_criteria() {
        let filter = FilterConfig {
            name_regex: Some("^gw".into()),
            metadata: vec![MetadataConfig {
                key: "env".into(),
                value: json!("prod"),
                value_type: Some("STRING".into()),
                ..Default::default()
            }],
            ..Default::default()
        };

        let criteria = build_criteria(&filter).unwrap();
        assert_eq!(
            criteria.to_string(),
            "name_regex=^gw, metadata:env=STRING:prod, metadata_search=client"
        );
        assert_eq!(FilterDefinition::default().to_string(), "no criteria");
    }
}
