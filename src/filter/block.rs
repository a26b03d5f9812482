//! Untyped filter blocks
//!
//! Terraform hands nested blocks over as a list holding one map. These
//! helpers check that shape and convert it into a typed [`FilterConfig`].

use super::criteria::{FilterConfig, MetadataConfig};
use super::error::FilterError;
use anyhow::Result;
use serde_json::{Map, Value};

fn shape_error(msg: impl Into<String>) -> anyhow::Error {
    FilterError::InvalidBlock(msg.into()).into()
}

fn string_field(key: &str, value: &Value) -> Result<String> {
    value
        .as_str()
        .map(|s| s.to_string())
        .ok_or_else(|| shape_error(format!("'{}' must be a string, got {}", key, value)))
}

fn bool_field(key: &str, value: &Value) -> Result<bool> {
    value
        .as_bool()
        .ok_or_else(|| shape_error(format!("'{}' must be a boolean, got {}", key, value)))
}

impl FilterConfig {
    /// Parse a filter block (a list whose first element is a map).
    /// Only the first element is read; unknown keys are ignored.
    pub fn from_block(block: &Value) -> Result<Self> {
        let Some(list) = block.as_array() else {
            return Err(shape_error("filter is not a list"));
        };
        let Some(map) = list.first().and_then(|v| v.as_object()) else {
            return Err(shape_error("filter's first element is not a map"));
        };

        Self::from_map(map)
    }

    fn from_map(map: &Map<String, Value>) -> Result<Self> {
        let mut config = FilterConfig::default();

        for (key, value) in map {
            // Terraform sends unset attributes as null
            if value.is_null() {
                continue;
            }
            match key.as_str() {
                "name_regex" => config.name_regex = Some(string_field(key, value)?),
                "ip" => config.ip = Some(string_field(key, value)?),
                "date" => config.date = Some(string_field(key, value)?),
                "latest" => config.latest = Some(bool_field(key, value)?),
                "earliest" => config.earliest = Some(bool_field(key, value)?),
                "metadata" => config.metadata = metadata_from_block(value)?,
                other => tracing::debug!("ignoring unknown filter key '{}'", other),
            }
        }

        Ok(config)
    }
}

/// Parse the `metadata` value of a filter block (a list of maps)
pub fn metadata_from_block(value: &Value) -> Result<Vec<MetadataConfig>> {
    let Some(list) = value.as_array() else {
        return Err(shape_error("metadata is not a list"));
    };

    list.iter()
        .map(|entry| {
            let Some(map) = entry.as_object() else {
                return Err(shape_error("metadata entry is not a map"));
            };

            let mut md = MetadataConfig::default();
            for (key, value) in map {
                if value.is_null() {
                    continue;
                }
                match key.as_str() {
                    "key" => md.key = string_field(key, value)?,
                    "value" => md.value = value.clone(),
                    "type" => md.value_type = Some(string_field(key, value)?),
                    "is_system" => md.is_system = bool_field(key, value)?,
                    "use_api_search" => md.use_api_search = Some(bool_field(key, value)?),
                    _ => {}
                }
            }
            Ok(md)
        })
        .collect()
}
