//! Query Service
//!
//! Typed access to the VCD inventory query API (`/api/query`). Query results are
//! lightweight records carrying enough identity to fetch the full entity later.

use super::client::VcdClient;
use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use std::fmt;

/// Records requested per page
const QUERY_PAGE_SIZE: usize = 128;

/// Upper bound on followed pages, guards against a server that never stops paging
const MAX_QUERY_PAGES: usize = 1000;

/// Inventory query types understood by the query service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum QueryType {
    #[default]
    Catalog,
    AdminCatalog,
    VappTemplate,
    AdminVappTemplate,
    Media,
    AdminMedia,
    OrgVdcNetwork,
    EdgeGateway,
    Organization,
}

impl QueryType {
    /// Name used in the `type` query parameter
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryType::Catalog => "catalog",
            QueryType::AdminCatalog => "adminCatalog",
            QueryType::VappTemplate => "vAppTemplate",
            QueryType::AdminVappTemplate => "adminVAppTemplate",
            QueryType::Media => "media",
            QueryType::AdminMedia => "adminMedia",
            QueryType::OrgVdcNetwork => "orgVdcNetwork",
            QueryType::EdgeGateway => "edgeGateway",
            QueryType::Organization => "organization",
        }
    }

    /// Fields always requested when the query names its fields explicitly
    /// (needed when metadata fields are added)
    pub fn base_fields(&self) -> &'static [&'static str] {
        match self {
            QueryType::Catalog | QueryType::AdminCatalog => &["name", "creationDate", "orgName"],
            QueryType::VappTemplate
            | QueryType::AdminVappTemplate
            | QueryType::Media
            | QueryType::AdminMedia => &["name", "creationDate", "catalogName", "status"],
            QueryType::OrgVdcNetwork => &["name", "linkType", "defaultGateway", "vdc"],
            QueryType::EdgeGateway => &["name", "gatewayStatus", "vdc"],
            QueryType::Organization => &["name", "displayName"],
        }
    }
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A lightweight handle to a matched inventory record
///
/// The filter engine only ever works through this trait, so any record type
/// (or a test double) can be filtered and resolved.
pub trait QueryItem {
    fn name(&self) -> &str;
    fn href(&self) -> &str;
    /// Entity kind, e.g. `catalog` or `network_routed`
    fn item_type(&self) -> String;

    /// RFC3339 creation date, when the entity kind has one
    fn date(&self) -> Option<&str> {
        None
    }

    /// IP address associated with the entity, when the entity kind has one
    fn ip(&self) -> Option<&str> {
        None
    }

    /// Metadata value for `key` as returned by the query, rendered as a string
    fn metadata_value(&self, _key: &str, _is_system: bool) -> Option<String> {
        None
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetadataDomain {
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TypedValue {
    #[serde(default)]
    pub value: Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataEntry {
    pub key: String,
    #[serde(default)]
    pub domain: Option<MetadataDomain>,
    #[serde(default)]
    pub typed_value: TypedValue,
}

impl MetadataEntry {
    fn is_system(&self) -> bool {
        self.domain
            .as_ref()
            .map(|d| d.value.eq_ignore_ascii_case("SYSTEM"))
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordMetadata {
    #[serde(default)]
    pub metadata_entry: Vec<MetadataEntry>,
}

/// One record returned by the query service
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRecord {
    pub name: String,
    pub href: String,
    #[serde(default)]
    pub creation_date: Option<String>,
    #[serde(default)]
    pub default_gateway: Option<String>,
    #[serde(default)]
    pub link_type: Option<i64>,
    #[serde(default)]
    pub catalog_name: Option<String>,
    #[serde(default)]
    pub metadata: Option<RecordMetadata>,
    /// Query this record came from (not part of the payload)
    #[serde(skip)]
    pub query_type: QueryType,
}

impl QueryItem for QueryRecord {
    fn name(&self) -> &str {
        &self.name
    }

    fn href(&self) -> &str {
        &self.href
    }

    fn item_type(&self) -> String {
        match self.query_type {
            QueryType::Catalog | QueryType::AdminCatalog => "catalog".to_string(),
            QueryType::VappTemplate | QueryType::AdminVappTemplate => "vapp_template".to_string(),
            QueryType::Media | QueryType::AdminMedia => "media".to_string(),
            QueryType::EdgeGateway => "edge_gateway".to_string(),
            QueryType::Organization => "org".to_string(),
            QueryType::OrgVdcNetwork => match self.link_type {
                Some(0) => "network_direct".to_string(),
                Some(1) => "network_routed".to_string(),
                Some(2) => "network_isolated".to_string(),
                _ => "network_unknown".to_string(),
            },
        }
    }

    fn date(&self) -> Option<&str> {
        self.creation_date.as_deref().filter(|d| !d.is_empty())
    }

    fn ip(&self) -> Option<&str> {
        self.default_gateway.as_deref().filter(|ip| !ip.is_empty())
    }

    fn metadata_value(&self, key: &str, is_system: bool) -> Option<String> {
        self.metadata
            .as_ref()?
            .metadata_entry
            .iter()
            .find(|e| e.key == key && e.is_system() == is_system)
            .map(|e| match &e.typed_value.value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
    }
}

/// Parameters for one inventory query
#[derive(Debug, Clone, Default)]
pub struct QueryParams {
    /// Server-side filter expression (`name==x;vdc==href`)
    pub filter: Option<String>,
    /// Explicit field list; empty means the server default set
    pub fields: Vec<String>,
}

/// Run a query and collect every page of records
pub async fn fetch_query_records(
    client: &VcdClient,
    query_type: QueryType,
    params: &QueryParams,
) -> Result<Vec<QueryRecord>> {
    fetch_pages(client, query_type, params, MAX_QUERY_PAGES).await
}

/// Follow `nextPage` links up to `max_pages`; a longer result set is an error, never truncated
async fn fetch_pages(
    client: &VcdClient,
    query_type: QueryType,
    params: &QueryParams,
    max_pages: usize,
) -> Result<Vec<QueryRecord>> {
    let mut all_records = Vec::new();
    let mut page = 1;

    loop {
        let url = client.query_url(query_type, params, page, QUERY_PAGE_SIZE);
        let response = client.get(&url).await?;

        let records = extract_records(&response, query_type)
            .with_context(|| format!("Failed to decode {} query page {}", query_type, page))?;
        all_records.extend(records);

        if !has_next_page(&response) {
            break;
        }
        if page >= max_pages {
            anyhow::bail!("{} query exceeded {} pages", query_type, max_pages);
        }
        page += 1;
    }

    tracing::debug!(
        "query type={} returned {} records",
        query_type,
        all_records.len()
    );

    Ok(all_records)
}

/// Extract records from a query response page
fn extract_records(response: &Value, query_type: QueryType) -> Result<Vec<QueryRecord>> {
    let Some(raw) = response.get("record").and_then(|v| v.as_array()) else {
        return Ok(vec![]);
    };

    raw.iter()
        .map(|item| {
            let mut record: QueryRecord = serde_json::from_value(item.clone())?;
            record.query_type = query_type;
            Ok::<_, anyhow::Error>(record)
        })
        .collect()
}

fn has_next_page(response: &Value) -> bool {
    response
        .get("link")
        .and_then(|v| v.as_array())
        .map(|links| {
            links
                .iter()
                .any(|l| l.get("rel").and_then(|r| r.as_str()) == Some("nextPage"))
        })
        .unwrap_or(false)
}
