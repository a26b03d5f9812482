//! Filtered lookups per entity kind
//!
//! Each lookup picks the query type for the caller's privilege level, runs
//! the resolver with a searcher bound to the parent object, then fetches the
//! full entity for the single match.

use super::criteria::{FilterConfig, FilterDefinition};
use super::error::FilterError;
use super::resolver::{get_entity_by_filter, FilteredSearcher};
use crate::vcd::entities::{Catalog, CatalogItem, EdgeGateway, Media, Org, OrgVdcNetwork, Vdc};
use crate::vcd::query::{QueryItem, QueryRecord, QueryType};
use anyhow::Result;
use std::fmt;
use std::str::FromStr;

/// Network flavours an org VDC network query can return
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkKind {
    Routed,
    Isolated,
    Direct,
}

impl NetworkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NetworkKind::Routed => "routed",
            NetworkKind::Isolated => "isolated",
            NetworkKind::Direct => "direct",
        }
    }

    /// Item type carried by query records of this kind
    pub fn item_type(&self) -> String {
        format!("network_{}", self.as_str())
    }
}

impl fmt::Display for NetworkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NetworkKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "routed" => Ok(NetworkKind::Routed),
            "isolated" => Ok(NetworkKind::Isolated),
            "direct" => Ok(NetworkKind::Direct),
            other => Err(anyhow::anyhow!("unknown network kind '{}'", other)),
        }
    }
}

fn pick(is_sys_admin: bool, admin: QueryType, tenant: QueryType) -> QueryType {
    if is_sys_admin {
        admin
    } else {
        tenant
    }
}

struct CatalogSearcher<'a> {
    org: &'a Org,
}

impl FilteredSearcher for CatalogSearcher<'_> {
    type Item = QueryRecord;

    async fn search(
        &self,
        query_type: QueryType,
        criteria: &FilterDefinition,
    ) -> Result<(Vec<QueryRecord>, String)> {
        self.org.search_by_filter(query_type, criteria).await
    }
}

/// Searches one catalog, scoped by `parent_field`
struct CatalogContentSearcher<'a> {
    catalog: &'a Catalog,
    parent_field: &'static str,
}

impl FilteredSearcher for CatalogContentSearcher<'_> {
    type Item = QueryRecord;

    async fn search(
        &self,
        query_type: QueryType,
        criteria: &FilterDefinition,
    ) -> Result<(Vec<QueryRecord>, String)> {
        self.catalog
            .search_by_filter(query_type, self.parent_field, criteria)
            .await
    }
}

struct NetworkSearcher<'a> {
    vdc: &'a Vdc,
    wanted: NetworkKind,
}

impl FilteredSearcher for NetworkSearcher<'_> {
    type Item = QueryRecord;

    async fn search(
        &self,
        query_type: QueryType,
        criteria: &FilterDefinition,
    ) -> Result<(Vec<QueryRecord>, String)> {
        let (items, explanation) = self.vdc.search_by_filter(query_type, "vdc", criteria).await?;
        Ok((narrow_networks(items, self.wanted)?, explanation))
    }
}

struct EdgeGatewaySearcher<'a> {
    vdc: &'a Vdc,
}

impl FilteredSearcher for EdgeGatewaySearcher<'_> {
    type Item = QueryRecord;

    async fn search(
        &self,
        query_type: QueryType,
        criteria: &FilterDefinition,
    ) -> Result<(Vec<QueryRecord>, String)> {
        self.vdc.search_by_filter(query_type, "vdc", criteria).await
    }
}

/// Keep only networks of the wanted kind; an empty result is an error of its own
pub fn narrow_networks<I: QueryItem>(items: Vec<I>, wanted: NetworkKind) -> Result<Vec<I>> {
    let wanted_type = wanted.item_type();
    let narrowed: Vec<I> = items
        .into_iter()
        .filter(|item| item.item_type() == wanted_type)
        .collect();

    if narrowed.is_empty() {
        return Err(FilterError::NoNetworkOfType(wanted_type).into());
    }

    Ok(narrowed)
}

/// Find the one catalog of `org` matching `filter`
pub async fn get_catalog_by_filter(
    org: &Org,
    filter: &FilterConfig,
    is_sys_admin: bool,
) -> Result<Catalog> {
    let query_type = pick(is_sys_admin, QueryType::AdminCatalog, QueryType::Catalog);
    let item = get_entity_by_filter(&CatalogSearcher { org }, query_type, "catalog", filter).await?;

    let catalog = org.get_catalog_by_href(item.href()).await.map_err(|e| {
        anyhow::anyhow!(
            "[get_catalog_by_filter] error retrieving catalog {}: {:#}",
            item.name(),
            e
        )
    })?;

    tracing::info!("catalog '{}' selected by filter", item.name());
    Ok(catalog)
}

/// Find the one catalog item (vApp template) of `catalog` matching `filter`
pub async fn get_catalog_item_by_filter(
    catalog: &Catalog,
    filter: &FilterConfig,
    is_sys_admin: bool,
) -> Result<CatalogItem> {
    let query_type = pick(is_sys_admin, QueryType::AdminVappTemplate, QueryType::VappTemplate);
    let searcher = CatalogContentSearcher {
        catalog,
        parent_field: "catalogName",
    };
    let item = get_entity_by_filter(&searcher, query_type, "catalog item", filter).await?;

    // Template records link to the template, not to the catalog item, so the
    // item is found by name.
    // TODO: switch to by-href once template records expose the catalog item href
    let catalog_item = catalog
        .get_catalog_item_by_name(item.name())
        .await
        .map_err(|e| {
            anyhow::anyhow!(
                "[get_catalog_item_by_filter] error retrieving catalog item {}: {:#}",
                item.name(),
                e
            )
        })?;

    tracing::info!("catalog item '{}' selected by filter", item.name());
    Ok(catalog_item)
}

/// Find the one media image of `catalog` matching `filter`
pub async fn get_media_by_filter(
    catalog: &Catalog,
    filter: &FilterConfig,
    is_sys_admin: bool,
) -> Result<Media> {
    let query_type = pick(is_sys_admin, QueryType::AdminMedia, QueryType::Media);
    let searcher = CatalogContentSearcher {
        catalog,
        parent_field: "catalog",
    };
    let item = get_entity_by_filter(&searcher, query_type, "media", filter).await?;

    let media = catalog.get_media_by_href(item.href()).await.map_err(|e| {
        anyhow::anyhow!(
            "[get_media_by_filter] error retrieving media {}: {:#}",
            item.name(),
            e
        )
    })?;

    tracing::info!("media '{}' selected by filter", item.name());
    Ok(media)
}

/// Find the one network of kind `wanted` in `vdc` matching `filter`
pub async fn get_network_by_filter(
    vdc: &Vdc,
    filter: &FilterConfig,
    wanted: NetworkKind,
) -> Result<OrgVdcNetwork> {
    let searcher = NetworkSearcher { vdc, wanted };
    let label = format!("network_{}", wanted);
    let item = get_entity_by_filter(&searcher, QueryType::OrgVdcNetwork, &label, filter).await?;

    let network = vdc.get_org_vdc_network_by_href(item.href()).await.map_err(|e| {
        anyhow::anyhow!(
            "[get_network_by_filter] error retrieving network {}: {:#}",
            item.name(),
            e
        )
    })?;

    tracing::info!("{} network '{}' selected by filter", wanted, item.name());
    Ok(network)
}

/// Find the one edge gateway of `vdc` matching `filter`
pub async fn get_edge_gateway_by_filter(vdc: &Vdc, filter: &FilterConfig) -> Result<EdgeGateway> {
    let searcher = EdgeGatewaySearcher { vdc };
    let item =
        get_entity_by_filter(&searcher, QueryType::EdgeGateway, "edge gateway", filter).await?;

    let edge_gateway = vdc.get_edge_gateway_by_href(item.href()).await.map_err(|e| {
        anyhow::anyhow!(
            "[get_edge_gateway_by_filter] error retrieving edge gateway {}: {:#}",
            item.name(),
            e
        )
    })?;

    tracing::info!("edge gateway '{}' selected by filter", item.name());
    Ok(edge_gateway)
}
