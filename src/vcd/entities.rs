//! VCD Entities
//!
//! Fully-hydrated objects (org, VDC, catalog, ...) and the inventory searches
//! scoped to them. Each wrapper keeps a client handle so it can fetch its
//! children.

use super::client::VcdClient;
use super::query::{fetch_query_records, QueryParams, QueryRecord, QueryType};
use crate::filter::criteria::{metadata_field, FilterDefinition};
use crate::filter::matcher::apply_filter;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Link to a related object
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Link {
    #[serde(default)]
    pub rel: String,
    #[serde(default, rename = "type")]
    pub media_type: String,
    #[serde(default)]
    pub name: Option<String>,
    pub href: String,
}

/// Reference to an object held by a container
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Reference {
    pub name: String,
    pub href: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, rename = "type")]
    pub media_type: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrgType {
    pub name: String,
    pub href: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub link: Vec<Link>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VdcType {
    pub name: String,
    pub href: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_enabled: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItems {
    #[serde(default)]
    pub catalog_item: Vec<Reference>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogType {
    pub name: String,
    pub href: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_published: Option<bool>,
    #[serde(default)]
    pub date_created: Option<String>,
    #[serde(default)]
    pub catalog_items: Option<CatalogItems>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItemType {
    pub name: String,
    pub href: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub date_created: Option<String>,
    #[serde(default)]
    pub entity: Option<Reference>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaType {
    pub name: String,
    pub href: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_type: Option<String>,
    #[serde(default)]
    pub size: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrgVdcNetworkType {
    pub name: String,
    pub href: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub configuration: Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeGatewayType {
    pub name: String,
    pub href: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub configuration: Value,
}

/// Server-side filter restricting a query to one parent object.
/// Fields ending in `Name` compare against the parent's name, others against its href.
fn parent_filter(field: &str, name: &str, href: &str) -> String {
    if field.ends_with("Name") {
        format!("{}=={}", field, name)
    } else {
        format!("{}=={}", field, href)
    }
}

/// Query one inventory type within a parent scope and apply the criteria
async fn search_by_filter(
    client: &VcdClient,
    query_type: QueryType,
    scope: String,
    criteria: &FilterDefinition,
) -> Result<(Vec<QueryRecord>, String)> {
    let mut filters = vec![scope.clone()];
    let mut fields = Vec::new();

    if criteria.use_metadata_api_filter() {
        filters.extend(criteria.metadata().iter().map(|md| md.api_filter()));
    } else if !criteria.metadata().is_empty() {
        fields.extend(query_type.base_fields().iter().map(|f| f.to_string()));
        fields.extend(
            criteria
                .metadata()
                .iter()
                .map(|md| metadata_field(&md.key, md.is_system)),
        );
    }

    let params = QueryParams {
        filter: Some(filters.join(";")),
        fields,
    };

    tracing::debug!(
        "search_by_filter: type={} filter={:?} criteria=({})",
        query_type,
        params.filter,
        criteria
    );

    let records = fetch_query_records(client, query_type, &params).await?;
    let matched = apply_filter(records, criteria)?;
    let explanation = format!("{}; scope {}", criteria, scope);

    Ok((matched, explanation))
}

fn find_link<'a>(links: &'a [Link], type_fragment: &str, name: &str) -> Option<&'a Link> {
    links.iter().find(|l| {
        l.media_type.contains(type_fragment) && l.name.as_deref() == Some(name)
    })
}

// =============================================================================
// Organization
// =============================================================================

#[derive(Debug, Clone)]
pub struct Org {
    pub org: OrgType,
    client: VcdClient,
}

impl Org {
    /// Fetch an organization by href
    pub async fn fetch(client: &VcdClient, href: &str) -> Result<Self> {
        let org = client.get_entity::<OrgType>(href).await?;
        Ok(Self {
            org,
            client: client.clone(),
        })
    }

    /// Search catalogs of this organization
    pub async fn search_by_filter(
        &self,
        query_type: QueryType,
        criteria: &FilterDefinition,
    ) -> Result<(Vec<QueryRecord>, String)> {
        let scope = parent_filter("org", &self.org.name, &self.org.href);
        search_by_filter(&self.client, query_type, scope, criteria).await
    }

    pub async fn get_catalog_by_href(&self, href: &str) -> Result<Catalog> {
        let catalog = self.client.get_entity::<CatalogType>(href).await?;
        Ok(Catalog {
            catalog,
            client: self.client.clone(),
        })
    }

    pub async fn get_catalog_by_name(&self, name: &str) -> Result<Catalog> {
        let link = find_link(&self.org.link, "vcloud.catalog+", name)
            .ok_or_else(|| {
                anyhow::anyhow!("catalog '{}' not found in org '{}'", name, self.org.name)
            })?;
        self.get_catalog_by_href(&link.href).await
    }

    pub async fn get_vdc_by_name(&self, name: &str) -> Result<Vdc> {
        let link = find_link(&self.org.link, "vcloud.vdc+", name)
            .ok_or_else(|| anyhow::anyhow!("VDC '{}' not found in org '{}'", name, self.org.name))?;
        let vdc = self.client.get_entity::<VdcType>(&link.href).await?;
        Ok(Vdc {
            vdc,
            client: self.client.clone(),
        })
    }
}

// =============================================================================
// Catalog
// =============================================================================

#[derive(Debug, Clone)]
pub struct Catalog {
    pub catalog: CatalogType,
    client: VcdClient,
}

impl Catalog {
    /// Search items (templates or media) of this catalog
    pub async fn search_by_filter(
        &self,
        query_type: QueryType,
        parent_field: &str,
        criteria: &FilterDefinition,
    ) -> Result<(Vec<QueryRecord>, String)> {
        let scope = parent_filter(parent_field, &self.catalog.name, &self.catalog.href);
        search_by_filter(&self.client, query_type, scope, criteria).await
    }

    /// Look up a catalog item by name in the current item list of the catalog
    pub async fn get_catalog_item_by_name(&self, name: &str) -> Result<CatalogItem> {
        let current = self.client.get_entity::<CatalogType>(&self.catalog.href).await?;

        let reference = current
            .catalog_items
            .as_ref()
            .and_then(|items| items.catalog_item.iter().find(|r| r.name == name))
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "catalog item '{}' not found in catalog '{}'",
                    name,
                    self.catalog.name
                )
            })?;

        let item = self.client.get_entity::<CatalogItemType>(&reference.href).await?;
        Ok(CatalogItem { catalog_item: item })
    }

    pub async fn get_media_by_href(&self, href: &str) -> Result<Media> {
        let media = self.client.get_entity::<MediaType>(href).await?;
        Ok(Media { media })
    }
}

#[derive(Debug, Clone)]
pub struct CatalogItem {
    pub catalog_item: CatalogItemType,
}

#[derive(Debug, Clone)]
pub struct Media {
    pub media: MediaType,
}

// =============================================================================
// VDC
// =============================================================================

#[derive(Debug, Clone)]
pub struct Vdc {
    pub vdc: VdcType,
    client: VcdClient,
}

impl Vdc {
    /// Search networks or edge gateways of this VDC
    pub async fn search_by_filter(
        &self,
        query_type: QueryType,
        parent_field: &str,
        criteria: &FilterDefinition,
    ) -> Result<(Vec<QueryRecord>, String)> {
        let scope = parent_filter(parent_field, &self.vdc.name, &self.vdc.href);
        search_by_filter(&self.client, query_type, scope, criteria).await
    }

    pub async fn get_org_vdc_network_by_href(&self, href: &str) -> Result<OrgVdcNetwork> {
        let network = self.client.get_entity::<OrgVdcNetworkType>(href).await?;
        Ok(OrgVdcNetwork { network })
    }

    pub async fn get_edge_gateway_by_href(&self, href: &str) -> Result<EdgeGateway> {
        let edge_gateway = self.client.get_entity::<EdgeGatewayType>(href).await?;
        Ok(EdgeGateway { edge_gateway })
    }
}

#[derive(Debug, Clone)]
pub struct OrgVdcNetwork {
    pub network: OrgVdcNetworkType,
}

#[derive(Debug, Clone)]
pub struct EdgeGateway {
    pub edge_gateway: EdgeGatewayType,
}
