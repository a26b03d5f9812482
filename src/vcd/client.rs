//! VCD Client
//!
//! Main client for interacting with the VCD API, combining authentication
//! and HTTP functionality.

use super::auth::{LoginInfo, VcdCredentials};
use super::entities::Org;
use super::http::VcdHttpClient;
use super::query::{fetch_query_records, QueryParams, QueryType};
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use url::Url;

/// Main VCD client
#[derive(Clone)]
pub struct VcdClient {
    pub credentials: VcdCredentials,
    pub http: VcdHttpClient,
    endpoint: Url,
}

impl fmt::Debug for VcdClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VcdClient")
            .field("endpoint", &self.endpoint.as_str())
            .field("api_version", &self.http.api_version())
            .field("login", self.credentials.login_info())
            .finish_non_exhaustive()
    }
}

impl VcdClient {
    /// Create a new client and open a session
    pub async fn new(
        endpoint: &str,
        login: LoginInfo,
        api_version: &str,
        allow_unverified_ssl: bool,
    ) -> Result<Self> {
        let endpoint = normalize_endpoint(endpoint)?;
        let credentials = VcdCredentials::new(&endpoint, login)?;
        let http = VcdHttpClient::new(api_version, allow_unverified_ssl)?;

        let client = Self {
            credentials,
            http,
            endpoint,
        };

        client
            .get_token()
            .await
            .context("Failed to authenticate against VCD")?;

        Ok(client)
    }

    /// Get the current access token
    pub async fn get_token(&self) -> Result<String> {
        self.credentials.get_token(&self.http).await
    }

    /// Make a GET request to the VCD API
    pub async fn get(&self, url: &str) -> Result<Value> {
        let token = self.get_token().await?;
        self.http.get(url, &token).await
    }

    /// GET an entity by href and decode it
    pub async fn get_entity<T: DeserializeOwned>(&self, href: &str) -> Result<T> {
        let value = self.get(href).await?;
        serde_json::from_value(value)
            .with_context(|| format!("Failed to decode entity at {}", href))
    }

    /// Whether the session belongs to the system organization
    pub fn is_sys_admin(&self) -> bool {
        self.credentials.login_info().is_sys_admin()
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    // =========================================================================
    // URL helpers
    // =========================================================================

    /// Build a legacy API URL (`/api/...`)
    pub fn api_url(&self, path: &str) -> String {
        format!("{}api/{}", self.endpoint, path.trim_start_matches('/'))
    }

    /// Build a query service URL for one page
    pub fn query_url(
        &self,
        query_type: QueryType,
        params: &QueryParams,
        page: usize,
        page_size: usize,
    ) -> String {
        let mut url = format!(
            "{}?type={}&format=records&page={}&pageSize={}",
            self.api_url("query"),
            query_type,
            page,
            page_size
        );

        if let Some(filter) = params.filter.as_deref().filter(|f| !f.is_empty()) {
            url.push_str("&filter=");
            url.push_str(&urlencoding::encode(filter));
        }

        if !params.fields.is_empty() {
            url.push_str("&fields=");
            url.push_str(&urlencoding::encode(&params.fields.join(",")));
        }

        url
    }

    // =========================================================================
    // Organizations
    // =========================================================================

    /// Find an organization by exact name and fetch it
    pub async fn get_org_by_name(&self, name: &str) -> Result<Org> {
        let params = QueryParams {
            filter: Some(format!("name=={}", name)),
            fields: vec![],
        };

        let records = fetch_query_records(self, QueryType::Organization, &params).await?;
        let record = records
            .into_iter()
            .find(|r| r.name == name)
            .ok_or_else(|| anyhow::anyhow!("organization '{}' not found", name))?;

        Org::fetch(self, &record.href).await
    }
}

/// Normalize a user-supplied endpoint to the server root with a trailing slash.
/// Accepts both `https://host` and the Terraform-style `https://host/api`.
pub fn normalize_endpoint(endpoint: &str) -> Result<Url> {
    let trimmed = endpoint.trim().trim_end_matches('/');
    let root = trimmed.strip_suffix("/api").unwrap_or(trimmed);

    Url::parse(&format!("{}/", root))
        .with_context(|| format!("Invalid VCD endpoint '{}'", endpoint))
}

/// Format a VCD API error for display
pub fn format_vcd_error(error: &anyhow::Error) -> String {
    super::http::format_vcd_error(error)
}
