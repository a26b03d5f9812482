//! HTTP utilities for VCD REST API calls

use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, ACCEPT};
use reqwest::Client;
use serde_json::Value;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Header carrying the session token after login
pub const ACCESS_TOKEN_HEADER: &str = "X-VMWARE-VCLOUD-ACCESS-TOKEN";

/// Header used to correlate client requests in VCD logs
const REQUEST_ID_HEADER: &str = "X-VMWARE-VCLOUD-CLIENT-REQUEST-ID";

/// Sanitize response body for logging
/// Truncates long responses and strips control characters
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let cut = (0..=MAX_LOG_BODY_LENGTH)
            .rev()
            .find(|i| body.is_char_boundary(*i))
            .unwrap_or(0);
        format!("{}... [truncated, {} bytes total]", &body[..cut], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// HTTP client wrapper for VCD API calls
#[derive(Clone)]
pub struct VcdHttpClient {
    client: Client,
    api_version: String,
}

impl VcdHttpClient {
    /// Create a new HTTP client speaking the given API version
    pub fn new(api_version: &str, allow_unverified_ssl: bool) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("vcd-filter/", env!("CARGO_PKG_VERSION")))
            .danger_accept_invalid_certs(allow_unverified_ssl)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            api_version: api_version.to_string(),
        })
    }

    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    fn accept_header(&self) -> String {
        format!("application/*+json;version={}", self.api_version)
    }

    fn request_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    /// Make a GET request to the VCD API
    pub async fn get(&self, url: &str, token: &str) -> Result<Value> {
        let request_id = Self::request_id();
        tracing::debug!("GET {} (request {})", url, request_id);

        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .header(ACCEPT, self.accept_header())
            .header(REQUEST_ID_HEADER, &request_id)
            .send()
            .await
            .context("Failed to send request")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read response body")?;

        if !status.is_success() {
            // Security: Only log sanitized/truncated error body to avoid leaking sensitive data
            tracing::error!("API error: {} - {}", status, sanitize_for_log(&body));
            return Err(anyhow::anyhow!("API request failed: {}", status));
        }

        serde_json::from_str(&body).context("Failed to parse response JSON")
    }

    /// Open a session with basic credentials, returning the response headers
    pub async fn login(&self, url: &str, user: &str, password: &str) -> Result<HeaderMap> {
        tracing::debug!("POST {} (login as {})", url, user);

        let response = self
            .client
            .post(url)
            .basic_auth(user, Some(password))
            .header(ACCEPT, format!("application/json;version={}", self.api_version))
            .header(REQUEST_ID_HEADER, Self::request_id())
            .send()
            .await
            .context("Failed to send login request")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Login error: {} - {}", status, sanitize_for_log(&body));
            return Err(anyhow::anyhow!("API request failed: {}", status));
        }

        Ok(response.headers().clone())
    }
}

/// Format a VCD API error for display
/// Security: Sanitizes error messages to avoid leaking sensitive API details
pub fn format_vcd_error(error: &anyhow::Error) -> String {
    let error_str = format!("{:#}", error);

    // Filter errors are user-facing already
    if !error_str.contains("API request failed") {
        return error_str
            .chars()
            .filter(|c| c.is_ascii_graphic() || *c == ' ')
            .collect();
    }

    if error_str.contains("401") {
        return "Authentication failed. Check user, org and VCD_PASSWORD.".to_string();
    }
    if error_str.contains("403") {
        return "Permission denied. The user's role cannot access this object.".to_string();
    }
    if error_str.contains("404") {
        return "Resource not found.".to_string();
    }
    if error_str.contains("429") {
        return "Rate limit exceeded. Please try again later.".to_string();
    }
    if error_str.contains("500") || error_str.contains("503") {
        return "VCD service temporarily unavailable. Please try again.".to_string();
    }
    "Request failed. Check your network connection and try again.".to_string()
}
