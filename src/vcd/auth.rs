//! VCD Authentication
//!
//! Opens a CloudAPI session with basic credentials and caches the returned
//! bearer token. System administrators log in through the provider endpoint.

use super::http::{VcdHttpClient, ACCESS_TOKEN_HEADER};
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Organization name reserved for the system (provider) tenant
pub const SYSTEM_ORG: &str = "System";

/// Refresh tokens this much before the session idle timeout
const TOKEN_EXPIRY_BUFFER: Duration = Duration::from_secs(60);

/// Default VCD session idle timeout
const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(30 * 60);

/// Login identity for a VCD session
#[derive(Clone)]
pub struct LoginInfo {
    pub user: String,
    pub password: String,
    pub org: String,
}

impl LoginInfo {
    /// Whether this identity belongs to the system organization
    pub fn is_sys_admin(&self) -> bool {
        self.org.eq_ignore_ascii_case(SYSTEM_ORG)
    }
}

impl std::fmt::Debug for LoginInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginInfo")
            .field("user", &self.user)
            .field("password", &"***")
            .field("org", &self.org)
            .finish()
    }
}

/// VCD credentials holder with token caching
#[derive(Clone)]
pub struct VcdCredentials {
    login: LoginInfo,
    sessions_url: String,
    token_cache: Arc<RwLock<Option<CachedToken>>>,
}

#[derive(Clone)]
struct CachedToken {
    token: String,
    /// When this token expires (with buffer applied)
    expires_at: Instant,
}

impl CachedToken {
    fn is_valid(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

impl VcdCredentials {
    /// Create credentials for the given endpoint; no request is made until a token is needed
    pub fn new(endpoint: &url::Url, login: LoginInfo) -> Result<Self> {
        let path = if login.is_sys_admin() {
            "cloudapi/1.0.0/sessions/provider"
        } else {
            "cloudapi/1.0.0/sessions"
        };
        let sessions_url = endpoint
            .join(path)
            .context("Failed to build sessions URL")?
            .to_string();

        Ok(Self {
            login,
            sessions_url,
            token_cache: Arc::new(RwLock::new(None)),
        })
    }

    pub fn login_info(&self) -> &LoginInfo {
        &self.login
    }

    /// Get a bearer token, logging in when the cached one is missing or stale
    pub async fn get_token(&self, http: &VcdHttpClient) -> Result<String> {
        {
            let cache = self.token_cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.is_valid() {
                    return Ok(cached.token.clone());
                }
                tracing::debug!("Cached token expired, opening a new session");
            }
        }

        let user = format!("{}@{}", self.login.user, self.login.org);
        let headers = http
            .login(&self.sessions_url, &user, &self.login.password)
            .await
            .context("Failed to open VCD session")?;

        let token = headers
            .get(ACCESS_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
            .ok_or_else(|| anyhow::anyhow!("Login response carried no access token"))?;

        {
            let mut cache = self.token_cache.write().await;
            *cache = Some(CachedToken {
                token: token.clone(),
                expires_at: Instant::now() + DEFAULT_TOKEN_TTL - TOKEN_EXPIRY_BUFFER,
            });
        }

        tracing::info!("VCD session opened for {}", user);

        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn login(org: &str) -> LoginInfo {
        LoginInfo {
            user: "admin".into(),
            password: "secret".into(),
            org: org.into(),
        }
    }

    #[test]
    fn test_system_org_uses_provider_sessions() {
        let endpoint = url::Url::parse("https://vcd.example.com/").unwrap();
        let creds = VcdCredentials::new(&endpoint, login("system")).unwrap();
        assert_eq!(
            creds.sessions_url,
            "https://vcd.example.com/cloudapi/1.0.0/sessions/provider"
        );

        let creds = VcdCredentials::new(&endpoint, login("tenant1")).unwrap();
        assert_eq!(
            creds.sessions_url,
            "https://vcd.example.com/cloudapi/1.0.0/sessions"
        );
    }

    #[test]
    fn test_debug_masks_password() {
        let rendered = format!("{:?}", login("tenant1"));
        assert!(!rendered.contains("secret"));
    }
}
