//! Store endpoint configuration and credential resolution

use std::net::ToSocketAddrs;

use crate::error::{TracevalError, TracevalResult};

/// Environment variable naming the store endpoint
pub const ENDPOINT_ENV: &str = "TRACEVAL_ENDPOINT";
/// Environment variable carrying the store API key
pub const API_KEY_ENV: &str = "TRACEVAL_API_KEY";

const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Connection settings for the dataset/trace store.
///
/// Hosted (non-localhost) endpoints require an API key. A missing tenant id is
/// resolved from the store's seeded tenant when the client connects.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub api_url: String,
    pub api_key: Option<String>,
    pub tenant_id: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_key: None,
            tenant_id: None,
        }
    }
}

impl ApiConfig {
    /// Build from `TRACEVAL_ENDPOINT` / `TRACEVAL_API_KEY`, falling back to the
    /// localhost default endpoint
    pub fn from_env() -> Self {
        Self {
            api_url: std::env::var(ENDPOINT_ENV).unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
            api_key: std::env::var(API_KEY_ENV).ok(),
            tenant_id: None,
        }
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_tenant_id(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    /// Whether the endpoint resolves to the local machine
    pub fn is_localhost(&self) -> bool {
        is_localhost(&self.api_url)
    }

    /// Reject hosted endpoints without credentials before any request is made
    pub fn validate(&self) -> TracevalResult<()> {
        if self.api_key.is_none() && !self.is_localhost() {
            return Err(TracevalError::config(format!(
                "an API key is required for the hosted endpoint {}",
                self.api_url
            )));
        }
        Ok(())
    }
}

fn host_of(url: &str) -> Option<String> {
    let rest = url.split("://").nth(1).unwrap_or(url);
    let authority = rest.split('/').next()?;
    Some(authority.split(':').next()?.to_string())
}

/// Check whether a URL points at the local machine, resolving the hostname
/// when it is not a literal loopback address
pub fn is_localhost(url: &str) -> bool {
    let Some(host) = host_of(url) else {
        return false;
    };
    if host == "localhost" {
        return true;
    }
    match (host.as_str(), 0u16).to_socket_addrs() {
        Ok(mut addrs) => addrs.any(|addr| {
            let ip = addr.ip();
            ip.is_loopback() || ip.is_unspecified()
        }),
        Err(_) => false,
    }
}
