//! HTTP transports for backend adapters.

use reqwest::{Client, Proxy};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use debridgate_common::{Error, Result, TunnelType};

/// Default user agent sent to backends.
pub const DEFAULT_USER_AGENT: &str = "debridgate/0.1";

/// Settings shared by every backend transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Forward proxy used for [`TunnelType::Proxy`] traffic.
    #[serde(default)]
    pub tunnel_proxy_url: Option<String>,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Per-request timeout in seconds, `0` for none.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            tunnel_proxy_url: None,
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Build a client that honours `tunnel`.
///
/// Proxied clients send everything through `tunnel_proxy_url`; when no proxy
/// is configured they fall back to direct connections. Direct clients ignore
/// proxy settings from the environment.
pub fn http_client(tunnel: TunnelType, config: &TransportConfig) -> Result<Client> {
    let mut builder = Client::builder().user_agent(config.user_agent.clone());

    if config.timeout_secs > 0 {
        builder = builder.timeout(Duration::from_secs(config.timeout_secs));
    }

    builder = match (tunnel, config.tunnel_proxy_url.as_deref()) {
        (TunnelType::Proxy, Some(proxy_url)) => {
            let proxy = Proxy::all(proxy_url)
                .map_err(|e| Error::InvalidInput(format!("Invalid tunnel proxy url: {}", e)))?;
            debug!(tunnel = %tunnel, "building proxied http client");
            builder.proxy(proxy)
        }
        _ => builder.no_proxy(),
    };

    builder
        .build()
        .map_err(|e| Error::Network(format!("Failed to create HTTP client: {}", e)))
}
