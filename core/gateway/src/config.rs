//! Gateway configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;

use debridgate_common::{Error, Result};
use debridgate_proxy::ProxyAuth;
use debridgate_store::{StoresConfig, TransportConfig};

/// Default listen address.
pub const DEFAULT_LISTEN: &str = "127.0.0.1:8080";

/// Configuration for a gateway instance, loaded from a JSON file.
///
/// ```json
/// {
///   "base_url": "https://gate.example.com",
///   "listen": "0.0.0.0:8080",
///   "tunnel_proxy_url": "socks5://10.0.0.2:1080",
///   "proxy_auth": { "alice": "s3cret" },
///   "pikpak": { "api_key": "..." },
///   "seedr": { "api_key": "user@example.com:password" }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Public URL proxy links are issued under.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Socket address the redirect endpoint binds to.
    #[serde(default = "default_listen")]
    pub listen: String,
    /// Users allowed to issue and redeem proxy links.
    #[serde(default)]
    pub proxy_auth: ProxyAuth,
    #[serde(flatten)]
    pub transport: TransportConfig,
    #[serde(flatten)]
    pub stores: StoresConfig,
}

fn default_base_url() -> String {
    format!("http://{}", DEFAULT_LISTEN)
}

fn default_listen() -> String {
    DEFAULT_LISTEN.to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            listen: default_listen(),
            proxy_auth: ProxyAuth::default(),
            transport: TransportConfig::default(),
            stores: StoresConfig::default(),
        }
    }
}

impl GatewayConfig {
    /// Read a configuration file.
    ///
    /// # Errors
    /// - `Io` if the file cannot be read
    /// - `Serialization` if it is not valid configuration JSON
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.base_url.is_empty() {
            return Err(Error::InvalidInput("base_url must not be empty".to_string()));
        }
        if self.listen.is_empty() {
            return Err(Error::InvalidInput("listen must not be empty".to_string()));
        }
        Ok(())
    }
}
