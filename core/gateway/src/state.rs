//! Shared handler state.

use std::sync::Arc;

use debridgate_common::{Result, TunnelType};
use debridgate_proxy::ProxyAuth;
use debridgate_store::{
    http_client, Cache, MagnetSummary, MemoryCache, StoreRegistry, TransportConfig,
};

use crate::config::GatewayConfig;

/// State shared by every request.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<StoreRegistry>,
    pub auth: Arc<ProxyAuth>,
    direct: reqwest::Client,
    proxied: reqwest::Client,
}

impl AppState {
    /// Build the registry and streaming clients described by `config`.
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        let cache: Arc<dyn Cache<Vec<MagnetSummary>>> =
            Arc::new(MemoryCache::<Vec<MagnetSummary>>::new());
        let registry = StoreRegistry::from_config(&config.stores, &config.transport, cache)?;
        Self::with_registry(registry, config.proxy_auth.clone(), &config.transport)
    }

    /// Use an already built registry.
    pub fn with_registry(
        registry: StoreRegistry,
        auth: ProxyAuth,
        transport: &TransportConfig,
    ) -> Result<Self> {
        // Streams outlive any sensible request timeout.
        let streaming = TransportConfig {
            timeout_secs: 0,
            ..transport.clone()
        };

        Ok(Self {
            registry: Arc::new(registry),
            auth: Arc::new(auth),
            direct: http_client(TunnelType::Direct, &streaming)?,
            proxied: http_client(TunnelType::Proxy, &streaming)?,
        })
    }

    /// Client for upstream fetches routed per `tunnel`.
    pub fn client(&self, tunnel: TunnelType) -> &reqwest::Client {
        match tunnel {
            TunnelType::Direct => &self.direct,
            TunnelType::Proxy => &self.proxied,
        }
    }
}
