//! Store registry for resolving stores by name or code.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use debridgate_common::{Error, Result, StoreName, StoreTunnel};

use crate::cache::Cache;
use crate::listing::ListingCache;
use crate::models::MagnetSummary;
use crate::pikpak::{PikPakClient, PikPakConfig, PikPakStore};
use crate::seedr::{SeedrClient, SeedrConfig, SeedrStore};
use crate::store::Store;
use crate::transport::{http_client, TransportConfig};

/// Per-store configuration sections.
///
/// A store is only built when its section is present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoresConfig {
    #[serde(default)]
    pub pikpak: Option<PikPakConfig>,
    #[serde(default)]
    pub seedr: Option<SeedrConfig>,
    /// Lifetime of cached listings in seconds.
    #[serde(default = "default_listing_cache_ttl_secs")]
    pub listing_cache_ttl_secs: u64,
}

fn default_listing_cache_ttl_secs() -> u64 {
    ListingCache::DEFAULT_TTL.as_secs()
}

impl Default for StoresConfig {
    fn default() -> Self {
        Self {
            pikpak: None,
            seedr: None,
            listing_cache_ttl_secs: default_listing_cache_ttl_secs(),
        }
    }
}

/// Registry of store instances.
///
/// Built once at startup and shared read-only afterwards. Each store has
/// exactly one instance, reachable through its name and its code.
#[derive(Default)]
pub struct StoreRegistry {
    stores: BTreeMap<StoreName, Arc<dyn Store>>,
}

impl StoreRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build every configured store.
    ///
    /// Each store gets a transport chosen by its API tunnel policy and a
    /// listing cache backed by `cache`.
    pub fn from_config(
        config: &StoresConfig,
        transport: &TransportConfig,
        cache: Arc<dyn Cache<Vec<MagnetSummary>>>,
    ) -> Result<Self> {
        let mut registry = Self::new();
        let ttl = Duration::from_secs(config.listing_cache_ttl_secs);

        if let Some(pikpak) = &config.pikpak {
            let name = StoreName::PikPak;
            let http = http_client(StoreTunnel::for_api(name), transport)?;
            let listing = ListingCache::new(name, cache.clone(), ttl);
            let store =
                PikPakStore::from_config(pikpak, Arc::new(PikPakClient::new(http)), listing);
            registry.register(Arc::new(store))?;
        }

        if let Some(seedr) = &config.seedr {
            let name = StoreName::Seedr;
            let http = http_client(StoreTunnel::for_api(name), transport)?;
            let listing = ListingCache::new(name, cache.clone(), ttl);
            let store = SeedrStore::from_config(seedr, Arc::new(SeedrClient::new(http)), listing);
            registry.register(Arc::new(store))?;
        }

        info!(stores = registry.stores.len(), "store registry built");
        Ok(registry)
    }

    /// Register a store.
    ///
    /// # Errors
    /// - `AlreadyExists` if a store with the same identity is registered
    pub fn register(&mut self, store: Arc<dyn Store>) -> Result<()> {
        let name = store.name();
        if self.stores.contains_key(&name) {
            return Err(Error::AlreadyExists(format!(
                "Store '{}' is already registered",
                name
            )));
        }
        self.stores.insert(name, store);
        Ok(())
    }

    /// Resolve a store by canonical name or short code.
    pub fn resolve(&self, name_or_code: &str) -> Option<Arc<dyn Store>> {
        StoreName::from_identity(name_or_code).and_then(|name| self.get(name))
    }

    pub fn get(&self, name: StoreName) -> Option<Arc<dyn Store>> {
        self.stores.get(&name).cloned()
    }

    /// Identities of the registered stores.
    pub fn stores(&self) -> Vec<StoreName> {
        self.stores.keys().copied().collect()
    }

    /// Check if a store is registered.
    pub fn has_store(&self, name: StoreName) -> bool {
        self.stores.contains_key(&name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;

    fn cache() -> Arc<dyn Cache<Vec<MagnetSummary>>> {
        Arc::new(MemoryCache::<Vec<MagnetSummary>>::new())
    }

    fn config() -> StoresConfig {
        StoresConfig {
            pikpak: Some(PikPakConfig::default()),
            seedr: Some(SeedrConfig::default()),
            ..Default::default()
        }
    }

    #[test]
    fn test_name_and_code_resolve_to_same_instance() {
        let registry =
            StoreRegistry::from_config(&config(), &TransportConfig::default(), cache()).unwrap();

        let by_name = registry.resolve("pikpak").unwrap();
        let by_code = registry.resolve("pp").unwrap();
        assert!(Arc::ptr_eq(&by_name, &by_code));
        assert_eq!(by_name.name(), StoreName::PikPak);

        let seedr = registry.resolve("sd").unwrap();
        assert!(!Arc::ptr_eq(&by_name, &seedr));
    }

    #[test]
    fn test_unknown_and_unconfigured_resolve_to_none() {
        let config = StoresConfig {
            seedr: None,
            ..config()
        };
        let registry =
            StoreRegistry::from_config(&config, &TransportConfig::default(), cache()).unwrap();

        assert!(registry.resolve("nope").is_none());
        assert!(registry.resolve("seedr").is_none());
        assert!(registry.resolve("realdebrid").is_none());
        assert_eq!(registry.stores(), vec![StoreName::PikPak]);
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut registry = StoreRegistry::new();
        let listing = || ListingCache::new(StoreName::Seedr, cache(), ListingCache::DEFAULT_TTL);
        let store = || {
            Arc::new(SeedrStore::new(
                Arc::new(SeedrClient::new(reqwest::Client::new())),
                listing(),
            ))
        };

        registry.register(store()).unwrap();
        let result = registry.register(store());
        assert!(matches!(result, Err(Error::AlreadyExists(_))));
        assert!(registry.has_store(StoreName::Seedr));
    }

    #[test]
    fn test_config_defaults() {
        let config: StoresConfig = serde_json::from_str("{}").unwrap();
        assert!(config.pikpak.is_none());
        assert_eq!(config.listing_cache_ttl_secs, 300);
    }
}
