//! Short-lived cache of complete magnet listings.

use blake2::digest::consts::U16;
use blake2::{Blake2b, Digest};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use debridgate_common::{Result, StoreName};

use crate::cache::Cache;
use crate::models::{ListMagnetsData, ListMagnetsParams, MagnetSummary};

/// Stable, non-reversible account identity for a store credential.
pub fn account_key(credential: &str) -> String {
    let mut hasher = Blake2b::<U16>::new();
    hasher.update(credential.as_bytes());
    hex::encode(hasher.finalize())
}

/// Listing cache for one store.
///
/// Holds the full, sorted listing per account and slices it locally, so
/// paginated requests do not hit the backend each time. Mutations must call
/// [`ListingCache::invalidate`] before returning.
#[derive(Clone)]
pub struct ListingCache {
    store: StoreName,
    cache: Arc<dyn Cache<Vec<MagnetSummary>>>,
    ttl: Duration,
}

impl ListingCache {
    /// Default lifetime of a cached listing.
    pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

    pub fn new(store: StoreName, cache: Arc<dyn Cache<Vec<MagnetSummary>>>, ttl: Duration) -> Self {
        Self { store, cache, ttl }
    }

    fn key(&self, account: &str) -> String {
        format!("store:{}:listMagnets:{}", self.store, account)
    }

    /// Serve a page from cache, or fetch, sort and cache the full listing.
    pub async fn list<F, Fut>(
        &self,
        account: &str,
        params: ListMagnetsParams,
        fetch: F,
    ) -> Result<ListMagnetsData>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<MagnetSummary>>>,
    {
        let key = self.key(account);

        if let Some(items) = self.cache.get(&key).await {
            debug!(store = %self.store, items = items.len(), "listing cache hit");
            return Ok(params.slice(&items));
        }

        let mut items = fetch().await?;
        items.sort_by(|a, b| b.added_at.cmp(&a.added_at));
        debug!(store = %self.store, items = items.len(), "listing cache filled");

        let page = params.slice(&items);
        self.cache.set(&key, items, self.ttl).await;
        Ok(page)
    }

    /// Drop the cached listing for `account`.
    pub async fn invalidate(&self, account: &str) {
        self.cache.delete(&self.key(account)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::models::MagnetStatus;
    use chrono::{TimeZone, Utc};
    use std::sync::atomic::{AtomicU32, Ordering};

    fn summary(id: &str, added_secs: i64) -> MagnetSummary {
        MagnetSummary {
            id: id.to_string(),
            name: id.to_string(),
            hash: String::new(),
            size: 1,
            status: MagnetStatus::Downloaded,
            added_at: Utc.timestamp_opt(added_secs, 0).unwrap(),
        }
    }

    fn listing() -> ListingCache {
        ListingCache::new(
            StoreName::PikPak,
            Arc::new(MemoryCache::<Vec<MagnetSummary>>::new()),
            ListingCache::DEFAULT_TTL,
        )
    }

    #[test]
    fn test_account_key_hides_credential() {
        let key = account_key("secret-token");
        assert_eq!(key.len(), 32);
        assert!(!key.contains("secret"));
        assert_eq!(key, account_key("secret-token"));
        assert_ne!(key, account_key("other-token"));
    }

    #[tokio::test]
    async fn test_sorted_newest_first_and_cached() {
        let listing = listing();
        let fetches = AtomicU32::new(0);
        let counter = &fetches;

        let fetch = move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(vec![summary("old", 10), summary("new", 30), summary("mid", 20)])
        };
        let page = listing
            .list("acct", ListMagnetsParams::new(0, 2), fetch)
            .await
            .unwrap();
        let ids: Vec<_> = page.items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, ["new", "mid"]);
        assert_eq!(page.total_items, 3);

        let page = listing
            .list("acct", ListMagnetsParams::new(2, 2), move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(vec![])
            })
            .await
            .unwrap();
        assert_eq!(page.items[0].id, "old");
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalidate_forces_refetch() {
        let listing = listing();
        listing
            .list("acct", ListMagnetsParams::default(), || async {
                Ok(vec![summary("a", 1)])
            })
            .await
            .unwrap();

        listing.invalidate("acct").await;

        let page = listing
            .list("acct", ListMagnetsParams::default(), || async { Ok(vec![]) })
            .await
            .unwrap();
        assert_eq!(page.total_items, 0);
    }

    #[tokio::test]
    async fn test_accounts_are_isolated() {
        let listing = listing();
        listing
            .list("one", ListMagnetsParams::default(), || async {
                Ok(vec![summary("a", 1)])
            })
            .await
            .unwrap();

        let page = listing
            .list("two", ListMagnetsParams::default(), || async { Ok(vec![]) })
            .await
            .unwrap();
        assert_eq!(page.total_items, 0);
    }
}
