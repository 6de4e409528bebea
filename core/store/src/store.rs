//! Store capability contract.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use debridgate_common::{Error, Result, StoreName};

use crate::browse::DriveBrowser;
use crate::models::{
    AddMagnetInput, CheckMagnetItem, ListMagnetsData, ListMagnetsParams, MagnetItem, User,
};

/// Per-request context handed to every store call.
#[derive(Debug, Clone, Default)]
pub struct StoreContext {
    /// Credential of the account the request acts for. Falls back to the
    /// store's configured credential when absent.
    pub api_key: Option<String>,
    /// Address of the end client, forwarded to collaborators that care.
    pub client_ip: Option<String>,
    /// Cancelled when the surrounding request is aborted or times out.
    pub cancel: CancellationToken,
}

impl StoreContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_client_ip(mut self, client_ip: impl Into<String>) -> Self {
        self.client_ip = Some(client_ip.into());
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Pick the request credential, or `default` when the request has none.
    pub fn api_key_or<'a>(&'a self, default: Option<&'a str>) -> Result<&'a str> {
        self.api_key
            .as_deref()
            .or(default)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| Error::InvalidInput("Missing store api key".to_string()))
    }

    /// Fail with `Cancelled` if the caller has gone away.
    pub fn ensure_active(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            Err(Error::Cancelled("request cancelled".to_string()))
        } else {
            Ok(())
        }
    }
}

/// Uniform capability surface implemented by every backend.
///
/// A store without a native notion of a capability (e.g. a pure cloud drive
/// has no way to add magnets) returns [`Error::Unsupported`] for it.
#[async_trait]
pub trait Store: Send + Sync {
    /// Identity of this store.
    fn name(&self) -> StoreName;

    /// Account information for the request credential.
    async fn get_user(&self, ctx: &StoreContext) -> Result<User>;

    /// Add a magnet or torrent.
    ///
    /// Stores with asynchronous ingestion return a best-effort item
    /// (`queued`, `downloading` or `failed`) when the backend has not
    /// finished within the polling budget.
    async fn add_magnet(&self, ctx: &StoreContext, input: AddMagnetInput) -> Result<MagnetItem>;

    /// Fetch one content item with its flattened files.
    ///
    /// # Errors
    /// - `NotFound` if the item does not exist upstream
    async fn get_magnet(&self, ctx: &StoreContext, id: &str) -> Result<MagnetItem>;

    /// List content items, most recently added first.
    async fn list_magnets(
        &self,
        ctx: &StoreContext,
        params: ListMagnetsParams,
    ) -> Result<ListMagnetsData>;

    /// Remove a content item and return its id.
    async fn remove_magnet(&self, ctx: &StoreContext, id: &str) -> Result<String>;

    /// Report the cache status of each magnet.
    async fn check_magnet(
        &self,
        ctx: &StoreContext,
        magnets: &[String],
    ) -> Result<Vec<CheckMagnetItem>>;

    /// Turn a locked link into a raw backend URL.
    ///
    /// # Errors
    /// - `InvalidLink` if the link is malformed or belongs to another store
    async fn generate_link(&self, ctx: &StoreContext, link: &str) -> Result<String>;

    /// Raw drive browsing, for stores backed by a browsable drive.
    fn browser(&self) -> Option<&dyn DriveBrowser> {
        None
    }
}
