//! Seedr store adapter.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tracing::debug;

use debridgate_common::{Error, Result, StoreName};

use crate::flatten::{flatten_folder, FolderEntry, FolderPage, FolderSource};
use crate::listing::{account_key, ListingCache};
use crate::locked_link::LockedFileLink;
use crate::models::{
    AddMagnetInput, CheckMagnetItem, ListMagnetsData, ListMagnetsParams, MagnetItem,
    MagnetStatus, MagnetSummary, SubscriptionStatus, User,
};
use crate::store::{Store, StoreContext};

use super::client::SeedrApi;
use super::types::FolderContents;

/// Seedr store configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeedrConfig {
    /// `email:password` used when a request carries no credential.
    #[serde(default)]
    pub api_key: Option<String>,
}

/// Cloud-only drive: every top-level folder is one content item.
///
/// Seedr exposes no way to add, remove or check magnets through this
/// gateway, so those capabilities report [`Error::Unsupported`].
pub struct SeedrStore {
    api: Arc<dyn SeedrApi>,
    api_key: Option<String>,
    listing: ListingCache,
}

impl SeedrStore {
    pub fn new(api: Arc<dyn SeedrApi>, listing: ListingCache) -> Self {
        Self {
            api,
            api_key: None,
            listing,
        }
    }

    pub fn from_config(
        config: &SeedrConfig,
        api: Arc<dyn SeedrApi>,
        listing: ListingCache,
    ) -> Self {
        Self {
            api_key: config.api_key.clone(),
            ..Self::new(api, listing)
        }
    }

    /// Set the fallback credential.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    fn api_key<'a>(&'a self, ctx: &'a StoreContext) -> Result<&'a str> {
        ctx.api_key_or(self.api_key.as_deref())
    }

    async fn fetch_listing(&self, api_key: &str) -> Result<Vec<MagnetSummary>> {
        let root = self.api.get_root(api_key).await?;
        Ok(root
            .folders
            .into_iter()
            .map(|f| MagnetSummary {
                id: f.id.to_string(),
                name: f.name,
                hash: String::new(),
                size: f.size,
                status: MagnetStatus::Downloaded,
                added_at: parse_time(&f.last_update),
            })
            .collect())
    }
}

/// Seedr ids are numeric.
fn parse_id(id: &str) -> Option<u64> {
    id.parse().ok()
}

fn parse_time(value: &str) -> DateTime<Utc> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .map(|t| t.and_utc())
        .or_else(|_| DateTime::parse_from_rfc3339(value).map(|t| t.with_timezone(&Utc)))
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

/// Folder listing view over one account.
struct AccountFolders<'a> {
    api: &'a dyn SeedrApi,
    api_key: &'a str,
    /// A folder the caller already fetched, served once instead of refetched.
    prefetched: Mutex<Option<(u64, FolderContents)>>,
}

impl<'a> AccountFolders<'a> {
    fn new(api: &'a dyn SeedrApi, api_key: &'a str) -> Self {
        Self {
            api,
            api_key,
            prefetched: Mutex::new(None),
        }
    }

    fn with_prefetched(self, folder_id: u64, contents: FolderContents) -> Self {
        Self {
            prefetched: Mutex::new(Some((folder_id, contents))),
            ..self
        }
    }

    fn take_prefetched(&self, folder_id: u64) -> Option<FolderContents> {
        let mut slot = self.prefetched.lock().ok()?;
        match slot.take() {
            Some((id, contents)) if id == folder_id => Some(contents),
            other => {
                *slot = other;
                None
            }
        }
    }

    fn page(contents: FolderContents) -> FolderPage {
        let folders = contents.folders.into_iter().map(|f| FolderEntry::Folder {
            id: f.id.to_string(),
            name: f.name,
        });
        let files = contents.files.into_iter().map(|f| FolderEntry::File {
            id: f.folder_file_id.to_string(),
            name: f.name,
            size: f.size,
        });

        FolderPage {
            entries: files.chain(folders).collect(),
            next_page_token: None,
        }
    }
}

#[async_trait]
impl FolderSource for AccountFolders<'_> {
    async fn list_folder(&self, folder_id: &str, _page_token: Option<&str>) -> Result<FolderPage> {
        let folder_id = parse_id(folder_id).ok_or_else(|| {
            Error::CorruptListing(format!("non-numeric seedr folder id: {}", folder_id))
        })?;
        let contents = match self.take_prefetched(folder_id) {
            Some(contents) => contents,
            None => self.api.get_folder(self.api_key, folder_id).await?,
        };
        Ok(Self::page(contents))
    }
}

#[async_trait]
impl Store for SeedrStore {
    fn name(&self) -> StoreName {
        StoreName::Seedr
    }

    async fn get_user(&self, ctx: &StoreContext) -> Result<User> {
        let account = self.api.get_account(self.api_key(ctx)?).await?;
        Ok(User {
            id: account.username,
            email: account.email,
            subscription_status: if account.is_premium {
                SubscriptionStatus::Premium
            } else {
                SubscriptionStatus::Expired
            },
        })
    }

    async fn add_magnet(&self, _ctx: &StoreContext, _input: AddMagnetInput) -> Result<MagnetItem> {
        Err(Error::unsupported(self.name(), "add magnet"))
    }

    async fn get_magnet(&self, ctx: &StoreContext, id: &str) -> Result<MagnetItem> {
        let folder_id = parse_id(id)
            .ok_or_else(|| Error::InvalidInput(format!("Invalid seedr folder id: {}", id)))?;
        let api_key = self.api_key(ctx)?;
        let contents = self.api.get_folder(api_key, folder_id).await?;
        let name = contents.name.clone();
        let added_at = parse_time(&contents.last_update);

        let source =
            AccountFolders::new(self.api.as_ref(), api_key).with_prefetched(folder_id, contents);
        let flat = flatten_folder(&source, self.name(), id, &ctx.cancel).await?;
        debug!(store = %self.name(), id, files = flat.files.len(), "folder flattened");

        Ok(MagnetItem {
            id: id.to_string(),
            name,
            hash: String::new(),
            magnet: String::new(),
            size: flat.size,
            status: MagnetStatus::Downloaded,
            files: flat.files,
            added_at,
        })
    }

    async fn list_magnets(
        &self,
        ctx: &StoreContext,
        params: ListMagnetsParams,
    ) -> Result<ListMagnetsData> {
        let api_key = self.api_key(ctx)?;
        self.listing
            .list(&account_key(api_key), params, || self.fetch_listing(api_key))
            .await
    }

    async fn remove_magnet(&self, _ctx: &StoreContext, _id: &str) -> Result<String> {
        Err(Error::unsupported(self.name(), "remove magnet"))
    }

    async fn check_magnet(
        &self,
        _ctx: &StoreContext,
        _magnets: &[String],
    ) -> Result<Vec<CheckMagnetItem>> {
        Err(Error::unsupported(self.name(), "check magnet"))
    }

    async fn generate_link(&self, ctx: &StoreContext, link: &str) -> Result<String> {
        let locked = LockedFileLink::decode(self.name(), link)?;
        let file_id = parse_id(&locked.file_id).ok_or_else(|| {
            Error::InvalidLink(format!("Invalid seedr file id: {}", locked.file_id))
        })?;
        let api_key = self.api_key(ctx)?;
        let file = self.api.get_file(api_key, file_id).await?;

        if file.url.is_empty() {
            return Err(Error::NotFound(format!(
                "No download link for file {}",
                locked.file_id
            )));
        }
        Ok(file.url)
    }
}
