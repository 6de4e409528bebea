//! PikPak store adapter.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use debridgate_common::{Error, Result, StoreName};

use crate::availability::{Availability, UnknownAvailability};
use crate::browse::{DriveBrowser, DriveItem, DriveItemKind, DrivePage, ListFilesQuery};
use crate::flatten::{flatten_folder, FolderEntry, FolderPage, FolderSource};
use crate::listing::{account_key, ListingCache};
use crate::locked_link::LockedFileLink;
use crate::magnet::MagnetLink;
use crate::models::{
    AddMagnetInput, CheckMagnetItem, ListMagnetsData, ListMagnetsParams, MagnetFile, MagnetItem,
    MagnetStatus, MagnetSummary, SubscriptionStatus, User,
};
use crate::poll::{wait_for_completion, PollFailure, PollPolicy, TaskPhase};
use crate::store::{Store, StoreContext};

use super::client::PikPakApi;
use super::types::{
    File, ListFilesParams, Task, FILE_KIND_FILE, FILE_KIND_FOLDER, MY_PACK_FOLDER, PHASE_COMPLETE,
    PHASE_ERROR, PHASE_RUNNING, VIP_TYPE_PLATINUM,
};

/// How many recent tasks are searched for a pending one.
const RECENT_TASK_LIMIT: u32 = 200;

/// PikPak store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PikPakConfig {
    /// Access token used when a request carries none.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Task re-fetches after adding a magnet.
    #[serde(default = "default_poll_retries")]
    pub poll_retries: u32,
    /// Pause between task fetches.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_poll_retries() -> u32 {
    PollPolicy::default().retries
}

fn default_poll_interval_ms() -> u64 {
    PollPolicy::default().retry_interval.as_millis() as u64
}

impl PikPakConfig {
    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy::new(self.poll_retries)
            .with_retry_interval(Duration::from_millis(self.poll_interval_ms))
    }
}

impl Default for PikPakConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            poll_retries: default_poll_retries(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

/// Torrent-capable cloud drive with asynchronous offline downloads.
///
/// Downloads land in the account's "My Pack" folder; every folder there is
/// exposed as one content item.
pub struct PikPakStore {
    api: Arc<dyn PikPakApi>,
    api_key: Option<String>,
    poll: PollPolicy,
    listing: ListingCache,
    availability: Arc<dyn Availability>,
}

impl PikPakStore {
    /// Create a store over `api`, caching listings in `listing`.
    pub fn new(api: Arc<dyn PikPakApi>, listing: ListingCache) -> Self {
        Self {
            api,
            api_key: None,
            poll: PollPolicy::default(),
            listing,
            availability: Arc::new(UnknownAvailability),
        }
    }

    /// Create a store from its configuration section.
    pub fn from_config(
        config: &PikPakConfig,
        api: Arc<dyn PikPakApi>,
        listing: ListingCache,
    ) -> Self {
        let mut store = Self::new(api, listing).with_poll_policy(config.poll_policy());
        store.api_key = config.api_key.clone();
        store
    }

    /// Set the fallback access token.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_poll_policy(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    pub fn with_availability(mut self, availability: Arc<dyn Availability>) -> Self {
        self.availability = availability;
        self
    }

    fn api_key<'a>(&'a self, ctx: &'a StoreContext) -> Result<&'a str> {
        ctx.api_key_or(self.api_key.as_deref())
    }

    async fn my_pack_folder(&self, api_key: &str) -> Result<File> {
        let list = self.api.list_files(api_key, &ListFilesParams::new("")).await?;
        list.files
            .into_iter()
            .find(|f| f.name == MY_PACK_FOLDER)
            .ok_or_else(|| Error::upstream(self.name(), "'My Pack' folder missing"))
    }

    /// Every completed item in "My Pack", across all pages.
    async fn my_pack_files(&self, api_key: &str) -> Result<Vec<File>> {
        let folder = self.my_pack_folder(api_key).await?;

        let mut files = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let params = ListFilesParams::new(folder.id.clone()).with_page_token(page_token);
            let list = self.api.list_files(api_key, &params).await?;
            files.extend(list.files);

            if list.next_page_token.is_empty() {
                return Ok(files);
            }
            page_token = Some(list.next_page_token);
        }
    }

    async fn find_by_hash(&self, api_key: &str, hash: &str) -> Result<Option<File>> {
        let files = self.my_pack_files(api_key).await?;
        Ok(files
            .into_iter()
            .find(|f| f.params.url.to_ascii_lowercase().contains(hash)))
    }

    async fn recent_task(&self, api_key: &str, task_id: &str) -> Result<Task> {
        self.api
            .list_tasks(api_key, RECENT_TASK_LIMIT)
            .await?
            .into_iter()
            .find(|t| t.id == task_id)
            .ok_or_else(|| Error::upstream(self.name(), format!("task not found: {}", task_id)))
    }

    /// Build a full content item from drive metadata.
    async fn magnet_from_file(
        &self,
        ctx: &StoreContext,
        api_key: &str,
        file: File,
    ) -> Result<MagnetItem> {
        let hash = MagnetLink::parse(&file.params.url)
            .map(|m| m.hash)
            .unwrap_or_default();

        let mut item = MagnetItem {
            id: file.id.clone(),
            name: file.name.clone(),
            hash,
            magnet: String::new(),
            size: -1,
            status: MagnetStatus::Downloading,
            files: Vec::new(),
            added_at: parse_time(&file.created_time),
        };

        if !file.is_complete() {
            return Ok(item);
        }
        item.status = MagnetStatus::Downloaded;

        if file.is_folder() {
            let source = DriveFolders {
                api: self.api.as_ref(),
                api_key,
            };
            let flat = flatten_folder(&source, self.name(), &file.id, &ctx.cancel).await?;
            item.size = flat.size;
            item.files = flat.files;
        } else {
            item.size = file.size_bytes();
            item.files.push(MagnetFile {
                idx: -1,
                name: file.name.clone(),
                path: format!("/{}", file.name),
                size: item.size,
                link: LockedFileLink::new(&file.id, &file.id).encode(self.name()),
                source: self.name().code().to_string(),
            });
        }

        Ok(item)
    }

    async fn fetch_listing(&self, api_key: &str) -> Result<Vec<MagnetSummary>> {
        let files = self.my_pack_files(api_key).await?;

        Ok(files
            .into_iter()
            .filter(|f| f.params.url.starts_with("magnet:"))
            .filter_map(|f| {
                let magnet = MagnetLink::parse(&f.params.url).ok()?;
                Some(MagnetSummary {
                    size: f.size_bytes(),
                    status: if f.is_complete() {
                        MagnetStatus::Downloaded
                    } else {
                        MagnetStatus::Downloading
                    },
                    added_at: parse_time(&f.created_time),
                    hash: magnet.hash,
                    id: f.id,
                    name: f.name,
                })
            })
            .collect())
    }
}

fn task_phase(task: &Task) -> TaskPhase {
    match task.phase.as_str() {
        PHASE_COMPLETE => TaskPhase::Complete,
        PHASE_ERROR => TaskPhase::Error,
        _ => TaskPhase::Pending,
    }
}

fn parse_time(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

fn drive_item(file: File) -> DriveItem {
    let download_link = file
        .medias
        .iter()
        .map(|m| m.link.url.as_str())
        .find(|url| !url.is_empty())
        .map(str::to_string);

    DriveItem {
        size: file.size_bytes(),
        kind: if file.is_folder() {
            DriveItemKind::Folder
        } else {
            DriveItemKind::File
        },
        created_at: parse_time(&file.created_time),
        modified_at: parse_time(&file.modified_time),
        download_link,
        id: file.id,
        name: file.name,
        mime_type: file.mime_type,
        parent_id: file.parent_id,
        hash: file.hash,
        path: String::new(),
    }
}

/// Folder listing view over one account's drive.
struct DriveFolders<'a> {
    api: &'a dyn PikPakApi,
    api_key: &'a str,
}

#[async_trait]
impl FolderSource for DriveFolders<'_> {
    async fn list_folder(&self, folder_id: &str, page_token: Option<&str>) -> Result<FolderPage> {
        let params =
            ListFilesParams::new(folder_id).with_page_token(page_token.map(str::to_string));
        let list = self.api.list_files(self.api_key, &params).await?;

        let entries = list
            .files
            .into_iter()
            .map(|f| {
                if f.is_folder() {
                    FolderEntry::Folder {
                        id: f.id,
                        name: f.name,
                    }
                } else {
                    FolderEntry::File {
                        size: f.size_bytes(),
                        id: f.id,
                        name: f.name,
                    }
                }
            })
            .collect();

        Ok(FolderPage {
            entries,
            next_page_token: Some(list.next_page_token).filter(|t| !t.is_empty()),
        })
    }
}

#[async_trait]
impl DriveBrowser for PikPakStore {
    async fn list_files(&self, ctx: &StoreContext, query: &ListFilesQuery) -> Result<DrivePage> {
        let api_key = self.api_key(ctx)?;
        let kind = query.kind.map(|kind| match kind {
            DriveItemKind::Folder => FILE_KIND_FOLDER,
            DriveItemKind::File => FILE_KIND_FILE,
        });
        let params = ListFilesParams::browse(query.parent_id.clone(), query.effective_page_size())
            .with_page_token(query.page_token.clone())
            .with_kind(kind)
            .with_mime_type(query.mime_type.clone());

        let list = self.api.list_files(api_key, &params).await?;
        let files = list.files.into_iter().map(drive_item).collect();
        Ok(DrivePage::new(files, Some(list.next_page_token)))
    }

    async fn get_file_details(&self, ctx: &StoreContext, file_id: &str) -> Result<DriveItem> {
        let api_key = self.api_key(ctx)?;
        let file = self.api.get_file(api_key, file_id).await?;
        Ok(drive_item(file))
    }
}

#[async_trait]
impl Store for PikPakStore {
    fn name(&self) -> StoreName {
        StoreName::PikPak
    }

    async fn get_user(&self, ctx: &StoreContext) -> Result<User> {
        let api_key = self.api_key(ctx)?;
        let user = self.api.get_user(api_key).await?;
        let vip_type = self.api.get_vip_type(api_key).await?;

        Ok(User {
            id: user.sub,
            email: user.email,
            subscription_status: if vip_type == VIP_TYPE_PLATINUM {
                SubscriptionStatus::Premium
            } else {
                SubscriptionStatus::Trial
            },
        })
    }

    async fn add_magnet(&self, ctx: &StoreContext, input: AddMagnetInput) -> Result<MagnetItem> {
        let magnet = match input {
            AddMagnetInput::Magnet(link) => MagnetLink::parse(&link)?,
            AddMagnetInput::Torrent(_) => {
                return Err(Error::unsupported(self.name(), "add torrent file"))
            }
        };
        let api_key = self.api_key(ctx)?;
        ctx.ensure_active()?;

        if let Some(file) = self.find_by_hash(api_key, &magnet.hash).await? {
            debug!(store = %self.name(), id = %file.id, "magnet already present");
            let mut item = self.magnet_from_file(ctx, api_key, file).await?;
            item.hash = magnet.hash;
            item.magnet = magnet.link;
            return Ok(item);
        }

        let task = self.api.add_url(api_key, &magnet.raw_link).await?;
        self.listing.invalidate(&account_key(api_key)).await;
        info!(store = %self.name(), task = %task.id, "offline task created");

        let mut item = MagnetItem {
            id: task.file_id.clone(),
            name: magnet.name.clone(),
            hash: magnet.hash.clone(),
            magnet: magnet.link.clone(),
            size: -1,
            status: MagnetStatus::Queued,
            files: Vec::new(),
            added_at: Utc::now(),
        };

        let this = self;
        let task_id = task.id.as_str();
        let polled = wait_for_completion(
            move || this.recent_task(api_key, task_id),
            task_phase,
            &self.poll,
            &ctx.cancel,
        )
        .await;
        // Listings fetched while polling predate the new item.
        self.listing.invalidate(&account_key(api_key)).await;

        match polled {
            Ok(_) => {
                let file = self.api.get_file(api_key, &item.id).await?;
                let full = self.magnet_from_file(ctx, api_key, file).await?;
                item.name = full.name;
                item.size = full.size;
                item.status = full.status;
                item.files = full.files;
                item.added_at = full.added_at;
            }
            Err(PollFailure {
                error: Error::Cancelled(reason),
                ..
            }) => return Err(Error::Cancelled(reason)),
            Err(failure) => {
                warn!(
                    store = %self.name(),
                    task = %task.id,
                    error = %failure.error,
                    "offline task not complete"
                );
                item.status = match failure.last.as_ref().map(|t| t.phase.as_str()) {
                    Some(PHASE_ERROR) => MagnetStatus::Failed,
                    Some(PHASE_RUNNING) => MagnetStatus::Downloading,
                    _ => MagnetStatus::Queued,
                };
            }
        }

        Ok(item)
    }

    async fn get_magnet(&self, ctx: &StoreContext, id: &str) -> Result<MagnetItem> {
        let api_key = self.api_key(ctx)?;
        let file = self.api.get_file(api_key, id).await?;
        self.magnet_from_file(ctx, api_key, file).await
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

    async fn remove_magnet(&self, ctx: &StoreContext, id: &str) -> Result<String> {
        let api_key = self.api_key(ctx)?;
        self.api.trash(api_key, &[id.to_string()]).await?;
        self.listing.invalidate(&account_key(api_key)).await;
        info!(store = %self.name(), id, "magnet removed");
        Ok(id.to_string())
    }

    async fn check_magnet(
        &self,
        ctx: &StoreContext,
        magnets: &[String],
    ) -> Result<Vec<CheckMagnetItem>> {
        let magnets = magnets
            .iter()
            .map(|m| MagnetLink::parse(m))
            .collect::<Result<Vec<_>>>()?;
        self.availability.check(self.name(), &magnets, ctx).await
    }

    async fn generate_link(&self, ctx: &StoreContext, link: &str) -> Result<String> {
        let locked = LockedFileLink::decode(self.name(), link)?;
        let api_key = self.api_key(ctx)?;
        let file = self.api.get_file(api_key, &locked.file_id).await?;

        file.medias
            .iter()
            .map(|m| m.link.url.as_str())
            .chain(std::iter::once(file.web_content_link.as_str()))
            .find(|url| !url.is_empty())
            .map(str::to_string)
            .ok_or_else(|| Error::NotFound(format!("No download link for file {}", file.id)))
    }

    fn browser(&self) -> Option<&dyn DriveBrowser> {
        Some(self)
    }
}
