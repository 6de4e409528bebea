//! Raw drive browsing for stores backed by a cloud drive.
//!
//! Unlike the content-item view of [`Store`](crate::store::Store), these
//! calls expose the drive's own files and folders, including ones that did
//! not come from a magnet.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use tracing::debug;

use debridgate_common::{Error, Result};

use crate::flatten::MAX_FOLDER_DEPTH;
use crate::store::StoreContext;

/// Page size used when a caller asks for none.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// MIME types treated as video.
pub const VIDEO_MIME_TYPES: &[&str] = &[
    "video/mp4",
    "video/x-matroska",
    "video/avi",
    "video/quicktime",
    "video/x-msvideo",
    "video/webm",
    "video/mpeg",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriveItemKind {
    Folder,
    File,
}

/// A file or folder on the drive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriveItem {
    pub id: String,
    pub name: String,
    /// Bytes, `-1` when unknown.
    pub size: i64,
    #[serde(rename = "type")]
    pub kind: DriveItemKind,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub mime_type: String,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub parent_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub hash: String,
    /// Direct link when the backend already has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_link: Option<String>,
    /// Position below the listed folder (`/sub/file.mkv`); empty for
    /// single-folder listings.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,
}

impl DriveItem {
    pub fn is_folder(&self) -> bool {
        self.kind == DriveItemKind::Folder
    }

    pub fn is_video(&self) -> bool {
        self.kind == DriveItemKind::File && VIDEO_MIME_TYPES.contains(&self.mime_type.as_str())
    }
}

/// Query for one folder page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListFilesQuery {
    /// Folder to list, empty for the drive root.
    #[serde(default)]
    pub parent_id: String,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default)]
    pub page_token: Option<String>,
    /// Only folders or only files.
    #[serde(default)]
    pub kind: Option<DriveItemKind>,
    #[serde(default)]
    pub mime_type: Option<String>,
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

impl Default for ListFilesQuery {
    fn default() -> Self {
        Self::new("")
    }
}

impl ListFilesQuery {
    pub fn new(parent_id: impl Into<String>) -> Self {
        Self {
            parent_id: parent_id.into(),
            page_size: DEFAULT_PAGE_SIZE,
            page_token: None,
            kind: None,
            mime_type: None,
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_page_token(mut self, page_token: Option<String>) -> Self {
        self.page_token = page_token;
        self
    }

    pub fn with_kind(mut self, kind: DriveItemKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Page size with `0` replaced by the default.
    pub fn effective_page_size(&self) -> u32 {
        if self.page_size == 0 {
            DEFAULT_PAGE_SIZE
        } else {
            self.page_size
        }
    }
}

/// One page of drive items.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DrivePage {
    pub files: Vec<DriveItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
    pub has_more: bool,
}

impl DrivePage {
    pub fn new(files: Vec<DriveItem>, next_page_token: Option<String>) -> Self {
        let next_page_token = next_page_token.filter(|t| !t.is_empty());
        Self {
            files,
            has_more: next_page_token.is_some(),
            next_page_token,
        }
    }
}

/// Raw file browsing over a drive-style backend.
///
/// Implementors supply single-page listings and metadata lookups; the
/// walking, searching and filtering calls are built on those two.
#[async_trait]
pub trait DriveBrowser: Send + Sync {
    /// One page of a folder's non-trashed children.
    async fn list_files(&self, ctx: &StoreContext, query: &ListFilesQuery) -> Result<DrivePage>;

    /// Metadata of a single file or folder.
    async fn get_file_details(&self, ctx: &StoreContext, file_id: &str) -> Result<DriveItem>;

    /// Every item below `parent_id`, folders included, depth first.
    ///
    /// # Errors
    /// - `CorruptListing` if nesting exceeds [`MAX_FOLDER_DEPTH`]
    /// - `Cancelled` if the request is cancelled between pages
    async fn list_files_recursive(
        &self,
        ctx: &StoreContext,
        parent_id: &str,
    ) -> Result<Vec<DriveItem>> {
        let walk = Walk {
            browser: self,
            ctx,
            root_id: parent_id,
            files_only: false,
        };
        walk.run().await
    }

    /// Every file below `parent_id`, with paths from the listed folder.
    async fn list_files_flat(&self, ctx: &StoreContext, parent_id: &str) -> Result<Vec<DriveItem>> {
        let walk = Walk {
            browser: self,
            ctx,
            root_id: parent_id,
            files_only: true,
        };
        walk.run().await
    }

    /// Case-insensitive name match over one page of the drive root.
    ///
    /// # Errors
    /// - `InvalidInput` if `query` is blank
    async fn search_files(
        &self,
        ctx: &StoreContext,
        query: &str,
        page_token: Option<String>,
    ) -> Result<DrivePage> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Err(Error::InvalidInput(
                "search query cannot be empty".to_string(),
            ));
        }

        let mut page = self
            .list_files(ctx, &ListFilesQuery::new("").with_page_token(page_token))
            .await?;
        page.files
            .retain(|f| f.name.to_lowercase().contains(&needle));
        Ok(page)
    }

    /// The folder directly below `parent_id` called `name`.
    ///
    /// # Errors
    /// - `NotFound` if no such folder exists
    async fn get_folder_by_name(
        &self,
        ctx: &StoreContext,
        parent_id: &str,
        name: &str,
    ) -> Result<DriveItem> {
        let mut page_token = None;
        loop {
            ctx.ensure_active()?;
            let query = ListFilesQuery::new(parent_id)
                .with_kind(DriveItemKind::Folder)
                .with_page_token(page_token);
            let page = self.list_files(ctx, &query).await?;

            if let Some(found) = page.files.into_iter().find(|f| f.is_folder() && f.name == name) {
                return Ok(found);
            }
            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => return Err(Error::NotFound(format!("folder not found: {}", name))),
            }
        }
    }

    /// Video files directly below `parent_id`.
    async fn list_video_files(&self, ctx: &StoreContext, parent_id: &str) -> Result<Vec<DriveItem>> {
        let mut videos = Vec::new();
        let mut page_token = None;
        loop {
            ctx.ensure_active()?;
            let query = ListFilesQuery::new(parent_id)
                .with_kind(DriveItemKind::File)
                .with_page_token(page_token);
            let page = self.list_files(ctx, &query).await?;
            videos.extend(page.files.into_iter().filter(DriveItem::is_video));

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => return Ok(videos),
            }
        }
    }
}

struct Walk<'a, B: ?Sized> {
    browser: &'a B,
    ctx: &'a StoreContext,
    root_id: &'a str,
    files_only: bool,
}

impl<'a, B: DriveBrowser + ?Sized> Walk<'a, B> {
    async fn run(&self) -> Result<Vec<DriveItem>> {
        let mut out = Vec::new();
        self.folder(self.root_id.to_string(), String::new(), 0, &mut out)
            .await?;
        debug!(root = self.root_id, items = out.len(), "walked drive folder");
        Ok(out)
    }

    fn folder<'b>(
        &'b self,
        folder_id: String,
        parent_path: String,
        depth: usize,
        out: &'b mut Vec<DriveItem>,
    ) -> BoxFuture<'b, Result<()>> {
        async move {
            if depth > MAX_FOLDER_DEPTH {
                return Err(Error::CorruptListing(format!(
                    "folder {} nested deeper than {} levels",
                    self.root_id, MAX_FOLDER_DEPTH
                )));
            }

            let mut page_token: Option<String> = None;
            loop {
                self.ctx.ensure_active()?;
                let query = ListFilesQuery::new(folder_id.clone()).with_page_token(page_token);
                let page = self.browser.list_files(self.ctx, &query).await?;

                for mut item in page.files {
                    item.path = format!("{}/{}", parent_path, item.name);
                    if item.is_folder() {
                        let (id, path) = (item.id.clone(), item.path.clone());
                        if !self.files_only {
                            out.push(item);
                        }
                        self.folder(id, path, depth + 1, out).await?;
                    } else {
                        out.push(item);
                    }
                }

                match page.next_page_token {
                    Some(token) => page_token = Some(token),
                    None => return Ok(()),
                }
            }
        }
        .boxed()
    }
}
