//! PikPak drive API wire types.

use serde::{Deserialize, Serialize};

pub const FILE_KIND_FOLDER: &str = "drive#folder";
pub const FILE_KIND_FILE: &str = "drive#file";

pub const PHASE_PENDING: &str = "PHASE_TYPE_PENDING";
pub const PHASE_RUNNING: &str = "PHASE_TYPE_RUNNING";
pub const PHASE_ERROR: &str = "PHASE_TYPE_ERROR";
pub const PHASE_COMPLETE: &str = "PHASE_TYPE_COMPLETE";

pub const VIP_TYPE_PLATINUM: &str = "platinum";

/// Name of the folder offline downloads land in.
pub const MY_PACK_FOLDER: &str = "My Pack";

/// Source parameters of a file created from a URL.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileParams {
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaLink {
    #[serde(default)]
    pub url: String,
}

/// A playable or downloadable rendition of a file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Media {
    #[serde(default)]
    pub link: MediaLink,
}

/// File or folder metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct File {
    pub id: String,
    pub kind: String,
    pub name: String,
    /// Decimal byte count, sent as a string.
    #[serde(default)]
    pub size: String,
    #[serde(default)]
    pub phase: String,
    #[serde(default)]
    pub created_time: String,
    #[serde(default)]
    pub modified_time: String,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub parent_id: String,
    #[serde(default)]
    pub hash: String,
    #[serde(default)]
    pub params: FileParams,
    #[serde(default)]
    pub medias: Vec<Media>,
    #[serde(default)]
    pub web_content_link: String,
}

impl File {
    pub fn is_folder(&self) -> bool {
        self.kind == FILE_KIND_FOLDER
    }

    pub fn is_complete(&self) -> bool {
        self.phase == PHASE_COMPLETE
    }

    /// Size in bytes, `-1` when absent or malformed.
    pub fn size_bytes(&self) -> i64 {
        self.size.parse().unwrap_or(-1)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileList {
    #[serde(default)]
    pub files: Vec<File>,
    #[serde(default)]
    pub next_page_token: String,
}

/// Query for `GET /files`.
///
/// Trashed files are always excluded.
#[derive(Debug, Clone, Default)]
pub struct ListFilesParams {
    /// Parent folder id, empty for the drive root.
    pub parent_id: String,
    pub limit: u32,
    pub page_token: Option<String>,
    /// Skip downloads that have not finished.
    pub completed_only: bool,
    /// `drive#folder` or `drive#file`.
    pub kind: Option<String>,
    pub mime_type: Option<String>,
}

impl ListFilesParams {
    /// Completed files under `parent_id`.
    pub fn new(parent_id: impl Into<String>) -> Self {
        Self {
            parent_id: parent_id.into(),
            limit: 500,
            page_token: None,
            completed_only: true,
            kind: None,
            mime_type: None,
        }
    }

    /// Files under `parent_id` in any phase.
    pub fn browse(parent_id: impl Into<String>, limit: u32) -> Self {
        Self {
            limit,
            completed_only: false,
            ..Self::new(parent_id)
        }
    }

    pub fn with_page_token(mut self, page_token: Option<String>) -> Self {
        self.page_token = page_token;
        self
    }

    pub fn with_kind(mut self, kind: Option<&str>) -> Self {
        self.kind = kind.map(str::to_string);
        self
    }

    pub fn with_mime_type(mut self, mime_type: Option<String>) -> Self {
        self.mime_type = mime_type;
        self
    }
}

/// Offline download task.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub file_id: String,
    #[serde(default)]
    pub phase: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskList {
    #[serde(default)]
    pub tasks: Vec<Task>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddUrlResponse {
    pub task: Task,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInfo {
    pub sub: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VipData {
    #[serde(default, rename = "type")]
    pub vip_type: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VipInfo {
    #[serde(default)]
    pub data: VipData,
}
