//! Seedr REST API wire types.

use serde::{Deserialize, Serialize};

/// A folder as it appears inside a listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Folder {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub size: i64,
    /// `YYYY-MM-DD HH:MM:SS` in UTC.
    #[serde(default)]
    pub last_update: String,
}

/// A file as it appears inside a listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FolderFile {
    #[serde(alias = "id")]
    pub folder_file_id: u64,
    pub name: String,
    #[serde(default)]
    pub size: i64,
}

/// Contents of one folder.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FolderContents {
    /// Absent for the root folder.
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub last_update: String,
    #[serde(default)]
    pub folders: Vec<Folder>,
    #[serde(default)]
    pub files: Vec<FolderFile>,
}

/// Download information for a file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileInfo {
    #[serde(default)]
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Account {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub is_premium: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    pub account: Account,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsResponse {
    #[serde(default)]
    pub result: bool,
    pub settings: Settings,
}
