//! Normalized data returned by every store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a content item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MagnetStatus {
    Queued,
    Downloading,
    Downloaded,
    Failed,
    Unknown,
}

/// A single file inside a content item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MagnetFile {
    /// Position hint, `-1` when the backend does not guarantee order.
    pub idx: i64,
    pub name: String,
    /// Absolute, slash-separated path from the item root.
    pub path: String,
    /// Size in bytes, `-1` if unknown.
    pub size: i64,
    /// Locked link, resolved by `Store::generate_link`.
    pub link: String,
    /// Short code of the store the file lives on.
    pub source: String,
}

/// A content item ("magnet") with its files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MagnetItem {
    pub id: String,
    pub name: String,
    /// Info hash, empty for stores without a hash concept.
    pub hash: String,
    /// Source magnet link, empty when not known.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub magnet: String,
    /// Size in bytes, `-1` if unknown.
    pub size: i64,
    pub status: MagnetStatus,
    pub files: Vec<MagnetFile>,
    pub added_at: DateTime<Utc>,
}

/// A content item as it appears in a listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MagnetSummary {
    pub id: String,
    pub name: String,
    pub hash: String,
    pub size: i64,
    pub status: MagnetStatus,
    pub added_at: DateTime<Utc>,
}

impl From<&MagnetItem> for MagnetSummary {
    fn from(item: &MagnetItem) -> Self {
        Self {
            id: item.id.clone(),
            name: item.name.clone(),
            hash: item.hash.clone(),
            size: item.size,
            status: item.status,
            added_at: item.added_at,
        }
    }
}

/// What to add to a store.
#[derive(Debug, Clone)]
pub enum AddMagnetInput {
    /// Magnet URI or bare info hash.
    Magnet(String),
    /// Raw `.torrent` file contents.
    Torrent(Vec<u8>),
}

/// Pagination for `Store::list_magnets`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListMagnetsParams {
    pub offset: usize,
    pub limit: usize,
}

impl ListMagnetsParams {
    pub fn new(offset: usize, limit: usize) -> Self {
        Self { offset, limit }
    }

    /// Slice a complete listing according to offset and limit.
    pub fn slice(&self, items: &[MagnetSummary]) -> ListMagnetsData {
        let total_items = items.len();
        let start = self.offset.min(total_items);
        let end = start.saturating_add(self.limit).min(total_items);

        ListMagnetsData {
            items: items[start..end].to_vec(),
            total_items,
        }
    }
}

impl Default for ListMagnetsParams {
    fn default() -> Self {
        Self::new(0, 100)
    }
}

/// One page of a listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListMagnetsData {
    pub items: Vec<MagnetSummary>,
    pub total_items: usize,
}

/// Subscription state of a store account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Premium,
    Trial,
    Expired,
}

/// Store account owner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub subscription_status: SubscriptionStatus,
}

/// Cache status of one magnet on a store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckMagnetItem {
    pub magnet: String,
    pub hash: String,
    pub status: MagnetStatus,
    #[serde(default)]
    pub files: Vec<MagnetFile>,
}
