//! Locked file links.
//!
//! A locked link addresses a file through the id of the root container it
//! was listed from plus its own id, without exposing either as a raw backend
//! identifier:
//!
//! ```text
//! debridgate://store/<store>/<base64url(rootId:fileId)>
//! ```

use debridgate_common::{Error, Result, StoreName};
use debridgate_crypto::{base64_decode_string, base64_encode};

/// Scheme shared by all locked links.
pub const LOCKED_LINK_SCHEME: &str = "debridgate://store/";

/// Decoded form of a locked link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockedFileLink {
    /// Id of the root container. Must not contain `:`.
    pub root_id: String,
    pub file_id: String,
}

impl LockedFileLink {
    pub fn new(root_id: impl Into<String>, file_id: impl Into<String>) -> Self {
        Self {
            root_id: root_id.into(),
            file_id: file_id.into(),
        }
    }

    /// Prefix carried by every link of `store`.
    pub fn prefix(store: StoreName) -> String {
        format!("{}{}/", LOCKED_LINK_SCHEME, store)
    }

    /// Encode for `store`.
    pub fn encode(&self, store: StoreName) -> String {
        let data = format!("{}:{}", self.root_id, self.file_id);
        format!("{}{}", Self::prefix(store), base64_encode(data))
    }

    /// Decode a link issued for `store`.
    ///
    /// # Errors
    /// - `InvalidLink` if the link carries another store's prefix or its
    ///   payload is not a `rootId:fileId` pair
    pub fn decode(store: StoreName, link: &str) -> Result<Self> {
        let prefix = Self::prefix(store);
        let encoded = link
            .strip_prefix(prefix.as_str())
            .ok_or_else(|| Error::InvalidLink(format!("not a {} locked link", store)))?;

        let decoded = base64_decode_string(encoded)
            .map_err(|e| Error::InvalidLink(format!("malformed locked link: {}", e)))?;

        let (root_id, file_id) = decoded
            .split_once(':')
            .ok_or_else(|| Error::InvalidLink("locked link is missing file id".to_string()))?;

        if root_id.is_empty() || file_id.is_empty() {
            return Err(Error::InvalidLink("locked link has empty id".to_string()));
        }

        Ok(Self::new(root_id, file_id))
    }
}
