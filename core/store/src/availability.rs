//! Magnet availability lookup.

use async_trait::async_trait;

use debridgate_common::{Result, StoreName};

use crate::magnet::MagnetLink;
use crate::models::{CheckMagnetItem, MagnetStatus};
use crate::store::StoreContext;

/// Reports whether magnets are already cached on a store.
///
/// Stores without a native availability endpoint delegate `check_magnet`
/// to this collaborator.
#[async_trait]
pub trait Availability: Send + Sync {
    async fn check(
        &self,
        store: StoreName,
        magnets: &[MagnetLink],
        ctx: &StoreContext,
    ) -> Result<Vec<CheckMagnetItem>>;
}

/// Availability source that knows nothing: every magnet is `unknown`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnknownAvailability;

#[async_trait]
impl Availability for UnknownAvailability {
    async fn check(
        &self,
        _store: StoreName,
        magnets: &[MagnetLink],
        _ctx: &StoreContext,
    ) -> Result<Vec<CheckMagnetItem>> {
        Ok(magnets
            .iter()
            .map(|magnet| CheckMagnetItem {
                magnet: magnet.link.clone(),
                hash: magnet.hash.clone(),
                status: MagnetStatus::Unknown,
                files: Vec::new(),
            })
            .collect())
    }
}
