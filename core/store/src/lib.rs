//! Store abstraction for debridgate.
//!
//! This module provides the uniform capability contract every backend
//! ("store") implements, the registry that resolves a store by name or
//! code, and the shared machinery adapters are built from: the listing
//! cache, locked file links, async task polling and folder flattening.
//!
//! # Design Principles
//! - Provider isolation: backend wire formats stay inside their adapter
//! - Uniform contract: unsupported capabilities return an error, never panic
//! - Async operations: all I/O is async and cancellable by the caller

pub mod availability;
pub mod browse;
pub mod cache;
pub mod flatten;
pub mod listing;
pub mod locked_link;
pub mod magnet;
pub mod models;
pub mod pikpak;
pub mod poll;
pub mod registry;
pub mod seedr;
pub mod store;
pub mod transport;

pub use availability::{Availability, UnknownAvailability};
pub use browse::{DriveBrowser, DriveItem, DriveItemKind, DrivePage, ListFilesQuery};
pub use cache::{Cache, MemoryCache};
pub use flatten::{
    flatten_folder, FlattenedFolder, FolderEntry, FolderPage, FolderSource, MAX_FOLDER_DEPTH,
};
pub use listing::{account_key, ListingCache};
pub use locked_link::LockedFileLink;
pub use magnet::MagnetLink;
pub use models::*;
pub use poll::{wait_for_completion, PollFailure, PollPolicy, TaskPhase};
pub use registry::{StoreRegistry, StoresConfig};
pub use store::{Store, StoreContext};
pub use transport::{http_client, TransportConfig};
