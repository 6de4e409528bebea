//! Seedr cloud storage store.
//!
//! Seedr is exposed as a read-only drive: folders are listed as content
//! items and flattened into locked file links.

pub mod client;
pub mod store;
pub mod types;

pub use client::{SeedrApi, SeedrClient};
pub use store::{SeedrConfig, SeedrStore};
