//! PikPak cloud drive store.
//!
//! - Magnets are added as offline download tasks and polled to completion
//! - Downloaded folders are flattened into locked file links
//! - Listings are served from the shared listing cache

pub mod client;
pub mod store;
pub mod types;

pub use client::{PikPakApi, PikPakClient};
pub use store::{PikPakConfig, PikPakStore};
