//! Common types shared across the debridgate crates.
//!
//! This module provides the error taxonomy, provider identities and the
//! tunnel routing policy that every other crate builds on.

pub mod error;
pub mod tunnel;
pub mod types;

pub use error::{Error, Result};
pub use tunnel::{StoreTunnel, TunnelType};
pub use types::StoreName;
