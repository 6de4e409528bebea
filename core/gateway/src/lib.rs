//! HTTP surface of debridgate.
//!
//! Redeems proxy links issued by `debridgate-proxy`: links routed directly
//! and carrying no headers are answered with a redirect, everything else is
//! fetched upstream and streamed back with the client's `Range` header
//! forwarded.

pub mod config;
pub mod error;
pub mod proxy;
pub mod server;
pub mod state;

pub use config::GatewayConfig;
pub use error::{status_for, ApiError, ApiResult};
pub use server::{router, serve};
pub use state::AppState;
