//! Proxy links for debridgate.
//!
//! A proxy link is an opaque gateway URL standing in for a backend URL,
//! optionally carrying request headers and a tunnel preference:
//!
//! ```text
//! <base>/v0/proxy/<token>[/<filename>]
//! ```
//!
//! Two token forms exist:
//! - Unsigned: `base64.` followed by a base64url JSON blob. Never expires.
//! - Signed: an HS256 JWT keyed by the issuing user's secret, with the link
//!   either encrypted or base64 encoded inside.

pub mod auth;
pub mod link;

pub use auth::ProxyAuth;
pub use link::{
    create_proxy_link, create_proxy_token, filename_from_link, resolve_proxy_token,
    ProxyLinkRequest, ResolvedProxyLink, PROXY_PATH,
};
