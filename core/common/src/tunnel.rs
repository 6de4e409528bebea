//! Tunnel routing policy.
//!
//! Some backends only accept traffic from a small set of IP ranges, so the
//! gateway has to relay it; others work best (or only) when the client
//! talks to them directly. API calls and stream redirects are decided
//! independently.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;
use crate::types::StoreName;

/// How traffic for a store and use-case is routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TunnelType {
    /// Client (or gateway) talks to the backend directly.
    #[default]
    Direct,
    /// Traffic is relayed through the gateway's tunnel.
    Proxy,
}

impl TunnelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TunnelType::Direct => "direct",
            TunnelType::Proxy => "proxy",
        }
    }
}

impl fmt::Display for TunnelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TunnelType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "direct" => Ok(TunnelType::Direct),
            "proxy" => Ok(TunnelType::Proxy),
            other => Err(Error::InvalidInput(format!("Unknown tunnel type: {}", other))),
        }
    }
}

/// Static routing table keyed by store.
pub struct StoreTunnel;

impl StoreTunnel {
    /// Routing for outbound API calls to the store.
    pub fn for_api(store: StoreName) -> TunnelType {
        match store {
            StoreName::AllDebrid
            | StoreName::Debrider
            | StoreName::DebridLink
            | StoreName::EasyDebrid
            | StoreName::Offcloud
            | StoreName::Premiumize
            | StoreName::RealDebrid
            | StoreName::TorBox => TunnelType::Proxy,
            StoreName::PikPak | StoreName::Seedr => TunnelType::Direct,
        }
    }

    /// Routing for client-facing stream redirects.
    pub fn for_stream(store: StoreName) -> TunnelType {
        match store {
            StoreName::AllDebrid
            | StoreName::Debrider
            | StoreName::DebridLink
            | StoreName::EasyDebrid
            | StoreName::Offcloud
            | StoreName::Premiumize
            | StoreName::RealDebrid
            | StoreName::TorBox => TunnelType::Proxy,
            StoreName::PikPak | StoreName::Seedr => TunnelType::Direct,
        }
    }

    /// Like [`StoreTunnel::for_api`], for a name or code. Unknown stores are direct.
    pub fn resolve_for_api(identity: &str) -> TunnelType {
        StoreName::from_identity(identity)
            .map(Self::for_api)
            .unwrap_or_default()
    }

    /// Like [`StoreTunnel::for_stream`], for a name or code. Unknown stores are direct.
    pub fn resolve_for_stream(identity: &str) -> TunnelType {
        StoreName::from_identity(identity)
            .map(Self::for_stream)
            .unwrap_or_default()
    }
}
