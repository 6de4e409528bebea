//! Provider identities.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identity of a backend store.
///
/// Every store has a canonical name (`"pikpak"`) and a two-letter short code
/// (`"pp"`). Both are stable and used as namespaces for cache keys and
/// locked links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreName {
    AllDebrid,
    Debrider,
    DebridLink,
    EasyDebrid,
    Offcloud,
    PikPak,
    Premiumize,
    RealDebrid,
    Seedr,
    TorBox,
}

impl StoreName {
    /// All known stores.
    pub const ALL: [StoreName; 10] = [
        StoreName::AllDebrid,
        StoreName::Debrider,
        StoreName::DebridLink,
        StoreName::EasyDebrid,
        StoreName::Offcloud,
        StoreName::PikPak,
        StoreName::Premiumize,
        StoreName::RealDebrid,
        StoreName::Seedr,
        StoreName::TorBox,
    ];

    /// Canonical name.
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreName::AllDebrid => "alldebrid",
            StoreName::Debrider => "debrider",
            StoreName::DebridLink => "debridlink",
            StoreName::EasyDebrid => "easydebrid",
            StoreName::Offcloud => "offcloud",
            StoreName::PikPak => "pikpak",
            StoreName::Premiumize => "premiumize",
            StoreName::RealDebrid => "realdebrid",
            StoreName::Seedr => "seedr",
            StoreName::TorBox => "torbox",
        }
    }

    /// Two-letter short code.
    pub fn code(&self) -> &'static str {
        match self {
            StoreName::AllDebrid => "ad",
            StoreName::Debrider => "dr",
            StoreName::DebridLink => "dl",
            StoreName::EasyDebrid => "ed",
            StoreName::Offcloud => "oc",
            StoreName::PikPak => "pp",
            StoreName::Premiumize => "pm",
            StoreName::RealDebrid => "rd",
            StoreName::Seedr => "sd",
            StoreName::TorBox => "tb",
        }
    }

    /// Look up a store by its canonical name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == name)
    }

    /// Look up a store by its short code.
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.code() == code)
    }

    /// Look up a store by either its name or its code.
    pub fn from_identity(identity: &str) -> Option<Self> {
        Self::from_name(identity).or_else(|| Self::from_code(identity))
    }
}

impl fmt::Display for StoreName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StoreName {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        Self::from_identity(s)
            .ok_or_else(|| crate::Error::InvalidInput(format!("Unknown store: {}", s)))
    }
}
