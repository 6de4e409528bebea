//! Magnet link parsing.

use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use url::Url;

use debridgate_common::{Error, Result};

const BTIH_PREFIX: &str = "urn:btih:";

/// A parsed magnet link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MagnetLink {
    /// Lowercase hex info hash.
    pub hash: String,
    /// Display name (`dn`), empty if absent.
    pub name: String,
    /// Canonical magnet link built from hash and name.
    pub link: String,
    /// The input as given, or the canonical link for bare hashes.
    pub raw_link: String,
}

impl MagnetLink {
    /// Parse a `magnet:` URI or a bare info hash.
    ///
    /// Accepts 40-character hex and 32-character base32 hashes.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();

        let (raw_hash, name) = if input.starts_with("magnet:") {
            let url = Url::parse(input)
                .map_err(|e| Error::InvalidInput(format!("Invalid magnet link: {}", e)))?;

            let mut hash = None;
            let mut name = String::new();
            for (key, value) in url.query_pairs() {
                match key.as_ref() {
                    "xt" => {
                        if let Some(h) = value.strip_prefix(BTIH_PREFIX) {
                            hash = Some(h.to_string());
                        }
                    }
                    "dn" => name = value.into_owned(),
                    _ => {}
                }
            }
            let hash = hash.ok_or_else(|| {
                Error::InvalidInput("Magnet link has no btih info hash".to_string())
            })?;
            (hash, name)
        } else {
            (input.to_string(), String::new())
        };

        let hash = normalize_hash(&raw_hash)?;

        let mut link = format!("magnet:?xt={}{}", BTIH_PREFIX, hash);
        if !name.is_empty() {
            link.push_str("&dn=");
            link.extend(utf8_percent_encode(&name, NON_ALPHANUMERIC));
        }

        let raw_link = if input.starts_with("magnet:") {
            input.to_string()
        } else {
            link.clone()
        };

        Ok(Self {
            hash,
            name,
            link,
            raw_link,
        })
    }
}

fn normalize_hash(hash: &str) -> Result<String> {
    match hash.len() {
        40 if hash.chars().all(|c| c.is_ascii_hexdigit()) => Ok(hash.to_ascii_lowercase()),
        32 => {
            let bytes = base32::decode(
                base32::Alphabet::Rfc4648 { padding: false },
                &hash.to_ascii_uppercase(),
            )
            .filter(|b| b.len() == 20)
            .ok_or_else(|| Error::InvalidInput(format!("Invalid base32 info hash: {}", hash)))?;
            Ok(hex::encode(bytes))
        }
        _ => Err(Error::InvalidInput(format!("Invalid info hash: {}", hash))),
    }
}
