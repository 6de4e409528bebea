//! Proxy credentials.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use subtle::ConstantTimeEq;

/// Users allowed to issue and redeem proxy links, with their secrets.
///
/// The secret doubles as the JWT signing key and the encryption secret for
/// that user's signed tokens.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProxyAuth {
    users: BTreeMap<String, String>,
}

impl ProxyAuth {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a user.
    pub fn with_user(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.users.insert(user.into(), password.into());
        self
    }

    /// Parse `user:password` entries.
    ///
    /// Entries without a `:` or with an empty user are skipped.
    pub fn from_credentials<'a>(credentials: impl IntoIterator<Item = &'a str>) -> Self {
        let users = credentials
            .into_iter()
            .filter_map(|c| c.split_once(':'))
            .filter(|(user, _)| !user.is_empty())
            .map(|(user, password)| (user.to_string(), password.to_string()))
            .collect();
        Self { users }
    }

    /// Secret of `user`.
    pub fn password(&self, user: &str) -> Option<&str> {
        self.users.get(user).map(String::as_str)
    }

    /// Check a `user`/`password` pair in constant time with respect to the
    /// password.
    pub fn verify(&self, user: &str, password: &str) -> bool {
        match self.users.get(user) {
            Some(expected) => bool::from(expected.as_bytes().ct_eq(password.as_bytes())),
            None => false,
        }
    }

    pub fn users(&self) -> impl Iterator<Item = &str> {
        self.users.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl fmt::Debug for ProxyAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyAuth")
            .field("users", &self.users.keys().collect::<Vec<_>>())
            .finish()
    }
}
