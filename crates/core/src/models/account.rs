use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

/// Identifier of a wallet account.
///
/// Accepts user-friendly (`EQ...`, `UQ...`) and raw (`0:<hex>`) TON
/// addresses. The value scopes both the cache slot and remote requests,
/// so it is trimmed and restricted to a safe character set on construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(raw: impl AsRef<str>) -> Result<Self, CoreError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(CoreError::InvalidAccount("account id must not be empty".into()));
        }
        if let Some(bad) = trimmed.chars().find(|c| !is_allowed(*c)) {
            return Err(CoreError::InvalidAccount(format!(
                "unexpected character {bad:?} in '{trimmed}'"
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Key of this account's slot in a key-value store.
    #[must_use]
    pub fn cache_key(&self) -> String {
        format!("balance.{}", self.0)
    }
}

fn is_allowed(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '+' | '/' | '=')
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for AccountId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for AccountId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
