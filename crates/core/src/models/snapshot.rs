use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Title shown by the empty-state snapshot.
pub const EMPTY_TITLE: &str = "No data";

/// Total shown by the empty-state snapshot.
pub const EMPTY_TOTAL: &str = "0 TON";

/// Summary attributes rendered at the top of the balance screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletHeader {
    /// Display title (e.g., "Wallet").
    pub title: String,

    /// Formatted total value (e.g., "$1,204.50" or "12 TON").
    pub total: String,

    /// Full account address, used by the "Receive" action.
    pub full_address: String,
}

impl WalletHeader {
    pub fn new(
        title: impl Into<String>,
        total: impl Into<String>,
        full_address: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            total: total.into(),
            full_address: full_address.into(),
        }
    }

    /// Address shortened to `first4...last4` for compact display.
    /// Addresses of 11 characters or fewer are returned unchanged.
    #[must_use]
    pub fn short_address(&self) -> String {
        let chars: Vec<char> = self.full_address.chars().collect();
        if chars.len() <= 11 {
            return self.full_address.clone();
        }
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}...{tail}")
    }
}

/// Identifies a content page under the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PageKey {
    Tokens,
    Collectibles,
}

impl std::fmt::Display for PageKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PageKey::Tokens => write!(f, "Tokens"),
            PageKey::Collectibles => write!(f, "Collectibles"),
        }
    }
}

/// One row of a page: a token balance or a collectible.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageItem {
    pub symbol: String,
    pub name: String,
    /// Formatted amount in the item's own units.
    pub amount: String,
    /// Formatted value in the display currency, when a price is known.
    pub fiat_value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletPage {
    pub key: PageKey,
    pub title: String,
    pub items: Vec<PageItem>,
}

impl WalletPage {
    pub fn new(key: PageKey, items: Vec<PageItem>) -> Self {
        Self {
            key,
            title: key.to_string(),
            items,
        }
    }
}

/// An immutable view of the wallet balance: header and pages produced
/// together from one data source read.
///
/// Snapshots are never edited in place; a refresh builds a new one that
/// replaces the old one everywhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    pub header: WalletHeader,
    pub pages: Vec<WalletPage>,
    /// When the remote read behind this snapshot happened.
    /// `None` for the empty snapshot.
    #[serde(default)]
    pub fetched_at: Option<DateTime<Utc>>,
}

impl BalanceSnapshot {
    pub fn new(header: WalletHeader, pages: Vec<WalletPage>) -> Self {
        Self {
            header,
            pages,
            fetched_at: None,
        }
    }

    #[must_use]
    pub fn with_fetched_at(mut self, fetched_at: DateTime<Utc>) -> Self {
        self.fetched_at = Some(fetched_at);
        self
    }

    /// The designated empty-state snapshot. Pure: no I/O, always equal.
    pub fn empty() -> Self {
        Self {
            header: WalletHeader::new(EMPTY_TITLE, EMPTY_TOTAL, ""),
            pages: Vec::new(),
            fetched_at: None,
        }
    }

    #[must_use]
    pub fn is_empty_state(&self) -> bool {
        *self == Self::empty()
    }

    /// Look up a page by key.
    #[must_use]
    pub fn page(&self, key: PageKey) -> Option<&WalletPage> {
        self.pages.iter().find(|p| p.key == key)
    }
}
