use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

/// What to do with a refresh that completes after a newer one already landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaleRefreshPolicy {
    /// Drop completions older than the last applied one. The display never
    /// rewinds to an older balance.
    #[default]
    DiscardStale,
    /// Apply every completion in arrival order, even if that rewinds the
    /// display and the cache to an older balance.
    LastCompletionWins,
}

/// Runtime configuration for the balance screen core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Title published on the header channel when the screen activates.
    pub wallet_title: String,

    /// Base URL of the TON API (no trailing slash needed).
    pub api_base_url: String,

    /// Optional bearer token for the TON API.
    pub api_key: Option<String>,

    /// Display currency for fiat totals (e.g., "USD", "EUR").
    pub currency: String,

    /// Per-request timeout for remote balance reads.
    pub request_timeout_secs: u64,

    /// Maximum number of collectibles fetched for the collectibles page.
    pub nft_page_limit: u32,

    pub stale_refresh_policy: StaleRefreshPolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            wallet_title: "Wallet".to_string(),
            api_base_url: "https://tonapi.io".to_string(),
            api_key: None,
            currency: "USD".to_string(),
            request_timeout_secs: 30,
            nft_page_limit: 50,
            stale_refresh_policy: StaleRefreshPolicy::default(),
        }
    }
}

impl Settings {
    /// Parse settings from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a JSON file on disk.
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Self, CoreError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.wallet_title.trim().is_empty() {
            return Err(CoreError::InvalidSettings("wallet_title must not be empty".into()));
        }
        if self.api_base_url.trim().is_empty() {
            return Err(CoreError::InvalidSettings("api_base_url must not be empty".into()));
        }
        let currency = self.currency.trim();
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(CoreError::InvalidSettings(format!(
                "Invalid currency code '{}': must be exactly 3 ASCII letters (e.g., USD, EUR)",
                self.currency
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(CoreError::InvalidSettings("request_timeout_secs must be positive".into()));
        }
        Ok(())
    }
}
