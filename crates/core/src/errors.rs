use thiserror::Error;

/// Unified error type for the entire wallet-balance-core library.
/// Every public fallible function returns `Result<T, CoreError>`.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Cache ───────────────────────────────────────────────────────
    /// No readable snapshot for the account. Covers both "never written"
    /// and "persisted bytes are corrupt".
    #[error("No cached balance for account {0}")]
    NotFound(String),

    #[error("Invalid cache format: {0}")]
    InvalidCacheFormat(String),

    #[error("Unsupported cache version: {0}")]
    UnsupportedVersion(u16),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    // ── File I/O (native only) ──────────────────────────────────────
    #[error("File I/O error: {0}")]
    FileIO(String),

    // ── Remote source ───────────────────────────────────────────────
    /// Any failure fetching a fresh balance, as seen by the coordinator.
    #[error("Balance refresh failed: {0}")]
    RefreshFailed(String),

    #[error("API error ({provider}): {message}")]
    Api {
        provider: String,
        message: String,
    },

    #[error("Network error: {0}")]
    Network(String),

    // ── Validation / lifecycle ──────────────────────────────────────
    #[error("Invalid account identifier: {0}")]
    InvalidAccount(String),

    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    #[error("Balance coordinator has stopped")]
    CoordinatorStopped,

    #[error("Async runtime unavailable: {0}")]
    Runtime(String),
}

// ── Conversion helpers (From impls) ─────────────────────────────────

impl From<std::io::Error> for CoreError {
    fn from(e: std::io::Error) -> Self {
        CoreError::FileIO(e.to_string())
    }
}

impl From<bincode::Error> for CoreError {
    fn from(e: bincode::Error) -> Self {
        CoreError::Serialization(e.to_string())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Deserialization(e.to_string())
    }
}

impl From<reqwest::Error> for CoreError {
    fn from(e: reqwest::Error) -> Self {
        // reqwest errors carry the full URL; strip the query so API keys and
        // account parameters never end up in logs.
        let msg = e.to_string();
        let sanitized = if let Some(idx) = msg.find('?') {
            format!("{}?<query redacted>", &msg[..idx])
        } else {
            msg
        };
        CoreError::Network(sanitized)
    }
}

impl CoreError {
    /// Whether this error means "nothing usable in the cache".
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, CoreError::NotFound(_))
    }
}
