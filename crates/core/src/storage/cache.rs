use std::sync::Arc;

use tracing::{debug, trace};

use crate::errors::CoreError;
use crate::models::account::AccountId;
use crate::models::snapshot::BalanceSnapshot;

use super::format;
use super::store::KeyValueStore;

/// Last-known balance snapshot per account, on top of a [`KeyValueStore`].
///
/// Cheap to clone; clones share the same store.
#[derive(Clone)]
pub struct BalanceCache {
    store: Arc<dyn KeyValueStore>,
}

impl std::fmt::Debug for BalanceCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BalanceCache").finish_non_exhaustive()
    }
}

impl BalanceCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Read the persisted snapshot for `account`.
    ///
    /// Fails with [`CoreError::NotFound`] when nothing was ever written and
    /// also when the stored bytes cannot be read or decoded: callers treat
    /// absent and corrupt the same way.
    pub fn read(&self, account: &AccountId) -> Result<BalanceSnapshot, CoreError> {
        let bytes = match self.store.get(&account.cache_key()) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return Err(CoreError::NotFound(account.to_string())),
            Err(e) => {
                debug!(%account, error = %e, "balance cache read failed");
                return Err(CoreError::NotFound(account.to_string()));
            }
        };

        decode(&bytes).map_err(|e| {
            debug!(%account, error = %e, "discarding unreadable cached balance");
            CoreError::NotFound(account.to_string())
        })
    }

    /// Persist `snapshot` for `account`, replacing any previous value.
    /// Identical bytes are not rewritten.
    pub fn write(&self, account: &AccountId, snapshot: &BalanceSnapshot) -> Result<(), CoreError> {
        let key = account.cache_key();
        let bytes = encode(snapshot)?;

        if matches!(self.store.get(&key), Ok(Some(ref existing)) if *existing == bytes) {
            trace!(%account, "cached balance unchanged, skipping write");
            return Ok(());
        }

        self.store.set(&key, &bytes)?;
        debug!(%account, pages = snapshot.pages.len(), "cached balance updated");
        Ok(())
    }

    /// Whether a readable snapshot exists for `account`.
    pub fn contains(&self, account: &AccountId) -> bool {
        self.read(account).is_ok()
    }

    /// Drop the cached snapshot for `account` (e.g., when the wallet is removed).
    pub fn clear(&self, account: &AccountId) -> Result<(), CoreError> {
        self.store.remove(&account.cache_key())
    }
}

/// Serialize a snapshot into envelope bytes.
///
/// Flow: BalanceSnapshot → bincode → TKBS envelope (version + sha256)
pub fn encode(snapshot: &BalanceSnapshot) -> Result<Vec<u8>, CoreError> {
    let payload = bincode::serialize(snapshot)
        .map_err(|e| CoreError::Serialization(format!("Failed to serialize snapshot: {e}")))?;
    Ok(format::write_envelope(format::CURRENT_VERSION, &payload))
}

/// Parse envelope bytes back into a snapshot.
pub fn decode(data: &[u8]) -> Result<BalanceSnapshot, CoreError> {
    let (_, payload) = format::read_envelope(data)?;
    bincode::deserialize(payload)
        .map_err(|e| CoreError::Deserialization(format!("Failed to deserialize snapshot: {e}")))
}
