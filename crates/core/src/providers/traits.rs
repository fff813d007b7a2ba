use async_trait::async_trait;

use crate::errors::CoreError;
use crate::models::account::AccountId;
use crate::models::snapshot::BalanceSnapshot;

/// Remote source of fresh balance snapshots.
///
/// The coordinator only depends on this trait, so the TON API backend can
/// be swapped (or mocked in tests) without touching the refresh logic.
#[async_trait]
pub trait BalanceSource: Send + Sync {
    /// Human-readable name of this source (for logs/errors).
    fn name(&self) -> &str;

    /// Fetch a complete snapshot (header and pages from one read).
    ///
    /// Any network or decoding failure is reported as
    /// [`CoreError::RefreshFailed`].
    async fn fetch_balance(&self, account: &AccountId) -> Result<BalanceSnapshot, CoreError>;
}
