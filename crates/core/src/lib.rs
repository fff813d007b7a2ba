//! Policy layer behind a wallet's balance screen.
//!
//! Shows the last-known balance from [`BalanceCache`] straight away, fetches
//! a fresh one from a [`BalanceSource`] in the background, and falls back to
//! an empty-state snapshot when nothing better is available.

pub mod errors;
pub mod models;
pub mod providers;
pub mod services;
pub mod storage;

use std::sync::Arc;

pub use errors::CoreError;
pub use models::account::AccountId;
pub use models::settings::{Settings, StaleRefreshPolicy};
pub use models::snapshot::{BalanceSnapshot, PageItem, PageKey, WalletHeader, WalletPage};
pub use models::state::CoordinatorState;
pub use providers::tonapi::TonApiSource;
pub use providers::traits::BalanceSource;
pub use services::observer::{
    BalanceEvent, ChannelObserver, HeaderObserver, LoadingObserver, ObserverId, PagesObserver,
};
pub use services::refresh_coordinator::BalanceRefreshCoordinator;
pub use storage::cache::BalanceCache;
pub use storage::store::{FileStore, KeyValueStore, MemoryStore};

/// Wire up a coordinator for `account` backed by the TON API and `store`.
///
/// Must be called from within a tokio runtime.
pub fn open_balance_screen(
    account: &str,
    store: Arc<dyn KeyValueStore>,
    settings: &Settings,
) -> Result<BalanceRefreshCoordinator, CoreError> {
    settings.validate()?;
    let account = AccountId::new(account)?;
    let source: Arc<dyn BalanceSource> = Arc::new(TonApiSource::new(settings));
    BalanceRefreshCoordinator::spawn(account, BalanceCache::new(store), source, settings)
}
