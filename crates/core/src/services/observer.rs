use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::models::snapshot::{WalletHeader, WalletPage};

/// Receives header updates.
pub trait HeaderObserver: Send + Sync {
    fn on_header_changed(&self, header: &WalletHeader);

    /// Called with the configured wallet title when the screen activates.
    fn on_title_changed(&self, _title: &str) {}
}

/// Receives page updates.
pub trait PagesObserver: Send + Sync {
    fn on_pages_changed(&self, pages: &[WalletPage]);
}

/// Told when a refresh ends, whatever its outcome, so a loading
/// indicator can always be retired.
pub trait LoadingObserver: Send + Sync {
    fn on_loading_finished(&self);
}

/// Handle returned by subscription, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(Uuid);

impl ObserverId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ObserverId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ObserverId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Non-owning list of observers.
///
/// Holds `Weak` references only: an observer that has been dropped is
/// skipped and pruned on the next notification.
pub struct ObserverRegistry<T: ?Sized> {
    entries: Mutex<Vec<(ObserverId, Weak<T>)>>,
}

impl<T: ?Sized> ObserverRegistry<T> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }

    pub fn insert(&self, id: ObserverId, observer: Weak<T>) {
        self.entries.lock().push((id, observer));
    }

    /// Returns `true` if an entry with this id was present.
    pub fn remove(&self, id: ObserverId) -> bool {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|(entry_id, _)| *entry_id != id);
        entries.len() != before
    }

    /// Number of observers still alive.
    pub fn live_count(&self) -> usize {
        self.entries
            .lock()
            .iter()
            .filter(|(_, weak)| weak.strong_count() > 0)
            .count()
    }

    /// Strong references to every live observer, in registration order.
    /// Dead entries are pruned on the way.
    pub fn live(&self) -> Vec<Arc<T>> {
        let mut entries = self.entries.lock();
        entries.retain(|(_, weak)| weak.strong_count() > 0);
        entries.iter().filter_map(|(_, weak)| weak.upgrade()).collect()
    }

    /// Call `f` for every live observer in registration order.
    ///
    /// The lock is released before any callback runs, so observers may
    /// subscribe or unsubscribe from inside a notification. Those changes
    /// take effect from the next notification.
    pub fn notify(&self, mut f: impl FnMut(&T)) {
        for observer in &self.live() {
            f(&**observer);
        }
    }
}

impl<T: ?Sized> Default for ObserverRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Event forwarded by [`ChannelObserver`].
#[derive(Debug, Clone, PartialEq)]
pub enum BalanceEvent {
    TitleChanged(String),
    HeaderChanged(WalletHeader),
    PagesChanged(Vec<WalletPage>),
    LoadingFinished,
}

/// Observer that turns notifications into a stream of [`BalanceEvent`]s.
///
/// Useful for UI layers built around message passing instead of callbacks.
/// Keep the returned `Arc` alive for as long as events are wanted.
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<BalanceEvent>,
}

impl ChannelObserver {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<BalanceEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { tx }), rx)
    }

    fn send(&self, event: BalanceEvent) {
        // A closed receiver just means nobody is listening anymore.
        let _ = self.tx.send(event);
    }
}

impl HeaderObserver for ChannelObserver {
    fn on_header_changed(&self, header: &WalletHeader) {
        self.send(BalanceEvent::HeaderChanged(header.clone()));
    }

    fn on_title_changed(&self, title: &str) {
        self.send(BalanceEvent::TitleChanged(title.to_string()));
    }
}

impl PagesObserver for ChannelObserver {
    fn on_pages_changed(&self, pages: &[WalletPage]) {
        self.send(BalanceEvent::PagesChanged(pages.to_vec()));
    }
}

impl LoadingObserver for ChannelObserver {
    fn on_loading_finished(&self) {
        self.send(BalanceEvent::LoadingFinished);
    }
}
