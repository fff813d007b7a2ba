use std::sync::{Arc, Weak};

use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, warn};

use crate::errors::CoreError;
use crate::models::account::AccountId;
use crate::models::settings::{Settings, StaleRefreshPolicy};
use crate::models::snapshot::BalanceSnapshot;
use crate::models::state::CoordinatorState;
use crate::providers::traits::BalanceSource;
use crate::storage::cache::BalanceCache;

use super::observer::{
    HeaderObserver, LoadingObserver, ObserverId, ObserverRegistry, PagesObserver,
};

/// Drives the balance screen: cache-first display, background refresh,
/// and fallback to the empty state.
///
/// The coordinator is split in two:
/// - this handle, which callers use to activate, refresh and subscribe;
/// - a worker task that owns the state machine. It is the only place
///   observers are notified from, so header and pages for one snapshot are
///   always delivered back to back, never interleaved with another one.
///
/// Dropping the handle stops the worker. Refreshes still in flight at that
/// point finish quietly and their results are discarded.
pub struct BalanceRefreshCoordinator {
    account: AccountId,
    cache: BalanceCache,
    commands: mpsc::UnboundedSender<Command>,
    observers: Arc<Observers>,
    state: watch::Receiver<CoordinatorState>,
}

impl std::fmt::Debug for BalanceRefreshCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BalanceRefreshCoordinator")
            .field("account", &self.account)
            .field("state", &*self.state.borrow())
            .finish()
    }
}

impl BalanceRefreshCoordinator {
    /// Start a coordinator on the current tokio runtime.
    pub fn spawn(
        account: AccountId,
        cache: BalanceCache,
        source: Arc<dyn BalanceSource>,
        settings: &Settings,
    ) -> Result<Self, CoreError> {
        let runtime = Handle::try_current().map_err(|e| CoreError::Runtime(e.to_string()))?;
        Ok(Self::spawn_on(runtime, account, cache, source, settings))
    }

    /// Start a coordinator on an explicit runtime.
    pub fn spawn_on(
        runtime: Handle,
        account: AccountId,
        cache: BalanceCache,
        source: Arc<dyn BalanceSource>,
        settings: &Settings,
    ) -> Self {
        let (commands, rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(CoordinatorState::Idle);
        let observers = Arc::new(Observers::default());

        let worker = Worker {
            account: account.clone(),
            cache: cache.clone(),
            source,
            observers: observers.clone(),
            title: settings.wallet_title.clone(),
            policy: settings.stale_refresh_policy,
            runtime: runtime.clone(),
            completions: commands.downgrade(),
            state: state_tx,
            displayed: CoordinatorState::Idle,
            next_generation: 0,
            applied_generation: 0,
            in_flight: 0,
        };
        runtime.spawn(worker.run(rx));

        Self {
            account,
            cache,
            commands,
            observers,
            state: state_rx,
        }
    }

    pub fn account(&self) -> &AccountId {
        &self.account
    }

    /// Show the cached snapshot (or the empty one), then refresh in the
    /// background.
    ///
    /// Returns once the cache-first notification has been delivered, with
    /// the state it produced (`ShowingCache` or `ShowingEmpty`). The refresh
    /// keeps running after this returns. Calling it again repeats the whole
    /// sequence.
    pub async fn activate(&self) -> Result<CoordinatorState, CoreError> {
        let (ack, shown) = oneshot::channel();
        self.commands
            .send(Command::Activate { ack })
            .map_err(|_| CoreError::CoordinatorStopped)?;
        shown.await.map_err(|_| CoreError::CoordinatorStopped)
    }

    /// Start a refresh right away, without the cache-first read
    /// (pull-to-refresh).
    pub fn refresh(&self) -> Result<(), CoreError> {
        self.commands
            .send(Command::Refresh)
            .map_err(|_| CoreError::CoordinatorStopped)
    }

    #[must_use]
    pub fn state(&self) -> CoordinatorState {
        *self.state.borrow()
    }

    /// Receiver that observes every state change.
    pub fn watch_state(&self) -> watch::Receiver<CoordinatorState> {
        self.state.clone()
    }

    /// Full address from the cached snapshot, for the "Receive" action.
    /// `None` until a snapshot has been cached.
    #[must_use]
    pub fn receive_address(&self) -> Option<String> {
        self.cache
            .read(&self.account)
            .ok()
            .map(|snapshot| snapshot.header.full_address)
            .filter(|address| !address.is_empty())
    }

    // ── Observers ───────────────────────────────────────────────────

    pub fn subscribe_header<O: HeaderObserver + 'static>(&self, observer: &Arc<O>) -> ObserverId {
        let id = ObserverId::new();
        let weak: Weak<dyn HeaderObserver> = Arc::<O>::downgrade(observer);
        self.observers.headers.insert(id, weak);
        id
    }

    pub fn subscribe_pages<O: PagesObserver + 'static>(&self, observer: &Arc<O>) -> ObserverId {
        let id = ObserverId::new();
        let weak: Weak<dyn PagesObserver> = Arc::<O>::downgrade(observer);
        self.observers.pages.insert(id, weak);
        id
    }

    pub fn subscribe_loading<O: LoadingObserver + 'static>(&self, observer: &Arc<O>) -> ObserverId {
        let id = ObserverId::new();
        let weak: Weak<dyn LoadingObserver> = Arc::<O>::downgrade(observer);
        self.observers.loading.insert(id, weak);
        id
    }

    /// Subscribe one observer to all three channels under a single id.
    pub fn subscribe<O>(&self, observer: &Arc<O>) -> ObserverId
    where
        O: HeaderObserver + PagesObserver + LoadingObserver + 'static,
    {
        let id = ObserverId::new();
        let header: Weak<dyn HeaderObserver> = Arc::<O>::downgrade(observer);
        let pages: Weak<dyn PagesObserver> = Arc::<O>::downgrade(observer);
        let loading: Weak<dyn LoadingObserver> = Arc::<O>::downgrade(observer);
        self.observers.headers.insert(id, header);
        self.observers.pages.insert(id, pages);
        self.observers.loading.insert(id, loading);
        id
    }

    /// Remove the subscription from every channel it was registered on.
    /// Returns `false` if the id was unknown.
    pub fn unsubscribe(&self, id: ObserverId) -> bool {
        let header = self.observers.headers.remove(id);
        let pages = self.observers.pages.remove(id);
        let loading = self.observers.loading.remove(id);
        header || pages || loading
    }
}

// ── Worker ──────────────────────────────────────────────────────────

enum Command {
    Activate {
        ack: oneshot::Sender<CoordinatorState>,
    },
    Refresh,
    Completed {
        generation: u64,
        outcome: Result<BalanceSnapshot, CoreError>,
    },
}

#[derive(Default)]
struct Observers {
    headers: ObserverRegistry<dyn HeaderObserver>,
    pages: ObserverRegistry<dyn PagesObserver>,
    loading: ObserverRegistry<dyn LoadingObserver>,
}

impl Observers {
    /// Header first, then pages, from the same snapshot.
    ///
    /// Both audiences are captured before any callback runs: an observer
    /// subscribed from inside `on_header_changed` starts with the next
    /// snapshot instead of receiving these pages without their header.
    fn publish_snapshot(&self, snapshot: &BalanceSnapshot) {
        let headers = self.headers.live();
        let pages = self.pages.live();
        for observer in &headers {
            observer.on_header_changed(&snapshot.header);
        }
        for observer in &pages {
            observer.on_pages_changed(&snapshot.pages);
        }
    }

    fn publish_title(&self, title: &str) {
        self.headers.notify(|o| o.on_title_changed(title));
    }

    fn publish_loading_finished(&self) {
        self.loading.notify(|o| o.on_loading_finished());
    }
}

struct Worker {
    account: AccountId,
    cache: BalanceCache,
    source: Arc<dyn BalanceSource>,
    observers: Arc<Observers>,
    title: String,
    policy: StaleRefreshPolicy,
    runtime: Handle,
    /// Weak so that in-flight refreshes do not keep the worker alive.
    completions: mpsc::WeakUnboundedSender<Command>,
    state: watch::Sender<CoordinatorState>,
    /// What observers are currently looking at.
    displayed: CoordinatorState,
    next_generation: u64,
    applied_generation: u64,
    in_flight: usize,
}

impl Worker {
    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        while let Some(command) = commands.recv().await {
            match command {
                Command::Activate { ack } => self.activate(ack),
                Command::Refresh => self.start_refresh(),
                Command::Completed { generation, outcome } => {
                    self.complete(generation, outcome).await
                }
            }
        }
        debug!(account = %self.account, "balance coordinator stopped");
    }

    fn activate(&mut self, ack: oneshot::Sender<CoordinatorState>) {
        self.observers.publish_title(&self.title);

        let (snapshot, shown) = match self.cache.read(&self.account) {
            Ok(snapshot) => (snapshot, CoordinatorState::ShowingCache),
            Err(_) => (BalanceSnapshot::empty(), CoordinatorState::ShowingEmpty),
        };
        self.observers.publish_snapshot(&snapshot);
        self.show(shown);
        debug!(account = %self.account, state = %shown, "cache-first display");

        // The caller may have stopped waiting; the refresh still goes ahead.
        let _ = ack.send(shown);
        self.start_refresh();
    }

    fn start_refresh(&mut self) {
        self.next_generation += 1;
        let generation = self.next_generation;
        self.in_flight += 1;
        self.state.send_replace(CoordinatorState::Refreshing);
        debug!(account = %self.account, generation, source = self.source.name(), "refresh started");

        let source = self.source.clone();
        let account = self.account.clone();
        let completions = self.completions.clone();
        self.runtime.spawn(async move {
            let outcome = source.fetch_balance(&account).await;
            match completions.upgrade() {
                Some(tx) => {
                    let _ = tx.send(Command::Completed { generation, outcome });
                }
                None => debug!(%account, generation, "coordinator gone, dropping refresh result"),
            }
        });
    }

    async fn complete(&mut self, generation: u64, outcome: Result<BalanceSnapshot, CoreError>) {
        self.in_flight = self.in_flight.saturating_sub(1);

        let stale = self.policy == StaleRefreshPolicy::DiscardStale
            && generation < self.applied_generation;
        if stale {
            debug!(
                account = %self.account,
                generation,
                applied = self.applied_generation,
                "discarding stale refresh result"
            );
        } else {
            self.applied_generation = generation;
            match outcome {
                Ok(snapshot) => {
                    self.persist(&snapshot).await;
                    self.observers.publish_snapshot(&snapshot);
                    self.displayed = CoordinatorState::ShowingFresh;
                }
                Err(e) => {
                    warn!(account = %self.account, error = %e, "balance refresh failed, showing empty state");
                    self.observers.publish_snapshot(&BalanceSnapshot::empty());
                    self.displayed = CoordinatorState::ShowingEmpty;
                }
            }
        }

        if self.in_flight == 0 {
            self.state.send_replace(self.displayed);
        }
        self.observers.publish_loading_finished();
    }

    /// Write a fresh snapshot to the cache on the blocking pool, so a slow
    /// store (fsync on `FileStore`) never stalls the runtime. Observers still
    /// get the fresh balance if persisting it fails.
    async fn persist(&self, snapshot: &BalanceSnapshot) {
        let cache = self.cache.clone();
        let account = self.account.clone();
        let snapshot = snapshot.clone();
        let written = self
            .runtime
            .spawn_blocking(move || cache.write(&account, &snapshot))
            .await;

        match written {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!(account = %self.account, error = %e, "failed to cache refreshed balance")
            }
            Err(e) => warn!(account = %self.account, error = %e, "cache write task failed"),
        }
    }

    fn show(&mut self, state: CoordinatorState) {
        self.displayed = state;
        self.state.send_replace(state);
    }
}
