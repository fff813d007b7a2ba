use serde::{Deserialize, Serialize};

/// Where the balance screen is in its activation cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CoordinatorState {
    /// Nothing shown yet.
    #[default]
    Idle,
    /// The cached snapshot is displayed.
    ShowingCache,
    /// The empty-state snapshot is displayed.
    ShowingEmpty,
    /// At least one remote refresh is in flight.
    Refreshing,
    /// A freshly fetched snapshot is displayed.
    ShowingFresh,
}

impl std::fmt::Display for CoordinatorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CoordinatorState::Idle => write!(f, "Idle"),
            CoordinatorState::ShowingCache => write!(f, "ShowingCache"),
            CoordinatorState::ShowingEmpty => write!(f, "ShowingEmpty"),
            CoordinatorState::Refreshing => write!(f, "Refreshing"),
            CoordinatorState::ShowingFresh => write!(f, "ShowingFresh"),
        }
    }
}
