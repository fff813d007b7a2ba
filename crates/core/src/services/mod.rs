pub mod observer;
pub mod refresh_coordinator;
