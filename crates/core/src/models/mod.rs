pub mod account;
pub mod amount;
pub mod settings;
pub mod snapshot;
pub mod state;
