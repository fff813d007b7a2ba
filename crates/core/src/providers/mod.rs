pub mod traits;

// Remote balance source implementations
pub mod tonapi;
