// Authorize - one Rust API over the Authorize.net payment services
//
// Card transactions, saved customer payments and recurring billing behind a
// single gateway with handle-based operations.

// Re-export the gateway
pub use authorize_gateway::*;

// Re-export optional crates
#[cfg(feature = "log")]
pub use authorize_log;

// Prelude for common imports
pub mod prelude {
    pub use authorize_gateway::prelude::*;
}
