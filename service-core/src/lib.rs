//! service-core: Shared infrastructure for the ledger sync services.
pub mod config;
pub mod error;
pub mod http;
pub mod observability;

pub use serde;
pub use tokio;
pub use tracing;
