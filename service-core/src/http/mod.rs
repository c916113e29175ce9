//! Shared building blocks for outbound HTTP clients.
pub mod lock;
pub mod retry;

pub use lock::RequestLock;
pub use retry::RateLimitPolicy;
