pub mod http;
pub mod payhawk;
pub mod xero;
