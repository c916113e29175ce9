pub mod client;
pub mod connection;
pub mod contracts;
mod errors;
pub mod models;
pub mod query;

pub use client::{AccountingClient, XeroClient};
pub use connection::ConnectionClient;
pub use contracts::{BillData, BillPaymentData, TransactionData};
pub use query::escape_param;
