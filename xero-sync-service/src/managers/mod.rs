pub mod integration;
pub mod xero_entities;

pub use integration::IntegrationManager;
pub use xero_entities::{BankAccountManager, Manager, NewAccountTransaction, NewBill};
