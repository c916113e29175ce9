//! Expense platform API.
//!
//! Only the contract lives here; the HTTP implementation is provided by the
//! hosting service.

use crate::error::XeroError;
use crate::models::{BalanceTransfer, BankAccountSummary, DownloadedFile, Expense};
use crate::services::xero::models::AccountCode;
use async_trait::async_trait;
use chrono::NaiveDate;

#[async_trait]
pub trait PayhawkClient: Send + Sync {
    async fn get_expense(&self, expense_id: &str) -> Result<Expense, XeroError>;

    async fn get_transfers(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<BalanceTransfer>, XeroError>;

    /// Fetch the expense document files to local temporary paths.
    async fn download_files(&self, expense: &Expense) -> Result<Vec<DownloadedFile>, XeroError>;

    async fn synchronize_chart_of_accounts(&self, codes: &[AccountCode])
        -> Result<(), XeroError>;

    async fn synchronize_bank_accounts(
        &self,
        accounts: &[BankAccountSummary],
    ) -> Result<(), XeroError>;
}
