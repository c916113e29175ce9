//! Create-or-update workflows over the ledger client.
//!
//! Every workflow resolves the existing record by its external reference
//! URL, then creates or updates it and uploads only the attachments the
//! ledger does not have yet, one at a time and in input order.

pub mod bank_accounts;

pub use bank_accounts::BankAccountManager;

use crate::config::SyncDefaults;
use crate::error::XeroError;
use crate::models::{DownloadedFile, Supplier};
use crate::services::xero::models::{AccountCode, Attachment, InvoiceStatus};
use crate::services::xero::{BillData, BillPaymentData, TransactionData, XeroClient};
use chrono::NaiveDate;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::instrument;

#[derive(Debug, Clone, PartialEq)]
pub struct NewAccountTransaction {
    pub date: NaiveDate,
    pub bank_account_id: String,
    pub contact_id: String,
    pub description: Option<String>,
    pub reference: String,
    /// Signed; negative amounts are spent from the bank account.
    pub total_amount: f64,
    pub account_code: Option<String>,
    pub files: Vec<DownloadedFile>,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewBill {
    pub date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub contact_id: String,
    pub description: Option<String>,
    pub currency: Option<String>,
    pub total_amount: Option<f64>,
    pub account_code: Option<String>,
    pub files: Vec<DownloadedFile>,
    pub url: String,
}

fn non_empty_or(value: Option<&str>, default: &str) -> String {
    value
        .filter(|value| !value.is_empty())
        .unwrap_or(default)
        .to_string()
}

/// Files whose name is not among the existing attachments, order preserved.
fn missing_files<'a>(
    files: &'a [DownloadedFile],
    existing: &[Attachment],
) -> Vec<&'a DownloadedFile> {
    let existing: HashSet<&str> = existing.iter().map(|a| a.file_name.as_str()).collect();
    files
        .iter()
        .filter(|file| !existing.contains(file.file_name().as_str()))
        .collect()
}

#[derive(Clone)]
pub struct Manager {
    client: Arc<dyn XeroClient>,
    bank_accounts: BankAccountManager,
    defaults: SyncDefaults,
}

impl Manager {
    pub fn new(client: Arc<dyn XeroClient>, defaults: SyncDefaults) -> Self {
        Self {
            bank_accounts: BankAccountManager::new(client.clone()),
            client,
            defaults,
        }
    }

    pub fn bank_accounts(&self) -> &BankAccountManager {
        &self.bank_accounts
    }

    pub fn defaults(&self) -> &SyncDefaults {
        &self.defaults
    }

    pub async fn get_organisation_name(&self) -> Result<Option<String>, XeroError> {
        Ok(self
            .client
            .get_organisation()
            .await?
            .map(|organisation| organisation.name))
    }

    pub async fn get_expense_accounts(&self) -> Result<Vec<AccountCode>, XeroError> {
        self.client.get_expense_accounts().await
    }

    /// Contact for a supplier, created when the ledger has none. Suppliers
    /// without a name share the default contact and never carry a tax id.
    #[instrument(skip(self))]
    pub async fn get_contact_id_for_supplier(
        &self,
        supplier: &Supplier,
    ) -> Result<String, XeroError> {
        let name = supplier.name.as_deref().filter(|name| !name.is_empty());
        let contact_name = name.unwrap_or(&self.defaults.contact_name);
        let tax_id = name.and(supplier.vat.as_deref());

        if let Some(contact) = self.client.find_contact(contact_name, tax_id).await? {
            return Ok(contact.contact_id);
        }

        let contact = self.client.create_contact(contact_name, tax_id).await?;
        Ok(contact.contact_id)
    }

    pub async fn get_bank_account_id_for_currency(
        &self,
        currency: &str,
    ) -> Result<String, XeroError> {
        let account = self.bank_accounts.get_or_create_by_currency(currency).await?;
        Ok(account.account_id)
    }

    #[instrument(skip(self, input), fields(url = %input.url))]
    pub async fn create_or_update_account_transaction(
        &self,
        input: &NewAccountTransaction,
    ) -> Result<String, XeroError> {
        let data = TransactionData {
            date: input.date,
            bank_account_id: input.bank_account_id.clone(),
            contact_id: input.contact_id.clone(),
            description: non_empty_or(input.description.as_deref(), &self.defaults.description),
            reference: input.reference.clone(),
            amount: input.total_amount,
            account_code: non_empty_or(
                input.account_code.as_deref(),
                &self.defaults.account_code,
            ),
            url: input.url.clone(),
        };

        let (transaction_id, files) = match self.client.get_transaction_id_by_url(&input.url).await?
        {
            None => {
                let id = self.client.create_transaction(&data).await?;
                (id, input.files.iter().collect::<Vec<_>>())
            }
            Some(id) => {
                self.client.update_transaction(&id, &data).await?;
                let existing = self.client.get_transaction_attachments(&id).await?;
                let files = missing_files(&input.files, &existing);
                (id, files)
            }
        };

        for file in files {
            self.client
                .upload_transaction_attachment(
                    &transaction_id,
                    &file.file_name(),
                    &file.path,
                    &file.content_type,
                )
                .await?;
        }

        Ok(transaction_id)
    }

    /// Create or update the bill keyed by `input.url` and return its id.
    #[instrument(skip(self, input), fields(url = %input.url))]
    pub async fn create_or_update_bill(&self, input: &NewBill) -> Result<String, XeroError> {
        let data = BillData {
            date: input.date,
            due_date: input.due_date.unwrap_or(input.date),
            contact_id: input.contact_id.clone(),
            description: non_empty_or(input.description.as_deref(), &self.defaults.description),
            currency: non_empty_or(input.currency.as_deref(), &self.defaults.currency),
            amount: input.total_amount.unwrap_or(0.0),
            account_code: non_empty_or(
                input.account_code.as_deref(),
                &self.defaults.account_code,
            ),
            url: input.url.clone(),
        };

        let (bill_id, files) = match self.client.get_bill_by_url(&input.url).await? {
            None => {
                let id = self.client.create_bill(&data).await?;
                (id, input.files.iter().collect::<Vec<_>>())
            }
            Some(existing) => {
                let id = existing.invoice_id.clone();
                self.client.update_bill(&id, &data, &existing).await?;
                let attachments = self.client.get_bill_attachments(&id).await?;
                let files = missing_files(&input.files, &attachments);
                (id, files)
            }
        };

        for file in files {
            self.client
                .upload_bill_attachment(&bill_id, &file.file_name(), &file.path, &file.content_type)
                .await?;
        }

        Ok(bill_id)
    }

    /// Pay a bill unless the ledger already reports it paid. Returns whether
    /// a payment was created.
    #[instrument(skip(self, payment), fields(bill_id = %payment.bill_id))]
    pub async fn pay_bill_if_unpaid(&self, payment: &BillPaymentData) -> Result<bool, XeroError> {
        let bill = self.client.get_bill(&payment.bill_id).await?;
        if bill.is_some_and(|bill| bill.status == InvoiceStatus::Paid) {
            tracing::info!("Bill already paid, skipping payment");
            return Ok(false);
        }

        self.client.pay_bill(payment).await?;
        Ok(true)
    }

    /// Delete the bank transaction keyed by `url`, if any.
    pub async fn delete_account_transaction(&self, url: &str) -> Result<bool, XeroError> {
        match self.client.get_transaction_id_by_url(url).await? {
            Some(id) => {
                self.client.delete_transaction(&id).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Delete the bill keyed by `url`, if any. Paid bills are refused.
    pub async fn delete_bill(&self, url: &str) -> Result<bool, XeroError> {
        match self.client.get_bill_id_by_url(url).await? {
            Some(id) => {
                self.client.delete_bill(&id).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attachment(name: &str) -> Attachment {
        Attachment {
            attachment_id: None,
            file_name: name.to_string(),
            mime_type: None,
            content_length: None,
        }
    }

    #[test]
    fn test_missing_files_keeps_input_order() {
        let files = vec![
            DownloadedFile::new("/tmp/c.pdf", "application/pdf"),
            DownloadedFile::new("/tmp/a.png", "image/png"),
            DownloadedFile::new("/tmp/b.jpg", "image/jpeg"),
        ];
        let missing = missing_files(&files, &[attachment("a.png")]);
        let names: Vec<String> = missing.iter().map(|f| f.file_name()).collect();
        assert_eq!(names, vec!["c.pdf", "b.jpg"]);
    }

    #[test]
    fn test_non_empty_or() {
        assert_eq!(non_empty_or(None, "429"), "429");
        assert_eq!(non_empty_or(Some(""), "429"), "429");
        assert_eq!(non_empty_or(Some("310"), "429"), "310");
    }
}
