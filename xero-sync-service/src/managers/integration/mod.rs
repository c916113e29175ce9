//! Export workflows from the expense platform into the ledger.

use crate::error::XeroError;
use crate::managers::xero_entities::bank_accounts::currency_from_code;
use crate::managers::xero_entities::{Manager, NewAccountTransaction, NewBill};
use crate::models::{BalanceTransfer, BankAccountSummary, DownloadedFile, Expense, Supplier};
use crate::services::payhawk::PayhawkClient;
use crate::services::xero::BillPaymentData;
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::instrument;

pub struct IntegrationManager {
    payhawk: Arc<dyn PayhawkClient>,
    entities: Manager,
    account_id: String,
    portal_url: String,
}

impl IntegrationManager {
    pub fn new(
        payhawk: Arc<dyn PayhawkClient>,
        entities: Manager,
        account_id: impl Into<String>,
        portal_url: impl Into<String>,
    ) -> Self {
        Self {
            payhawk,
            entities,
            account_id: account_id.into(),
            portal_url: portal_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// External reference of an expense exported as a bill.
    pub fn expense_url(&self, expense_id: &str) -> String {
        format!(
            "{}/expenses/{}?accountId={}",
            self.portal_url,
            urlencoding::encode(expense_id),
            urlencoding::encode(&self.account_id)
        )
    }

    /// External reference of one card transaction of an expense.
    pub fn expense_transaction_url(&self, expense_id: &str, transaction_id: &str) -> String {
        format!(
            "{}&transactionId={}",
            self.expense_url(expense_id),
            urlencoding::encode(transaction_id)
        )
    }

    pub fn transfer_url(&self, balance_id: &str, transfer_id: &str) -> String {
        format!(
            "{}/balances/{}/transfers/{}?accountId={}",
            self.portal_url,
            urlencoding::encode(balance_id),
            urlencoding::encode(transfer_id),
            urlencoding::encode(&self.account_id)
        )
    }

    pub async fn get_organisation_name(&self) -> Result<Option<String>, XeroError> {
        self.entities.get_organisation_name().await
    }

    #[instrument(skip(self))]
    pub async fn synchronize_chart_of_accounts(&self) -> Result<(), XeroError> {
        let codes = self.entities.get_expense_accounts().await?;
        self.payhawk.synchronize_chart_of_accounts(&codes).await?;
        tracing::info!(count = codes.len(), "Chart of accounts synchronized");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn synchronize_bank_accounts(&self) -> Result<(), XeroError> {
        let accounts = self.entities.bank_accounts().list().await?;
        let summaries: Vec<BankAccountSummary> = accounts
            .into_iter()
            .map(|account| {
                let currency = account.currency_code.clone().unwrap_or_else(|| {
                    account
                        .code
                        .as_deref()
                        .and_then(currency_from_code)
                        .unwrap_or_default()
                        .to_string()
                });
                BankAccountSummary {
                    id: account.account_id,
                    name: account.name,
                    number: account.bank_account_number.unwrap_or_default(),
                    currency,
                }
            })
            .collect();

        self.payhawk.synchronize_bank_accounts(&summaries).await?;
        tracing::info!(count = summaries.len(), "Bank accounts synchronized");
        Ok(())
    }

    /// Export an expense as bank transactions when it was card-paid, or as a
    /// bill otherwise. Downloaded files are removed whatever the outcome.
    #[instrument(skip(self))]
    pub async fn export_expense(&self, expense_id: &str) -> Result<(), XeroError> {
        let expense = self.payhawk.get_expense(expense_id).await?;
        let contact_id = self
            .entities
            .get_contact_id_for_supplier(&expense.supplier)
            .await?;
        let files = self.payhawk.download_files(&expense).await?;

        let result = if expense.transactions.is_empty() {
            self.export_bill(&expense, &contact_id, &files).await
        } else {
            self.export_card_transactions(&expense, &contact_id, &files)
                .await
        };

        remove_files(&files).await;
        result
    }

    async fn export_card_transactions(
        &self,
        expense: &Expense,
        contact_id: &str,
        files: &[DownloadedFile],
    ) -> Result<(), XeroError> {
        for transaction in &expense.transactions {
            let bank_account_id = self
                .entities
                .get_bank_account_id_for_currency(&transaction.card_currency)
                .await?;

            self.entities
                .create_or_update_account_transaction(&NewAccountTransaction {
                    date: transaction.settlement_date.date_naive(),
                    bank_account_id,
                    contact_id: contact_id.to_string(),
                    description: expense.note.clone(),
                    reference: transaction.description.clone(),
                    total_amount: -transaction.total_amount(),
                    account_code: expense.reconciliation.account_code.clone(),
                    files: files.to_vec(),
                    url: self.expense_transaction_url(&expense.id, &transaction.id),
                })
                .await?;
        }

        tracing::info!(
            expense_id = %expense.id,
            count = expense.transactions.len(),
            "Expense exported as bank transactions"
        );
        Ok(())
    }

    async fn export_bill(
        &self,
        expense: &Expense,
        contact_id: &str,
        files: &[DownloadedFile],
    ) -> Result<(), XeroError> {
        let date = expense
            .document
            .as_ref()
            .and_then(|document| document.date)
            .unwrap_or_else(|| expense.created_at.date_naive());
        let currency = expense
            .reconciliation
            .expense_currency
            .clone()
            .filter(|currency| !currency.is_empty())
            .unwrap_or_else(|| self.entities.defaults().currency.clone());
        let amount = expense.reconciliation.expense_total_amount;

        let bill_id = self
            .entities
            .create_or_update_bill(&NewBill {
                date,
                due_date: expense.payment_data.due_date,
                contact_id: contact_id.to_string(),
                description: expense.note.clone(),
                currency: Some(currency.clone()),
                total_amount: amount,
                account_code: expense.reconciliation.account_code.clone(),
                files: files.to_vec(),
                url: self.expense_url(&expense.id),
            })
            .await?;

        if expense.payment_data.is_paid {
            let bank_account_id = self
                .entities
                .get_bank_account_id_for_currency(&currency)
                .await?;

            self.entities
                .pay_bill_if_unpaid(&BillPaymentData {
                    date: expense.payment_data.date.unwrap_or(date),
                    bill_id: bill_id.clone(),
                    amount: amount.unwrap_or(0.0),
                    currency,
                    fx_rate: None,
                    bank_account_id,
                })
                .await?;
        }

        tracing::info!(expense_id = %expense.id, bill_id = %bill_id, "Expense exported as bill");
        Ok(())
    }

    /// Export every balance transfer in the date range as a deposit.
    #[instrument(skip(self))]
    pub async fn export_transfers(&self, start: NaiveDate, end: NaiveDate) -> Result<(), XeroError> {
        let transfers = self.payhawk.get_transfers(start, end).await?;
        if transfers.is_empty() {
            return Ok(());
        }

        let defaults = self.entities.defaults();
        let contact_id = self
            .entities
            .get_contact_id_for_supplier(&Supplier {
                name: Some(defaults.transfer_contact_name.clone()),
                vat: None,
            })
            .await?;

        for transfer in &transfers {
            self.export_transfer(transfer, &contact_id).await?;
        }

        tracing::info!(count = transfers.len(), "Transfers exported");
        Ok(())
    }

    async fn export_transfer(
        &self,
        transfer: &BalanceTransfer,
        contact_id: &str,
    ) -> Result<(), XeroError> {
        let defaults = self.entities.defaults();
        let bank_account_id = self
            .entities
            .get_bank_account_id_for_currency(&transfer.currency)
            .await?;

        self.entities
            .create_or_update_account_transaction(&NewAccountTransaction {
                date: transfer.date.date_naive(),
                bank_account_id,
                contact_id: contact_id.to_string(),
                description: Some(defaults.transfer_description.clone()),
                reference: defaults.transfer_description.clone(),
                total_amount: transfer.amount.abs(),
                account_code: None,
                files: Vec::new(),
                url: self.transfer_url(&transfer.balance_id, &transfer.id),
            })
            .await?;

        Ok(())
    }

    /// Remove whatever was exported for an expense.
    #[instrument(skip(self))]
    pub async fn delete_expense(&self, expense_id: &str) -> Result<(), XeroError> {
        let expense = self.payhawk.get_expense(expense_id).await?;

        for transaction in &expense.transactions {
            let url = self.expense_transaction_url(&expense.id, &transaction.id);
            self.entities.delete_account_transaction(&url).await?;
        }

        self.entities
            .delete_bill(&self.expense_url(&expense.id))
            .await?;

        tracing::info!(expense_id = %expense.id, "Expense removed from ledger");
        Ok(())
    }
}

async fn remove_files(files: &[DownloadedFile]) {
    for file in files {
        if let Err(e) = tokio::fs::remove_file(&file.path).await {
            tracing::warn!(path = %file.path.display(), error = %e, "Failed to remove temporary file");
        }
    }
}
