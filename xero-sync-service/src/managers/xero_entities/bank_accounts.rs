//! Per-currency ledger bank accounts.
//!
//! Each currency maps onto exactly one bank account identified by its code.
//! The remote lookup is authoritative on every call; nothing is cached.

use crate::error::XeroError;
use crate::services::xero::models::{AccountStatus, BankAccount};
use crate::services::xero::XeroClient;
use std::sync::Arc;

const DEFAULT_SORT_CODE: &str = "000000";
const BANK_ACCOUNT_CODE_PREFIX: &str = "PHWK-";

pub fn bank_account_code(currency: &str) -> String {
    format!("{}{}", BANK_ACCOUNT_CODE_PREFIX, currency)
}

pub fn bank_account_number(currency: &str) -> String {
    format!("{}-PAYHAWK-{}", DEFAULT_SORT_CODE, currency)
}

pub fn bank_account_name(currency: &str) -> String {
    format!("Payhawk {}", currency)
}

/// Currency encoded in a `PHWK-{CCY}` code.
pub fn currency_from_code(code: &str) -> Option<&str> {
    code.strip_prefix(BANK_ACCOUNT_CODE_PREFIX)
        .filter(|currency| !currency.is_empty())
}

#[derive(Clone)]
pub struct BankAccountManager {
    client: Arc<dyn XeroClient>,
}

impl BankAccountManager {
    pub fn new(client: Arc<dyn XeroClient>) -> Self {
        Self { client }
    }

    /// Bank accounts created for the expense platform.
    pub async fn list(&self) -> Result<Vec<BankAccount>, XeroError> {
        let accounts = self.client.get_bank_accounts().await?;
        Ok(accounts
            .into_iter()
            .filter(|account| {
                account
                    .code
                    .as_deref()
                    .and_then(currency_from_code)
                    .is_some()
            })
            .collect())
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Option<BankAccount>, XeroError> {
        self.client.get_bank_account_by_id(id).await
    }

    pub async fn get_or_create_by_currency(
        &self,
        currency: &str,
    ) -> Result<BankAccount, XeroError> {
        let code = bank_account_code(currency);

        match self.client.get_bank_account_by_code(&code).await? {
            Some(account) if account.status == AccountStatus::Archived => {
                tracing::info!(code = %code, "Reactivating archived bank account");
                self.client.activate_bank_account(&account).await
            }
            Some(account) => Ok(account),
            None => {
                tracing::info!(code = %code, currency = %currency, "Creating bank account");
                self.client
                    .create_bank_account(
                        &bank_account_name(currency),
                        &code,
                        &bank_account_number(currency),
                        currency,
                    )
                    .await
            }
        }
    }

    /// Currency of an existing platform bank account, by its code.
    pub async fn get_currency_by_bank_account_code(
        &self,
        code: &str,
    ) -> Result<Option<String>, XeroError> {
        let Some(currency) = currency_from_code(code) else {
            return Ok(None);
        };

        let account = self.client.get_bank_account_by_code(code).await?;
        Ok(account.map(|account| {
            account
                .currency_code
                .unwrap_or_else(|| currency.to_string())
        }))
    }
}
