#![allow(dead_code)]

use async_trait::async_trait;
use chrono::NaiveDate;
use service_core::http::{RateLimitPolicy, RequestLock};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::MockServer;
use xero_sync_service::config::SyncDefaults;
use xero_sync_service::error::XeroError;
use xero_sync_service::managers::{IntegrationManager, Manager};
use xero_sync_service::models::{
    BalanceTransfer, BankAccountSummary, DownloadedFile, Expense,
};
use xero_sync_service::services::http::HttpClient;
use xero_sync_service::services::payhawk::PayhawkClient;
use xero_sync_service::services::xero::models::{
    Account, AccountCode, AccountStatus, Attachment, BankAccount, Contact, Invoice,
    InvoiceStatus, Organisation,
};
use xero_sync_service::services::xero::{
    AccountingClient, BillData, BillPaymentData, TransactionData, XeroClient,
};

pub const TEST_TENANT_ID: &str = "test-tenant";
pub const TEST_ACCESS_TOKEN: &str = "test-access-token";
pub const TEST_ACCOUNT_ID: &str = "test-account";
pub const TEST_PORTAL_URL: &str = "https://portal.test";

/// Retry policy with millisecond delays so backoff tests stay fast.
pub fn fast_policy() -> RateLimitPolicy {
    RateLimitPolicy {
        max_attempts: 5,
        default_delay: Duration::from_millis(10),
        min_delay: Duration::ZERO,
    }
}

pub fn http_client(server: &MockServer, lock: RequestLock) -> HttpClient {
    HttpClient::new(
        server.uri(),
        Some(secrecy::Secret::new(TEST_ACCESS_TOKEN.to_string())),
        Some(TEST_TENANT_ID.to_string()),
        lock,
    )
    .expect("Failed to build HTTP client")
    .with_rate_limit_policy(fast_policy())
}

pub fn accounting_client(server: &MockServer) -> AccountingClient {
    AccountingClient::new(http_client(server, RequestLock::new()))
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

/// Write a small file under a fresh temp directory and describe it.
pub fn temp_file(name: &str, content_type: &str) -> DownloadedFile {
    let dir = std::env::temp_dir().join(format!("xero-sync-test-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).expect("Failed to create temp dir");
    let path: PathBuf = dir.join(name);
    std::fs::write(&path, name.as_bytes()).expect("Failed to write temp file");
    DownloadedFile::new(path, content_type)
}

pub fn bank_account(id: &str, code: &str, currency: &str, status: AccountStatus) -> BankAccount {
    Account {
        account_id: id.to_string(),
        name: format!("Payhawk {}", currency),
        code: Some(code.to_string()),
        account_type: Some("BANK".to_string()),
        class: Some("ASSET".to_string()),
        bank_account_number: Some(format!("000000-PAYHAWK-{}", currency)),
        currency_code: Some(currency.to_string()),
        status,
    }
}

pub fn invoice(id: &str, url: &str, status: InvoiceStatus) -> Invoice {
    Invoice {
        invoice_id: id.to_string(),
        status,
        url: Some(url.to_string()),
        currency_code: Some("GBP".to_string()),
        total: None,
        amount_due: None,
    }
}

fn attachment(file_name: &str) -> Attachment {
    Attachment {
        attachment_id: None,
        file_name: file_name.to_string(),
        mime_type: None,
        content_length: None,
    }
}

#[derive(Default)]
pub struct LedgerState {
    pub calls: Vec<String>,
    pub next_id: u32,
    pub organisation: Option<Organisation>,
    pub expense_accounts: Vec<AccountCode>,
    pub contacts: Vec<Contact>,
    pub bank_accounts: Vec<BankAccount>,
    /// Transaction id to its latest payload.
    pub transactions: HashMap<String, TransactionData>,
    pub transaction_attachments: HashMap<String, Vec<String>>,
    pub bills: HashMap<String, (Invoice, Option<BillData>)>,
    pub bill_attachments: HashMap<String, Vec<String>>,
    pub payments: Vec<BillPaymentData>,
    pub deleted: Vec<String>,
}

impl LedgerState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-{}", prefix, self.next_id)
    }
}

/// In-memory ledger recording every call made through the client trait.
#[derive(Clone, Default)]
pub struct FakeLedger {
    pub state: Arc<Mutex<LedgerState>>,
}

impl FakeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn calls_starting_with(&self, prefix: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|call| call.starts_with(prefix))
            .collect()
    }

    pub fn with_state<R>(&self, f: impl FnOnce(&mut LedgerState) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }

    fn record(&self, call: String) {
        self.state.lock().unwrap().calls.push(call);
    }
}

#[async_trait]
impl XeroClient for FakeLedger {
    async fn get_organisation(&self) -> Result<Option<Organisation>, XeroError> {
        self.record("get_organisation".to_string());
        Ok(self.state.lock().unwrap().organisation.clone())
    }

    async fn get_expense_accounts(&self) -> Result<Vec<AccountCode>, XeroError> {
        self.record("get_expense_accounts".to_string());
        Ok(self.state.lock().unwrap().expense_accounts.clone())
    }

    async fn find_contact(
        &self,
        name: &str,
        tax_id: Option<&str>,
    ) -> Result<Option<Contact>, XeroError> {
        self.record(format!("find_contact:{}:{}", name, tax_id.unwrap_or("")));
        let state = self.state.lock().unwrap();
        Ok(state
            .contacts
            .iter()
            .find(|c| c.name == name && (tax_id.is_none() || c.tax_number.as_deref() == tax_id))
            .cloned())
    }

    async fn create_contact(
        &self,
        name: &str,
        tax_id: Option<&str>,
    ) -> Result<Contact, XeroError> {
        self.record(format!("create_contact:{}:{}", name, tax_id.unwrap_or("")));
        let mut state = self.state.lock().unwrap();
        let contact = Contact {
            contact_id: state.next_id("contact"),
            name: name.to_string(),
            tax_number: tax_id.map(str::to_string),
        };
        state.contacts.push(contact.clone());
        Ok(contact)
    }

    async fn get_bank_accounts(&self) -> Result<Vec<BankAccount>, XeroError> {
        self.record("get_bank_accounts".to_string());
        Ok(self.state.lock().unwrap().bank_accounts.clone())
    }

    async fn get_bank_account_by_id(&self, id: &str) -> Result<Option<BankAccount>, XeroError> {
        self.record(format!("get_bank_account_by_id:{}", id));
        let state = self.state.lock().unwrap();
        Ok(state
            .bank_accounts
            .iter()
            .find(|a| a.account_id == id)
            .cloned())
    }

    async fn get_bank_account_by_code(
        &self,
        code: &str,
    ) -> Result<Option<BankAccount>, XeroError> {
        self.record(format!("get_bank_account_by_code:{}", code));
        let state = self.state.lock().unwrap();
        Ok(state
            .bank_accounts
            .iter()
            .find(|a| a.code.as_deref() == Some(code))
            .cloned())
    }

    async fn activate_bank_account(
        &self,
        account: &BankAccount,
    ) -> Result<BankAccount, XeroError> {
        self.record(format!("activate_bank_account:{}", account.account_id));
        let mut state = self.state.lock().unwrap();
        let existing = state
            .bank_accounts
            .iter_mut()
            .find(|a| a.account_id == account.account_id)
            .ok_or_else(|| XeroError::NotFound(account.account_id.clone()))?;
        existing.status = AccountStatus::Active;
        Ok(existing.clone())
    }

    async fn create_bank_account(
        &self,
        name: &str,
        code: &str,
        number: &str,
        currency: &str,
    ) -> Result<BankAccount, XeroError> {
        self.record(format!(
            "create_bank_account:{}:{}:{}:{}",
            name, code, number, currency
        ));
        let mut state = self.state.lock().unwrap();
        let id = state.next_id("bank");
        let mut account = bank_account(&id, code, currency, AccountStatus::Active);
        account.name = name.to_string();
        account.bank_account_number = Some(number.to_string());
        state.bank_accounts.push(account.clone());
        Ok(account)
    }

    async fn get_transaction_id_by_url(&self, url: &str) -> Result<Option<String>, XeroError> {
        self.record(format!("get_transaction_id_by_url:{}", url));
        let state = self.state.lock().unwrap();
        Ok(state
            .transactions
            .iter()
            .find(|(_, data)| data.url == url)
            .map(|(id, _)| id.clone()))
    }

    async fn create_transaction(&self, data: &TransactionData) -> Result<String, XeroError> {
        self.record(format!("create_transaction:{}", data.url));
        let mut state = self.state.lock().unwrap();
        let id = state.next_id("transaction");
        state.transactions.insert(id.clone(), data.clone());
        Ok(id)
    }

    async fn update_transaction(&self, id: &str, data: &TransactionData) -> Result<(), XeroError> {
        self.record(format!("update_transaction:{}", id));
        self.state
            .lock()
            .unwrap()
            .transactions
            .insert(id.to_string(), data.clone());
        Ok(())
    }

    async fn delete_transaction(&self, id: &str) -> Result<(), XeroError> {
        self.record(format!("delete_transaction:{}", id));
        let mut state = self.state.lock().unwrap();
        state.transactions.remove(id);
        state.deleted.push(id.to_string());
        Ok(())
    }

    async fn get_transaction_attachments(&self, id: &str) -> Result<Vec<Attachment>, XeroError> {
        self.record(format!("get_transaction_attachments:{}", id));
        let state = self.state.lock().unwrap();
        Ok(state
            .transaction_attachments
            .get(id)
            .map(|names| names.iter().map(|n| attachment(n)).collect())
            .unwrap_or_default())
    }

    async fn upload_transaction_attachment(
        &self,
        id: &str,
        file_name: &str,
        _path: &Path,
        _content_type: &str,
    ) -> Result<(), XeroError> {
        self.record(format!("upload_transaction_attachment:{}:{}", id, file_name));
        self.state
            .lock()
            .unwrap()
            .transaction_attachments
            .entry(id.to_string())
            .or_default()
            .push(file_name.to_string());
        Ok(())
    }

    async fn get_bill_id_by_url(&self, url: &str) -> Result<Option<String>, XeroError> {
        Ok(self
            .get_bill_by_url(url)
            .await?
            .map(|invoice| invoice.invoice_id))
    }

    async fn get_bill_by_url(&self, url: &str) -> Result<Option<Invoice>, XeroError> {
        self.record(format!("get_bill_by_url:{}", url));
        let state = self.state.lock().unwrap();
        Ok(state
            .bills
            .values()
            .map(|(invoice, _)| invoice)
            .find(|invoice| invoice.url.as_deref() == Some(url) && !invoice.status.is_removed())
            .cloned())
    }

    async fn get_bill(&self, id: &str) -> Result<Option<Invoice>, XeroError> {
        self.record(format!("get_bill:{}", id));
        let state = self.state.lock().unwrap();
        Ok(state.bills.get(id).map(|(invoice, _)| invoice.clone()))
    }

    async fn create_bill(&self, data: &BillData) -> Result<String, XeroError> {
        self.record(format!("create_bill:{}", data.url));
        let mut state = self.state.lock().unwrap();
        let id = state.next_id("bill");
        let mut created = invoice(&id, &data.url, InvoiceStatus::Draft);
        created.currency_code = Some(data.currency.clone());
        state.bills.insert(id.clone(), (created, Some(data.clone())));
        Ok(id)
    }

    async fn update_bill(
        &self,
        id: &str,
        data: &BillData,
        existing: &Invoice,
    ) -> Result<(), XeroError> {
        if existing.status == InvoiceStatus::Paid {
            return Err(XeroError::OperationNotAllowed(format!(
                "Bill {} is already paid",
                id
            )));
        }
        self.record(format!("update_bill:{}", id));
        let mut state = self.state.lock().unwrap();
        if let Some(entry) = state.bills.get_mut(id) {
            entry.1 = Some(data.clone());
        }
        Ok(())
    }

    async fn delete_bill(&self, id: &str) -> Result<(), XeroError> {
        let mut state = self.state.lock().unwrap();
        let status = state.bills.get(id).map(|(invoice, _)| invoice.status);
        if status == Some(InvoiceStatus::Paid) {
            return Err(XeroError::OperationNotAllowed(format!(
                "Bill {} is already paid",
                id
            )));
        }
        state.calls.push(format!("delete_bill:{}", id));
        if let Some(entry) = state.bills.get_mut(id) {
            entry.0.status = InvoiceStatus::Deleted;
        }
        state.deleted.push(id.to_string());
        Ok(())
    }

    async fn pay_bill(&self, payment: &BillPaymentData) -> Result<(), XeroError> {
        let mut state = self.state.lock().unwrap();
        let Some((invoice, _)) = state.bills.get_mut(&payment.bill_id) else {
            return Err(XeroError::NotFound(payment.bill_id.clone()));
        };
        if invoice.status == InvoiceStatus::Paid {
            return Err(XeroError::OperationNotAllowed(format!(
                "Bill {} is already paid",
                payment.bill_id
            )));
        }
        invoice.status = InvoiceStatus::Paid;
        state.calls.push(format!("pay_bill:{}", payment.bill_id));
        state.payments.push(payment.clone());
        Ok(())
    }

    async fn get_bill_attachments(&self, id: &str) -> Result<Vec<Attachment>, XeroError> {
        self.record(format!("get_bill_attachments:{}", id));
        let state = self.state.lock().unwrap();
        Ok(state
            .bill_attachments
            .get(id)
            .map(|names| names.iter().map(|n| attachment(n)).collect())
            .unwrap_or_default())
    }

    async fn upload_bill_attachment(
        &self,
        id: &str,
        file_name: &str,
        _path: &Path,
        _content_type: &str,
    ) -> Result<(), XeroError> {
        self.record(format!("upload_bill_attachment:{}:{}", id, file_name));
        self.state
            .lock()
            .unwrap()
            .bill_attachments
            .entry(id.to_string())
            .or_default()
            .push(file_name.to_string());
        Ok(())
    }

    async fn ensure_currency(&self, code: &str) -> Result<(), XeroError> {
        self.record(format!("ensure_currency:{}", code));
        Ok(())
    }
}

#[derive(Default)]
pub struct PlatformState {
    pub expenses: HashMap<String, Expense>,
    pub files: HashMap<String, Vec<DownloadedFile>>,
    pub transfers: Vec<BalanceTransfer>,
    pub synchronized_codes: Vec<AccountCode>,
    pub synchronized_bank_accounts: Vec<BankAccountSummary>,
}

/// In-memory expense platform.
#[derive(Clone, Default)]
pub struct FakePlatform {
    pub state: Arc<Mutex<PlatformState>>,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_expense(&self, expense: Expense, files: Vec<DownloadedFile>) {
        let mut state = self.state.lock().unwrap();
        state.files.insert(expense.id.clone(), files);
        state.expenses.insert(expense.id.clone(), expense);
    }

    pub fn with_state<R>(&self, f: impl FnOnce(&mut PlatformState) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }
}

#[async_trait]
impl PayhawkClient for FakePlatform {
    async fn get_expense(&self, expense_id: &str) -> Result<Expense, XeroError> {
        self.state
            .lock()
            .unwrap()
            .expenses
            .get(expense_id)
            .cloned()
            .ok_or_else(|| XeroError::NotFound(format!("Expense {}", expense_id)))
    }

    async fn get_transfers(
        &self,
        _start: NaiveDate,
        _end: NaiveDate,
    ) -> Result<Vec<BalanceTransfer>, XeroError> {
        Ok(self.state.lock().unwrap().transfers.clone())
    }

    async fn download_files(&self, expense: &Expense) -> Result<Vec<DownloadedFile>, XeroError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .files
            .get(&expense.id)
            .cloned()
            .unwrap_or_default())
    }

    async fn synchronize_chart_of_accounts(
        &self,
        codes: &[AccountCode],
    ) -> Result<(), XeroError> {
        self.state.lock().unwrap().synchronized_codes = codes.to_vec();
        Ok(())
    }

    async fn synchronize_bank_accounts(
        &self,
        accounts: &[BankAccountSummary],
    ) -> Result<(), XeroError> {
        self.state.lock().unwrap().synchronized_bank_accounts = accounts.to_vec();
        Ok(())
    }
}

pub fn entities_manager(ledger: &FakeLedger) -> Manager {
    Manager::new(Arc::new(ledger.clone()), SyncDefaults::default())
}

pub fn integration_manager(ledger: &FakeLedger, platform: &FakePlatform) -> IntegrationManager {
    IntegrationManager::new(
        Arc::new(platform.clone()),
        entities_manager(ledger),
        TEST_ACCOUNT_ID,
        TEST_PORTAL_URL,
    )
}
