//! Typed Xero Accounting API records.
//!
//! Only the fields the sync reads or writes are modelled; everything else in
//! the remote payloads is ignored on deserialization.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BankTransactionType {
    Spend,
    Receive,
}

impl BankTransactionType {
    /// Negative amounts leave the bank account, everything else enters it.
    pub fn from_amount(amount: f64) -> Self {
        if amount < 0.0 {
            BankTransactionType::Spend
        } else {
            BankTransactionType::Receive
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineAmountType {
    Exclusive,
    Inclusive,
    NoTax,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceType {
    Accpay,
    Accrec,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceStatus {
    Draft,
    Submitted,
    Authorised,
    Paid,
    Voided,
    Deleted,
    #[serde(other)]
    Unknown,
}

impl InvoiceStatus {
    /// Deleted and voided bills no longer hold their external reference.
    pub fn is_removed(&self) -> bool {
        matches!(self, InvoiceStatus::Deleted | InvoiceStatus::Voided)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountStatus {
    Active,
    Archived,
    Deleted,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Contact {
    #[serde(rename = "ContactID")]
    pub contact_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub tax_number: Option<String>,
}

/// Chart-of-accounts entry, bank accounts included.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Account {
    #[serde(rename = "AccountID")]
    pub account_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default, rename = "Type")]
    pub account_type: Option<String>,
    #[serde(default)]
    pub class: Option<String>,
    #[serde(default)]
    pub bank_account_number: Option<String>,
    #[serde(default)]
    pub currency_code: Option<String>,
    #[serde(default = "default_account_status")]
    pub status: AccountStatus,
}

fn default_account_status() -> AccountStatus {
    AccountStatus::Active
}

/// Bank accounts are chart-of-accounts entries of type `BANK`.
pub type BankAccount = Account;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BankTransaction {
    #[serde(rename = "BankTransactionID")]
    pub bank_transaction_id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl BankTransaction {
    pub fn is_deleted(&self) -> bool {
        self.status.as_deref() == Some("DELETED")
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Invoice {
    #[serde(rename = "InvoiceID")]
    pub invoice_id: String,
    #[serde(default = "default_invoice_status")]
    pub status: InvoiceStatus,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub currency_code: Option<String>,
    #[serde(default)]
    pub total: Option<f64>,
    #[serde(default)]
    pub amount_due: Option<f64>,
}

fn default_invoice_status() -> InvoiceStatus {
    InvoiceStatus::Draft
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Payment {
    #[serde(rename = "PaymentID")]
    pub payment_id: String,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Attachment {
    #[serde(default, rename = "AttachmentID")]
    pub attachment_id: Option<String>,
    pub file_name: String,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub content_length: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Currency {
    pub code: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Organisation {
    pub name: String,
    #[serde(default)]
    pub base_currency: Option<String>,
}

/// Chart-of-accounts code offered to the expense platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountCode {
    pub code: String,
    pub name: String,
}

/// Tokens returned by the identity server.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenSet {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub id_token: Option<String>,
}

/// Organisation connection granted to the app.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    pub id: String,
    pub tenant_id: String,
    #[serde(default)]
    pub tenant_type: Option<String>,
    #[serde(default)]
    pub tenant_name: Option<String>,
}

// Write payloads.

#[derive(Debug, Clone, Serialize)]
pub(crate) struct AccountRef<'a> {
    #[serde(rename = "AccountID")]
    pub account_id: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ContactRef<'a> {
    #[serde(rename = "ContactID")]
    pub contact_id: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct InvoiceRef<'a> {
    #[serde(rename = "InvoiceID")]
    pub invoice_id: &'a str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct LineItem<'a> {
    pub description: &'a str,
    pub account_code: &'a str,
    pub quantity: f64,
    pub unit_amount: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct BankTransactionPayload<'a> {
    #[serde(
        rename = "BankTransactionID",
        skip_serializing_if = "Option::is_none"
    )]
    pub bank_transaction_id: Option<&'a str>,
    #[serde(rename = "Type")]
    pub transaction_type: BankTransactionType,
    pub bank_account: AccountRef<'a>,
    pub contact: ContactRef<'a>,
    pub reference: &'a str,
    pub date: NaiveDate,
    pub url: &'a str,
    pub line_amount_types: LineAmountType,
    pub line_items: Vec<LineItem<'a>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct InvoicePayload<'a> {
    #[serde(rename = "InvoiceID", skip_serializing_if = "Option::is_none")]
    pub invoice_id: Option<&'a str>,
    #[serde(rename = "Type")]
    pub invoice_type: InvoiceType,
    pub contact: ContactRef<'a>,
    pub date: NaiveDate,
    pub due_date: NaiveDate,
    pub currency_code: &'a str,
    pub url: &'a str,
    pub line_amount_types: LineAmountType,
    pub line_items: Vec<LineItem<'a>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct PaymentPayload<'a> {
    pub invoice: InvoiceRef<'a>,
    pub account: AccountRef<'a>,
    pub date: NaiveDate,
    pub amount: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency_rate: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct ContactPayload<'a> {
    pub name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax_number: Option<&'a str>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct BankAccountPayload<'a> {
    pub name: &'a str,
    pub code: &'a str,
    #[serde(rename = "Type")]
    pub account_type: &'a str,
    pub bank_account_number: &'a str,
    pub currency_code: &'a str,
}
