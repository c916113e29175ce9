//! Records received from the expense platform.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: String,
    #[serde(default)]
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub document: Option<Document>,
    #[serde(default)]
    pub transactions: Vec<CardTransaction>,
    pub reconciliation: Reconciliation,
    #[serde(default)]
    pub payment_data: PaymentData,
    #[serde(default)]
    pub supplier: Supplier,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub files: Vec<RemoteFile>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteFile {
    pub url: String,
    pub content_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Supplier {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub vat: Option<String>,
}

/// A card payment settling (part of) an expense.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardTransaction {
    pub id: String,
    #[serde(default)]
    pub description: String,
    pub card_amount: f64,
    pub card_currency: String,
    #[serde(default)]
    pub fees: f64,
    pub settlement_date: DateTime<Utc>,
}

impl CardTransaction {
    /// Amount leaving the card account, fees included.
    pub fn total_amount(&self) -> f64 {
        self.card_amount + self.fees
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reconciliation {
    #[serde(default)]
    pub expense_total_amount: Option<f64>,
    #[serde(default)]
    pub expense_currency: Option<String>,
    #[serde(default)]
    pub account_code: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentData {
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub is_paid: bool,
}

/// File fetched to a local temporary path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedFile {
    pub content_type: String,
    pub path: PathBuf,
}

impl DownloadedFile {
    pub fn new(path: impl Into<PathBuf>, content_type: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content_type: content_type.into(),
        }
    }

    /// Basename of the local path; the attachment name on the ledger.
    pub fn file_name(&self) -> String {
        file_name_of(&self.path)
    }
}

pub(crate) fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Money wired into a platform balance.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceTransfer {
    pub id: String,
    pub balance_id: String,
    pub amount: f64,
    pub currency: String,
    pub date: DateTime<Utc>,
}

/// Ledger bank account as published back to the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BankAccountSummary {
    pub id: String,
    pub name: String,
    pub number: String,
    pub currency: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_file_name_is_basename() {
        let file = DownloadedFile::new("/tmp/payhawk/4f2a.pdf", "application/pdf");
        assert_eq!(file.file_name(), "4f2a.pdf");
    }

    #[test]
    fn test_expense_deserializes_with_optional_parts_missing() {
        let expense: Expense = serde_json::from_value(json!({
            "id": "1",
            "createdAt": "2019-03-01T10:00:00Z",
            "reconciliation": { "expenseTotalAmount": 12.05, "expenseCurrency": "EUR" }
        }))
        .unwrap();

        assert!(expense.document.is_none());
        assert!(expense.transactions.is_empty());
        assert!(!expense.payment_data.is_paid);
        assert_eq!(expense.supplier, Supplier::default());
    }

    #[test]
    fn test_card_transaction_total_includes_fees() {
        let transaction: CardTransaction = serde_json::from_value(json!({
            "id": "t1",
            "cardAmount": 10.0,
            "cardCurrency": "EUR",
            "fees": 0.5,
            "settlementDate": "2019-03-02T00:00:00Z"
        }))
        .unwrap();
        assert_eq!(transaction.total_amount(), 10.5);
    }
}
