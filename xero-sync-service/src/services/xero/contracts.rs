use chrono::NaiveDate;

/// Bank-statement line to create or update. A negative amount is money
/// leaving the bank account.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionData {
    pub date: NaiveDate,
    pub bank_account_id: String,
    pub contact_id: String,
    pub description: String,
    pub reference: String,
    pub amount: f64,
    pub account_code: String,
    pub url: String,
}

/// Supplier bill (ACCPAY invoice) to create or update.
#[derive(Debug, Clone, PartialEq)]
pub struct BillData {
    pub date: NaiveDate,
    pub due_date: NaiveDate,
    pub contact_id: String,
    pub description: String,
    pub currency: String,
    pub amount: f64,
    pub account_code: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BillPaymentData {
    pub date: NaiveDate,
    pub bill_id: String,
    pub amount: f64,
    pub currency: String,
    pub fx_rate: Option<f64>,
    pub bank_account_id: String,
}
