pub mod payhawk;

pub use payhawk::{
    BalanceTransfer, BankAccountSummary, CardTransaction, Document, DownloadedFile, Expense,
    PaymentData, Reconciliation, RemoteFile, Supplier,
};
