//! Xero Accounting API client.
//!
//! Maps ledger operations onto the accounting endpoints, keeping raw JSON
//! inside this module. External reference URLs stored in the `Url` field of
//! bank transactions and bills are the idempotency keys for lookups.

use super::contracts::{BillData, BillPaymentData, TransactionData};
use super::errors;
use super::models::{
    Account, AccountCode, AccountRef, AccountStatus, Attachment, BankAccount,
    BankAccountPayload, BankTransaction, BankTransactionPayload, BankTransactionType, Contact,
    ContactPayload, ContactRef, Currency, Invoice, InvoicePayload, InvoiceRef, InvoiceStatus,
    InvoiceType, LineAmountType, LineItem, Organisation, Payment, PaymentPayload,
};
use super::query::WhereClause;
use crate::error::XeroError;
use crate::services::http::{EntityResponseType, HttpClient, RequestOptions};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::path::Path;
use tracing::instrument;

/// Ledger operations used by the entity managers.
#[async_trait]
pub trait XeroClient: Send + Sync {
    async fn get_organisation(&self) -> Result<Option<Organisation>, XeroError>;
    async fn get_expense_accounts(&self) -> Result<Vec<AccountCode>, XeroError>;

    async fn find_contact(
        &self,
        name: &str,
        tax_id: Option<&str>,
    ) -> Result<Option<Contact>, XeroError>;
    async fn create_contact(&self, name: &str, tax_id: Option<&str>)
        -> Result<Contact, XeroError>;

    async fn get_bank_accounts(&self) -> Result<Vec<BankAccount>, XeroError>;
    async fn get_bank_account_by_id(&self, id: &str) -> Result<Option<BankAccount>, XeroError>;
    async fn get_bank_account_by_code(&self, code: &str)
        -> Result<Option<BankAccount>, XeroError>;
    async fn activate_bank_account(&self, account: &BankAccount)
        -> Result<BankAccount, XeroError>;
    async fn create_bank_account(
        &self,
        name: &str,
        code: &str,
        number: &str,
        currency: &str,
    ) -> Result<BankAccount, XeroError>;

    async fn get_transaction_id_by_url(&self, url: &str) -> Result<Option<String>, XeroError>;
    async fn create_transaction(&self, data: &TransactionData) -> Result<String, XeroError>;
    async fn update_transaction(&self, id: &str, data: &TransactionData)
        -> Result<(), XeroError>;
    async fn delete_transaction(&self, id: &str) -> Result<(), XeroError>;
    async fn get_transaction_attachments(&self, id: &str) -> Result<Vec<Attachment>, XeroError>;
    async fn upload_transaction_attachment(
        &self,
        id: &str,
        file_name: &str,
        path: &Path,
        content_type: &str,
    ) -> Result<(), XeroError>;

    async fn get_bill_id_by_url(&self, url: &str) -> Result<Option<String>, XeroError>;
    async fn get_bill_by_url(&self, url: &str) -> Result<Option<Invoice>, XeroError>;
    async fn get_bill(&self, id: &str) -> Result<Option<Invoice>, XeroError>;
    async fn create_bill(&self, data: &BillData) -> Result<String, XeroError>;
    async fn update_bill(
        &self,
        id: &str,
        data: &BillData,
        existing: &Invoice,
    ) -> Result<(), XeroError>;
    async fn delete_bill(&self, id: &str) -> Result<(), XeroError>;
    async fn pay_bill(&self, payment: &BillPaymentData) -> Result<(), XeroError>;
    async fn get_bill_attachments(&self, id: &str) -> Result<Vec<Attachment>, XeroError>;
    async fn upload_bill_attachment(
        &self,
        id: &str,
        file_name: &str,
        path: &Path,
        content_type: &str,
    ) -> Result<(), XeroError>;

    async fn ensure_currency(&self, code: &str) -> Result<(), XeroError>;
}

#[derive(Clone)]
pub struct AccountingClient {
    http: HttpClient,
}

impl AccountingClient {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    /// Request a collection and decode it, surfacing per-element validation
    /// errors the API reports alongside a successful status.
    async fn fetch<T: DeserializeOwned>(
        &self,
        options: RequestOptions,
    ) -> Result<Vec<T>, XeroError> {
        let value = self
            .http
            .request(options)
            .await
            .map_err(errors::translate)?;

        let messages = errors::validation_messages(&value);
        if !messages.is_empty() {
            let err = XeroError::ValidationFailed(messages.join("; "));
            tracing::error!(error = %err, "Xero rejected the request");
            return Err(err);
        }

        if value.is_null() {
            return Ok(Vec::new());
        }

        serde_json::from_value(value).map_err(|err| {
            let err = XeroError::from(err);
            tracing::error!(error = %err, "Failed to decode Xero response");
            err
        })
    }

    async fn fetch_first<T: DeserializeOwned>(
        &self,
        options: RequestOptions,
    ) -> Result<Option<T>, XeroError> {
        Ok(self.fetch(options).await?.into_iter().next())
    }

    /// Like `fetch_first` but a missing record is treated as absent.
    async fn fetch_by_id<T: DeserializeOwned>(
        &self,
        options: RequestOptions,
    ) -> Result<Option<T>, XeroError> {
        match self.fetch_first(options).await {
            Err(XeroError::NotFound(_)) => Ok(None),
            other => other,
        }
    }

    async fn submit_one<T: DeserializeOwned>(
        &self,
        options: RequestOptions,
        entity: EntityResponseType,
    ) -> Result<T, XeroError> {
        self.fetch_first(options.entity(entity))
            .await?
            .ok_or_else(|| {
                XeroError::UnexpectedResponse(format!("no {} in response", entity.as_str()))
            })
    }

    async fn upload_attachment(
        &self,
        entity: EntityResponseType,
        id: &str,
        file_name: &str,
        path: &Path,
        content_type: &str,
    ) -> Result<(), XeroError> {
        let data = tokio::fs::read(path).await.map_err(|e| {
            tracing::error!(path = %path.display(), error = %e, "Failed to read attachment");
            XeroError::Io(e)
        })?;

        let options = RequestOptions::put(format!(
            "{}/{}/Attachments/{}",
            entity.as_str(),
            urlencoding::encode(id),
            urlencoding::encode(file_name)
        ))
        .bytes(data, content_type)
        .entity(EntityResponseType::Attachments);

        self.fetch::<Attachment>(options).await?;
        tracing::info!(entity = entity.as_str(), id = %id, file_name = %file_name, "Attachment uploaded");
        Ok(())
    }

    async fn get_attachments(
        &self,
        entity: EntityResponseType,
        id: &str,
    ) -> Result<Vec<Attachment>, XeroError> {
        let options = RequestOptions::get(format!(
            "{}/{}/Attachments",
            entity.as_str(),
            urlencoding::encode(id)
        ))
        .entity(EntityResponseType::Attachments);

        self.fetch(options).await
    }
}

/// Wrap a single payload in its collection envelope, e.g. `{"Invoices": [..]}`.
fn envelope<P: Serialize>(entity: EntityResponseType, payload: P) -> Result<Value, XeroError> {
    let mut map = Map::new();
    map.insert(
        entity.as_str().to_string(),
        Value::Array(vec![serde_json::to_value(payload)?]),
    );
    Ok(Value::Object(map))
}

fn transaction_payload<'a>(
    id: Option<&'a str>,
    data: &'a TransactionData,
) -> BankTransactionPayload<'a> {
    BankTransactionPayload {
        bank_transaction_id: id,
        transaction_type: BankTransactionType::from_amount(data.amount),
        bank_account: AccountRef {
            account_id: &data.bank_account_id,
        },
        contact: ContactRef {
            contact_id: &data.contact_id,
        },
        reference: &data.reference,
        date: data.date,
        url: &data.url,
        line_amount_types: LineAmountType::Inclusive,
        line_items: vec![LineItem {
            description: &data.description,
            account_code: &data.account_code,
            quantity: 1.0,
            unit_amount: data.amount.abs(),
        }],
    }
}

fn bill_payload<'a>(id: Option<&'a str>, data: &'a BillData) -> InvoicePayload<'a> {
    InvoicePayload {
        invoice_id: id,
        invoice_type: InvoiceType::Accpay,
        contact: ContactRef {
            contact_id: &data.contact_id,
        },
        date: data.date,
        due_date: data.due_date,
        currency_code: &data.currency,
        url: &data.url,
        line_amount_types: LineAmountType::Inclusive,
        line_items: vec![LineItem {
            description: &data.description,
            account_code: &data.account_code,
            quantity: 1.0,
            unit_amount: data.amount,
        }],
    }
}

fn paid_bill_error(id: &str) -> XeroError {
    let err = XeroError::OperationNotAllowed(format!("Bill {} is already paid", id));
    tracing::error!(bill_id = %id, error = %err, "Refusing to modify a paid bill");
    err
}

#[async_trait]
impl XeroClient for AccountingClient {
    #[instrument(skip(self))]
    async fn get_organisation(&self) -> Result<Option<Organisation>, XeroError> {
        self.fetch_first(
            RequestOptions::get("Organisation").entity(EntityResponseType::Organisations),
        )
        .await
    }

    #[instrument(skip(self))]
    async fn get_expense_accounts(&self) -> Result<Vec<AccountCode>, XeroError> {
        let accounts: Vec<Account> = self
            .fetch(
                RequestOptions::get("Accounts")
                    .query("where", WhereClause::new().eq("Class", "EXPENSE").build())
                    .entity(EntityResponseType::Accounts),
            )
            .await?;

        Ok(accounts
            .into_iter()
            .filter(|account| account.status == AccountStatus::Active)
            .filter_map(|account| {
                account
                    .code
                    .filter(|code| !code.is_empty())
                    .map(|code| AccountCode {
                        code,
                        name: account.name,
                    })
            })
            .collect())
    }

    #[instrument(skip(self))]
    async fn find_contact(
        &self,
        name: &str,
        tax_id: Option<&str>,
    ) -> Result<Option<Contact>, XeroError> {
        let clause = WhereClause::new()
            .eq("Name", name)
            .eq_opt("TaxNumber", tax_id.filter(|id| !id.is_empty()))
            .build();

        self.fetch_first(
            RequestOptions::get("Contacts")
                .query("where", clause)
                .entity(EntityResponseType::Contacts),
        )
        .await
    }

    #[instrument(skip(self))]
    async fn create_contact(
        &self,
        name: &str,
        tax_id: Option<&str>,
    ) -> Result<Contact, XeroError> {
        let payload = ContactPayload {
            name,
            tax_number: tax_id.filter(|id| !id.is_empty()),
        };

        let contact: Contact = self
            .submit_one(
                RequestOptions::put("Contacts")
                    .json(envelope(EntityResponseType::Contacts, payload)?),
                EntityResponseType::Contacts,
            )
            .await?;

        tracing::info!(contact_id = %contact.contact_id, "Contact created");
        Ok(contact)
    }

    #[instrument(skip(self))]
    async fn get_bank_accounts(&self) -> Result<Vec<BankAccount>, XeroError> {
        self.fetch(
            RequestOptions::get("Accounts")
                .query("where", WhereClause::new().eq("Type", "BANK").build())
                .entity(EntityResponseType::Accounts),
        )
        .await
    }

    #[instrument(skip(self))]
    async fn get_bank_account_by_id(&self, id: &str) -> Result<Option<BankAccount>, XeroError> {
        let account: Option<Account> = self
            .fetch_by_id(
                RequestOptions::get(format!("Accounts/{}", urlencoding::encode(id)))
                    .entity(EntityResponseType::Accounts),
            )
            .await?;

        Ok(account.filter(|account| account.account_type.as_deref() == Some("BANK")))
    }

    #[instrument(skip(self))]
    async fn get_bank_account_by_code(
        &self,
        code: &str,
    ) -> Result<Option<BankAccount>, XeroError> {
        self.fetch_first(
            RequestOptions::get("Accounts")
                .query(
                    "where",
                    WhereClause::new().eq("Type", "BANK").eq("Code", code).build(),
                )
                .entity(EntityResponseType::Accounts),
        )
        .await
    }

    #[instrument(skip(self, account), fields(account_id = %account.account_id))]
    async fn activate_bank_account(
        &self,
        account: &BankAccount,
    ) -> Result<BankAccount, XeroError> {
        let payload = json!({
            "AccountID": account.account_id,
            "Status": "ACTIVE",
        });

        let activated: Account = self
            .submit_one(
                RequestOptions::post(format!(
                    "Accounts/{}",
                    urlencoding::encode(&account.account_id)
                ))
                .json(envelope(EntityResponseType::Accounts, payload)?),
                EntityResponseType::Accounts,
            )
            .await?;

        tracing::info!(account_id = %activated.account_id, "Bank account reactivated");
        Ok(activated)
    }

    #[instrument(skip(self))]
    async fn create_bank_account(
        &self,
        name: &str,
        code: &str,
        number: &str,
        currency: &str,
    ) -> Result<BankAccount, XeroError> {
        let payload = BankAccountPayload {
            name,
            code,
            account_type: "BANK",
            bank_account_number: number,
            currency_code: currency,
        };

        let account: Account = self
            .submit_one(
                RequestOptions::put("Accounts")
                    .json(envelope(EntityResponseType::Accounts, payload)?),
                EntityResponseType::Accounts,
            )
            .await?;

        tracing::info!(account_id = %account.account_id, code = %code, "Bank account created");
        Ok(account)
    }

    #[instrument(skip(self))]
    async fn get_transaction_id_by_url(&self, url: &str) -> Result<Option<String>, XeroError> {
        let transactions: Vec<BankTransaction> = self
            .fetch(
                RequestOptions::get("BankTransactions")
                    .query("where", WhereClause::new().eq("Url", url).build())
                    .entity(EntityResponseType::BankTransactions),
            )
            .await?;

        Ok(transactions
            .into_iter()
            .find(|transaction| !transaction.is_deleted())
            .map(|transaction| transaction.bank_transaction_id))
    }

    #[instrument(skip(self, data), fields(url = %data.url))]
    async fn create_transaction(&self, data: &TransactionData) -> Result<String, XeroError> {
        let transaction: BankTransaction = self
            .submit_one(
                RequestOptions::put("BankTransactions").json(envelope(
                    EntityResponseType::BankTransactions,
                    transaction_payload(None, data),
                )?),
                EntityResponseType::BankTransactions,
            )
            .await?;

        tracing::info!(
            transaction_id = %transaction.bank_transaction_id,
            "Bank transaction created"
        );
        Ok(transaction.bank_transaction_id)
    }

    #[instrument(skip(self, data), fields(url = %data.url))]
    async fn update_transaction(&self, id: &str, data: &TransactionData) -> Result<(), XeroError> {
        let _: BankTransaction = self
            .submit_one(
                RequestOptions::post(format!("BankTransactions/{}", urlencoding::encode(id)))
                    .json(envelope(
                        EntityResponseType::BankTransactions,
                        transaction_payload(Some(id), data),
                    )?),
                EntityResponseType::BankTransactions,
            )
            .await?;

        tracing::info!(transaction_id = %id, "Bank transaction updated");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_transaction(&self, id: &str) -> Result<(), XeroError> {
        let payload = json!({
            "BankTransactionID": id,
            "Status": "DELETED",
        });

        let _: BankTransaction = self
            .submit_one(
                RequestOptions::post(format!("BankTransactions/{}", urlencoding::encode(id)))
                    .json(envelope(EntityResponseType::BankTransactions, payload)?),
                EntityResponseType::BankTransactions,
            )
            .await?;

        tracing::info!(transaction_id = %id, "Bank transaction deleted");
        Ok(())
    }

    async fn get_transaction_attachments(&self, id: &str) -> Result<Vec<Attachment>, XeroError> {
        self.get_attachments(EntityResponseType::BankTransactions, id)
            .await
    }

    #[instrument(skip(self, path))]
    async fn upload_transaction_attachment(
        &self,
        id: &str,
        file_name: &str,
        path: &Path,
        content_type: &str,
    ) -> Result<(), XeroError> {
        self.upload_attachment(
            EntityResponseType::BankTransactions,
            id,
            file_name,
            path,
            content_type,
        )
        .await
    }

    async fn get_bill_id_by_url(&self, url: &str) -> Result<Option<String>, XeroError> {
        Ok(self
            .get_bill_by_url(url)
            .await?
            .map(|invoice| invoice.invoice_id))
    }

    #[instrument(skip(self))]
    async fn get_bill_by_url(&self, url: &str) -> Result<Option<Invoice>, XeroError> {
        let invoices: Vec<Invoice> = self
            .fetch(
                RequestOptions::get("Invoices")
                    .query(
                        "where",
                        WhereClause::new().eq("Type", "ACCPAY").eq("Url", url).build(),
                    )
                    .entity(EntityResponseType::Invoices),
            )
            .await?;

        Ok(invoices
            .into_iter()
            .find(|invoice| !invoice.status.is_removed()))
    }

    #[instrument(skip(self))]
    async fn get_bill(&self, id: &str) -> Result<Option<Invoice>, XeroError> {
        self.fetch_by_id(
            RequestOptions::get(format!("Invoices/{}", urlencoding::encode(id)))
                .entity(EntityResponseType::Invoices),
        )
        .await
    }

    #[instrument(skip(self, data), fields(url = %data.url))]
    async fn create_bill(&self, data: &BillData) -> Result<String, XeroError> {
        self.ensure_currency(&data.currency).await?;

        let invoice: Invoice = self
            .submit_one(
                RequestOptions::put("Invoices").json(envelope(
                    EntityResponseType::Invoices,
                    bill_payload(None, data),
                )?),
                EntityResponseType::Invoices,
            )
            .await?;

        tracing::info!(bill_id = %invoice.invoice_id, "Bill created");
        Ok(invoice.invoice_id)
    }

    #[instrument(skip(self, data, existing), fields(url = %data.url))]
    async fn update_bill(
        &self,
        id: &str,
        data: &BillData,
        existing: &Invoice,
    ) -> Result<(), XeroError> {
        if existing.status == InvoiceStatus::Paid {
            return Err(paid_bill_error(id));
        }

        self.ensure_currency(&data.currency).await?;

        let _: Invoice = self
            .submit_one(
                RequestOptions::post(format!("Invoices/{}", urlencoding::encode(id))).json(
                    envelope(EntityResponseType::Invoices, bill_payload(Some(id), data))?,
                ),
                EntityResponseType::Invoices,
            )
            .await?;

        tracing::info!(bill_id = %id, "Bill updated");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_bill(&self, id: &str) -> Result<(), XeroError> {
        let Some(existing) = self.get_bill(id).await? else {
            return Ok(());
        };

        let status = match existing.status {
            InvoiceStatus::Paid => return Err(paid_bill_error(id)),
            InvoiceStatus::Deleted | InvoiceStatus::Voided => return Ok(()),
            InvoiceStatus::Authorised => "VOIDED",
            _ => "DELETED",
        };

        let payload = json!({
            "InvoiceID": id,
            "Status": status,
        });

        let _: Invoice = self
            .submit_one(
                RequestOptions::post(format!("Invoices/{}", urlencoding::encode(id)))
                    .json(envelope(EntityResponseType::Invoices, payload)?),
                EntityResponseType::Invoices,
            )
            .await?;

        tracing::info!(bill_id = %id, status = %status, "Bill removed");
        Ok(())
    }

    #[instrument(skip(self, payment), fields(bill_id = %payment.bill_id))]
    async fn pay_bill(&self, payment: &BillPaymentData) -> Result<(), XeroError> {
        let bill = self.get_bill(&payment.bill_id).await?.ok_or_else(|| {
            let err = XeroError::NotFound(format!("Bill {} does not exist", payment.bill_id));
            tracing::error!(bill_id = %payment.bill_id, error = %err, "Cannot pay a missing bill");
            err
        })?;

        if bill.status == InvoiceStatus::Paid {
            return Err(paid_bill_error(&payment.bill_id));
        }

        let payload = PaymentPayload {
            invoice: InvoiceRef {
                invoice_id: &payment.bill_id,
            },
            account: AccountRef {
                account_id: &payment.bank_account_id,
            },
            date: payment.date,
            amount: payment.amount,
            currency_rate: payment.fx_rate,
        };

        let created: Payment = self
            .submit_one(
                RequestOptions::put("Payments")
                    .json(envelope(EntityResponseType::Payments, payload)?),
                EntityResponseType::Payments,
            )
            .await?;

        tracing::info!(
            payment_id = %created.payment_id,
            currency = %payment.currency,
            "Bill payment created"
        );
        Ok(())
    }

    async fn get_bill_attachments(&self, id: &str) -> Result<Vec<Attachment>, XeroError> {
        self.get_attachments(EntityResponseType::Invoices, id).await
    }

    #[instrument(skip(self, path))]
    async fn upload_bill_attachment(
        &self,
        id: &str,
        file_name: &str,
        path: &Path,
        content_type: &str,
    ) -> Result<(), XeroError> {
        self.upload_attachment(EntityResponseType::Invoices, id, file_name, path, content_type)
            .await
    }

    #[instrument(skip(self))]
    async fn ensure_currency(&self, code: &str) -> Result<(), XeroError> {
        let existing: Option<Currency> = self
            .fetch_first(
                RequestOptions::get("Currencies")
                    .query("where", WhereClause::new().eq("Code", code).build())
                    .entity(EntityResponseType::Currencies),
            )
            .await?;

        if existing.is_some() {
            return Ok(());
        }

        let _: Currency = self
            .submit_one(
                RequestOptions::put("Currencies").json(json!({ "Code": code })),
                EntityResponseType::Currencies,
            )
            .await?;

        tracing::info!(currency = %code, "Currency enabled for organisation");
        Ok(())
    }
}
