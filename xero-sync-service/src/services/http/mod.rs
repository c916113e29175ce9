//! HTTP transport shared by the Xero accounting and connection clients.
//!
//! Every logical request takes the shared [`RequestLock`] for its first
//! attempt only. A `429` answer is absorbed by an explicit bounded retry
//! loop that sleeps outside the lock; every other failure is logged and
//! mapped onto [`XeroError`].

use crate::config::XeroConfig;
use crate::error::XeroError;
use reqwest::header::{CONTENT_TYPE, RETRY_AFTER};
use reqwest::{Client, Method, StatusCode};
use secrecy::{ExposeSecret, Secret};
use serde::de::DeserializeOwned;
use serde_json::Value;
use service_core::http::{RateLimitPolicy, RequestLock};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, warn};

pub const XERO_TENANT_ID_HEADER: &str = "xero-tenant-id";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Top-level collections of the Xero response envelope.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntityResponseType {
    Accounts,
    Attachments,
    BankTransactions,
    Contacts,
    Currencies,
    Invoices,
    Organisations,
    Payments,
}

impl EntityResponseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityResponseType::Accounts => "Accounts",
            EntityResponseType::Attachments => "Attachments",
            EntityResponseType::BankTransactions => "BankTransactions",
            EntityResponseType::Contacts => "Contacts",
            EntityResponseType::Currencies => "Currencies",
            EntityResponseType::Invoices => "Invoices",
            EntityResponseType::Organisations => "Organisations",
            EntityResponseType::Payments => "Payments",
        }
    }
}

/// What part of the response a caller wants back.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResponseShape {
    /// The whole decoded body.
    Body,
    /// A single collection of the response envelope.
    Entity(EntityResponseType),
}

#[derive(Clone, Debug)]
pub enum RequestBody {
    Json(Value),
    Form(Vec<(String, String)>),
    Bytes(Vec<u8>),
}

/// Per-request credentials overriding the client default bearer token.
#[derive(Clone, Debug)]
pub enum Authorization {
    Bearer(Secret<String>),
    Basic {
        user: String,
        secret: Secret<String>,
    },
}

#[derive(Clone, Debug)]
pub struct RequestOptions {
    pub method: Method,
    /// Path relative to the client base URL, or an absolute URL.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<RequestBody>,
    pub content_type: Option<String>,
    pub authorization: Option<Authorization>,
    pub response: ResponseShape,
}

impl RequestOptions {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            content_type: None,
            authorization: None,
            response: ResponseShape::Body,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(RequestBody::Json(body));
        self
    }

    pub fn form(mut self, pairs: Vec<(String, String)>) -> Self {
        self.body = Some(RequestBody::Form(pairs));
        self
    }

    pub fn bytes(mut self, data: Vec<u8>, content_type: impl Into<String>) -> Self {
        self.body = Some(RequestBody::Bytes(data));
        self.content_type = Some(content_type.into());
        self
    }

    pub fn authorization(mut self, authorization: Authorization) -> Self {
        self.authorization = Some(authorization);
        self
    }

    pub fn entity(mut self, entity: EntityResponseType) -> Self {
        self.response = ResponseShape::Entity(entity);
        self
    }
}

#[derive(Debug, PartialEq, Eq)]
enum ResolvedAuth<'a> {
    Basic { user: &'a str, secret: &'a str },
    Bearer(&'a str),
    None,
}

/// Status, `Retry-After` value and raw body of one attempt.
type AttemptOutcome = (StatusCode, Option<String>, Vec<u8>);

#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    access_token: Option<Secret<String>>,
    tenant_id: Option<String>,
    lock: RequestLock,
    policy: RateLimitPolicy,
}

impl HttpClient {
    /// Create a client with the default rate-limit policy and timeout.
    pub fn new(
        base_url: impl Into<String>,
        access_token: Option<Secret<String>>,
        tenant_id: Option<String>,
        lock: RequestLock,
    ) -> Result<Self, XeroError> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| XeroError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            access_token,
            tenant_id: tenant_id.filter(|id| !id.is_empty()),
            lock,
            policy: RateLimitPolicy::default(),
        })
    }

    /// Create a client for the accounting API from configuration.
    pub fn from_config(config: &XeroConfig, lock: RequestLock) -> Result<Self, XeroError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| XeroError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.api_base_url.clone(),
            access_token: config.access_token.clone(),
            tenant_id: config.tenant_id.clone().filter(|id| !id.is_empty()),
            lock,
            policy: config.rate_limit_policy(),
        })
    }

    pub fn with_rate_limit_policy(mut self, policy: RateLimitPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn tenant_id(&self) -> Option<&str> {
        self.tenant_id.as_deref()
    }

    /// Execute a request and return the decoded body, or the requested
    /// envelope collection (`Value::Null` when the envelope lacks it).
    pub async fn request(&self, options: RequestOptions) -> Result<Value, XeroError> {
        info!(method = %options.method, path = %options.path, "Making a request");

        let body = self.execute(&options).await?;
        let value = decode_body(&body, options.response)?;

        info!(method = %options.method, path = %options.path, "Request completed");

        Ok(match options.response {
            ResponseShape::Body => value,
            ResponseShape::Entity(entity) => {
                value.get(entity.as_str()).cloned().unwrap_or(Value::Null)
            }
        })
    }

    /// Execute a request and deserialize the selected part of the response.
    pub async fn request_as<T: DeserializeOwned>(
        &self,
        options: RequestOptions,
    ) -> Result<T, XeroError> {
        let value = self.request(options).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn execute(&self, options: &RequestOptions) -> Result<Vec<u8>, XeroError> {
        let mut attempts: u32 = 0;

        loop {
            let guard = if attempts == 0 {
                Some(self.lock.acquire().await)
            } else {
                None
            };
            let outcome = self.send_once(options).await;
            drop(guard);
            attempts += 1;

            let (status, retry_after, body) = match outcome {
                Ok(parts) => parts,
                Err(e) => {
                    error!(
                        method = %options.method,
                        path = %options.path,
                        error = %e,
                        "Request failed without a response"
                    );
                    return Err(XeroError::Transport(e.to_string()));
                }
            };

            if status.is_success() {
                if attempts > 1 {
                    info!(
                        method = %options.method,
                        path = %options.path,
                        attempts,
                        "Request succeeded after rate limit retry"
                    );
                }
                return Ok(body);
            }

            if status == StatusCode::TOO_MANY_REQUESTS {
                if !self.policy.allows_another_attempt(attempts) {
                    error!(
                        method = %options.method,
                        path = %options.path,
                        attempts,
                        "Rate limit exceeded, retries exhausted"
                    );
                    return Err(XeroError::RateLimitExhausted { attempts });
                }

                let delay = self.policy.retry_delay(retry_after.as_deref());
                warn!(
                    method = %options.method,
                    path = %options.path,
                    attempt = attempts,
                    retry_after_secs = delay.as_secs_f64(),
                    "Rate limit exceeded, retrying after backoff"
                );
                sleep(delay).await;
                continue;
            }

            let err = status_error(status, &body);
            error!(
                method = %options.method,
                path = %options.path,
                status = status.as_u16(),
                error = %err,
                "Request failed"
            );
            return Err(err);
        }
    }

    async fn send_once(&self, options: &RequestOptions) -> Result<AttemptOutcome, reqwest::Error> {
        let mut request = self
            .client
            .request(options.method.clone(), self.url_for(&options.path));

        if !options.query.is_empty() {
            request = request.query(&options.query);
        }

        if let Some(tenant_id) = self.tenant_id.as_deref() {
            request = request.header(XERO_TENANT_ID_HEADER, tenant_id);
        }

        if let Some(content_type) = options.content_type.as_deref() {
            request = request.header(CONTENT_TYPE, content_type);
        }

        request = match self.resolve_authorization(options.authorization.as_ref()) {
            ResolvedAuth::Basic { user, secret } => request.basic_auth(user, Some(secret)),
            ResolvedAuth::Bearer(token) => request.bearer_auth(token),
            ResolvedAuth::None => request,
        };

        request = match &options.body {
            Some(RequestBody::Json(value)) => request.json(value),
            Some(RequestBody::Form(pairs)) => request.form(pairs),
            Some(RequestBody::Bytes(data)) => request.body(data.clone()),
            None => request,
        };

        let response = request.send().await?;
        let status = response.status();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await?.to_vec();

        Ok((status, retry_after, body))
    }

    /// Basic credentials > per-request bearer > client default bearer > none.
    fn resolve_authorization<'a>(
        &'a self,
        authorization: Option<&'a Authorization>,
    ) -> ResolvedAuth<'a> {
        match authorization {
            Some(Authorization::Basic { user, secret })
                if !user.is_empty() && !secret.expose_secret().is_empty() =>
            {
                return ResolvedAuth::Basic {
                    user,
                    secret: secret.expose_secret(),
                };
            }
            Some(Authorization::Bearer(token)) if !token.expose_secret().is_empty() => {
                return ResolvedAuth::Bearer(token.expose_secret());
            }
            _ => {}
        }

        match self.access_token.as_ref() {
            Some(token) if !token.expose_secret().is_empty() => {
                ResolvedAuth::Bearer(token.expose_secret())
            }
            _ => ResolvedAuth::None,
        }
    }

    fn url_for(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }

        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

fn decode_body(body: &[u8], shape: ResponseShape) -> Result<Value, XeroError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }

    match serde_json::from_slice(body) {
        Ok(value) => Ok(value),
        Err(_) if shape == ResponseShape::Body => {
            Ok(Value::String(String::from_utf8_lossy(body).into_owned()))
        }
        Err(e) => Err(XeroError::UnexpectedResponse(format!(
            "response body is not JSON: {}",
            e
        ))),
    }
}

fn status_error(status: StatusCode, body: &[u8]) -> XeroError {
    let body = String::from_utf8_lossy(body).into_owned();
    let message = error_message(&body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("Request failed")
            .to_string()
    });

    match status {
        StatusCode::UNAUTHORIZED => XeroError::Unauthorized(message),
        StatusCode::FORBIDDEN => XeroError::Forbidden(message),
        StatusCode::NOT_FOUND => XeroError::NotFound(message),
        _ => XeroError::Http {
            status: status.as_u16(),
            message,
            body,
        },
    }
}

fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    ["Message", "message", "Detail", "detail", "title", "error"]
        .iter()
        .find_map(|key| value.get(*key).and_then(Value::as_str))
        .map(str::to_string)
}
