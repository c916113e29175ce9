use secrecy::Secret;
use serde::Deserialize;
use service_core::error::CoreError;
use service_core::http::RateLimitPolicy;
use service_core::http::retry::{DEFAULT_RETRY_AFTER, MAX_ATTEMPTS, MIN_RETRY_AFTER};

pub const DEFAULT_DESCRIPTION: &str = "(no note)";
pub const DEFAULT_ACCOUNT_CODE: &str = "429";
pub const DEFAULT_CURRENCY: &str = "GBP";
pub const DEFAULT_CONTACT_NAME: &str = "Payhawk Transaction";
pub const DEFAULT_TRANSFER_CONTACT_NAME: &str = "New Deposit";
pub const DEFAULT_TRANSFER_DESCRIPTION: &str = "Bank wire received";

#[derive(Deserialize, Clone, Debug)]
pub struct Config {
    #[serde(default)]
    pub xero: XeroConfig,
    #[serde(default)]
    pub payhawk: PayhawkConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub defaults: SyncDefaults,
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct XeroConfig {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_identity_url")]
    pub identity_url: String,
    #[serde(default = "default_connections_url")]
    pub connections_url: String,
    #[serde(default)]
    pub access_token: Option<Secret<String>>,
    #[serde(default)]
    pub tenant_id: Option<String>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub retry: RetrySettings,
}

#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct RetrySettings {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_after_secs")]
    pub default_retry_after_secs: u64,
    #[serde(default = "default_min_retry_after_secs")]
    pub min_retry_after_secs: u64,
}

#[derive(Deserialize, Clone, Debug)]
pub struct PayhawkConfig {
    #[serde(default)]
    pub account_id: String,
    #[serde(default = "default_portal_url")]
    pub portal_url: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub otlp_endpoint: Option<String>,
}

/// Fallback values applied when the source record leaves a field empty.
#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct SyncDefaults {
    pub description: String,
    pub account_code: String,
    pub currency: String,
    pub contact_name: String,
    pub transfer_contact_name: String,
    pub transfer_description: String,
}

impl Default for SyncDefaults {
    fn default() -> Self {
        Self {
            description: DEFAULT_DESCRIPTION.to_string(),
            account_code: DEFAULT_ACCOUNT_CODE.to_string(),
            currency: DEFAULT_CURRENCY.to_string(),
            contact_name: DEFAULT_CONTACT_NAME.to_string(),
            transfer_contact_name: DEFAULT_TRANSFER_CONTACT_NAME.to_string(),
            transfer_description: DEFAULT_TRANSFER_DESCRIPTION.to_string(),
        }
    }
}

impl Default for XeroConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            identity_url: default_identity_url(),
            connections_url: default_connections_url(),
            access_token: None,
            tenant_id: None,
            request_timeout_secs: default_request_timeout_secs(),
            retry: RetrySettings::default(),
        }
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            default_retry_after_secs: default_retry_after_secs(),
            min_retry_after_secs: default_min_retry_after_secs(),
        }
    }
}

impl Default for PayhawkConfig {
    fn default() -> Self {
        Self {
            account_id: String::new(),
            portal_url: default_portal_url(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            otlp_endpoint: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            xero: XeroConfig::default(),
            payhawk: PayhawkConfig::default(),
            logging: LoggingConfig::default(),
            defaults: SyncDefaults::default(),
            service_name: default_service_name(),
        }
    }
}

impl Config {
    /// Load from `configuration.*` and `XERO_SYNC__*` environment variables.
    pub fn load() -> Result<Self, CoreError> {
        service_core::config::load_settings("XERO_SYNC")
    }
}

impl XeroConfig {
    pub fn rate_limit_policy(&self) -> RateLimitPolicy {
        RateLimitPolicy::from_secs(
            self.retry.max_attempts,
            self.retry.default_retry_after_secs,
            self.retry.min_retry_after_secs,
        )
    }
}

fn default_service_name() -> String {
    "xero-sync-service".to_string()
}

fn default_api_base_url() -> String {
    "https://api.xero.com/api.xro/2.0".to_string()
}

fn default_identity_url() -> String {
    "https://identity.xero.com".to_string()
}

fn default_connections_url() -> String {
    "https://api.xero.com/connections".to_string()
}

fn default_portal_url() -> String {
    "https://app.payhawk.com".to_string()
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_max_attempts() -> u32 {
    MAX_ATTEMPTS
}

fn default_retry_after_secs() -> u64 {
    DEFAULT_RETRY_AFTER.as_secs()
}

fn default_min_retry_after_secs() -> u64 {
    MIN_RETRY_AFTER.as_secs()
}

fn default_log_level() -> String {
    "info,xero_sync_service=debug".to_string()
}
