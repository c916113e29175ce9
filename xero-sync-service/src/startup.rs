use crate::config::Config;
use crate::error::XeroError;
use crate::managers::{IntegrationManager, Manager};
use crate::services::http::HttpClient;
use crate::services::payhawk::PayhawkClient;
use crate::services::xero::{AccountingClient, ConnectionClient, XeroClient};
use service_core::http::RequestLock;
use std::sync::Arc;

/// Wired-up clients and managers for one ledger connection.
///
/// The accounting and connection clients share a single request lock.
pub struct SyncApplication {
    pub config: Config,
    pub connection: ConnectionClient,
    pub integration: IntegrationManager,
}

impl SyncApplication {
    pub fn build(config: Config, payhawk: Arc<dyn PayhawkClient>) -> Result<Self, XeroError> {
        let lock = RequestLock::new();

        let http = HttpClient::from_config(&config.xero, lock.clone())?;
        let accounting: Arc<dyn XeroClient> = Arc::new(AccountingClient::new(http));
        let connection = ConnectionClient::from_config(&config.xero, lock)?;

        let entities = Manager::new(accounting, config.defaults.clone());
        let integration = IntegrationManager::new(
            payhawk,
            entities,
            config.payhawk.account_id.clone(),
            config.payhawk.portal_url.clone(),
        );

        tracing::info!(
            service = %config.service_name,
            tenant_configured = config.xero.tenant_id.is_some(),
            "Sync application initialized"
        );

        Ok(Self {
            config,
            connection,
            integration,
        })
    }
}
