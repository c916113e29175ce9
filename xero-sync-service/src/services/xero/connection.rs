//! OAuth token refresh and tenant discovery.
//!
//! Built on the same transport as [`AccountingClient`](super::AccountingClient)
//! so both share one request lock.

use super::models::{Tenant, TokenSet};
use crate::config::XeroConfig;
use crate::error::XeroError;
use crate::services::http::{Authorization, HttpClient, RequestOptions};
use secrecy::{ExposeSecret, Secret};
use service_core::http::RequestLock;
use tracing::instrument;

#[derive(Clone)]
pub struct ConnectionClient {
    http: HttpClient,
    token_url: String,
    connections_url: String,
}

impl ConnectionClient {
    pub fn new(
        http: HttpClient,
        identity_url: impl AsRef<str>,
        connections_url: impl Into<String>,
    ) -> Self {
        Self {
            http,
            token_url: format!("{}/connect/token", identity_url.as_ref().trim_end_matches('/')),
            connections_url: connections_url.into(),
        }
    }

    pub fn from_config(config: &XeroConfig, lock: RequestLock) -> Result<Self, XeroError> {
        let http = HttpClient::from_config(config, lock)?;
        Ok(Self::new(
            http,
            &config.identity_url,
            config.connections_url.clone(),
        ))
    }

    /// Exchange a refresh token for a new token set.
    #[instrument(skip_all)]
    pub async fn refresh_access_token(
        &self,
        client_id: &str,
        client_secret: &Secret<String>,
        refresh_token: &Secret<String>,
    ) -> Result<TokenSet, XeroError> {
        let options = RequestOptions::post(self.token_url.clone())
            .authorization(Authorization::Basic {
                user: client_id.to_string(),
                secret: client_secret.clone(),
            })
            .form(vec![
                ("grant_type".to_string(), "refresh_token".to_string()),
                (
                    "refresh_token".to_string(),
                    refresh_token.expose_secret().clone(),
                ),
            ]);

        let tokens: TokenSet = self.http.request_as(options).await?;
        tracing::info!("Access token refreshed");
        Ok(tokens)
    }

    /// Organisations the access token has been granted to.
    #[instrument(skip_all)]
    pub async fn get_authorized_tenants(
        &self,
        access_token: &Secret<String>,
    ) -> Result<Vec<Tenant>, XeroError> {
        let options = RequestOptions::get(self.connections_url.clone())
            .authorization(Authorization::Bearer(access_token.clone()));

        let tenants: Vec<Tenant> = self.http.request_as(options).await?;
        tracing::info!(count = tenants.len(), "Authorized tenants fetched");
        Ok(tenants)
    }
}
