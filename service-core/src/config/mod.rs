use crate::error::CoreError;
use config::{Config as Cfg, Environment, File};
use serde::de::DeserializeOwned;

/// Load settings from an optional `configuration` file overlaid with
/// `{prefix}__`-separated environment variables.
///
/// `XERO__API__TENANT_ID=abc` ends up in `api.tenant_id` for prefix `XERO`.
pub fn load_settings<T: DeserializeOwned>(prefix: &str) -> Result<T, CoreError> {
    dotenvy::dotenv().ok();

    let config = Cfg::builder()
        .add_source(File::with_name("configuration").required(false))
        .add_source(Environment::with_prefix(prefix).separator("__"))
        .build()?;

    Ok(config.try_deserialize()?)
}
