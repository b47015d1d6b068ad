//! callboard-store: table API backed `RemoteStore` for `Callboard`.
//!
//! Implements `callboard_core::RemoteStore` over a PostgREST-style HTTP API:
//! one row per identity, series kept in the `chart_data` column.

#![warn(missing_docs)]
#![warn(clippy::pedantic)]

pub mod client;
pub mod models;

use std::{sync::Arc, time::Duration};

use callboard_core::{Identity, RemoteStore, SeriesModel, StoreError};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::client::Client;

/// Configuration of the REST store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestStoreConfig {
  /// Base URL of the table API (`https://<project>.example.co`).
  #[serde(default)]
  pub base_url: String,
  /// API key, sent both as `apikey` and as a bearer token.
  #[serde(default)]
  pub api_key: String,
  /// Table name.
  #[serde(default = "RestStoreConfig::default_table")]
  pub table: String,
  /// Column holding the identity (unique key).
  #[serde(default = "RestStoreConfig::default_key_column")]
  pub key_column: String,
  /// Per-request timeout (seconds).
  #[serde(default = "RestStoreConfig::default_timeout_secs")]
  pub timeout_secs: u64
}

impl RestStoreConfig {
  fn default_table() -> String {
    "user_charts".to_string()
  }

  fn default_key_column() -> String {
    "email".to_string()
  }

  const fn default_timeout_secs() -> u64 {
    10
  }
}

impl Default for RestStoreConfig {
  fn default() -> Self {
    Self {
      base_url: String::new(),
      api_key: String::new(),
      table: Self::default_table(),
      key_column: Self::default_key_column(),
      timeout_secs: Self::default_timeout_secs()
    }
  }
}

/// `RemoteStore` over the table API.
pub struct RestStore {
  /// Configuration.
  config: RestStoreConfig,
  /// HTTP client.
  client: Arc<Client>
}

impl RestStore {
  /// Create a REST store.
  ///
  /// # Errors
  ///
  /// Returns an error if the configuration is incomplete or the HTTP client cannot be built.
  pub fn new(config: RestStoreConfig) -> anyhow::Result<Self> {
    let client = Client::new(
      &config.base_url,
      &config.api_key,
      &config.table,
      &config.key_column,
      Duration::from_secs(config.timeout_secs.max(1))
    )?;

    info!(
      base_url = %config.base_url,
      table = %config.table,
      key_column = %config.key_column,
      "rest store ready"
    );

    Ok(Self {
      config,
      client: Arc::new(client)
    })
  }

  /// Active configuration.
  #[must_use]
  pub fn config(&self) -> &RestStoreConfig {
    &self.config
  }
}

impl RemoteStore for RestStore {
  async fn fetch(&self, identity: &Identity) -> Result<Option<SeriesModel>, StoreError> {
    let found = self.client.fetch_chart(identity).await?;
    debug!(%identity, found = found.is_some(), "fetched record");
    Ok(found)
  }

  async fn upsert(&self, identity: &Identity, series: &SeriesModel) -> Result<(), StoreError> {
    self.client.upsert_chart(identity, series).await?;
    debug!(%identity, %series, "upserted record");
    Ok(())
  }

  fn name(&self) -> &'static str {
    "rest"
  }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
  use super::*;

  #[test]
  fn config_defaults_fill_missing_fields() {
    let cfg: RestStoreConfig =
      serde_json::from_str(r#"{"base_url":"http://x","api_key":"k"}"#).expect("parse");
    assert_eq!(cfg.table, "user_charts");
    assert_eq!(cfg.key_column, "email");
    assert_eq!(cfg.timeout_secs, 10);
  }

  #[test]
  fn new_requires_base_url_and_key() {
    assert!(RestStore::new(RestStoreConfig::default()).is_err());

    let store = RestStore::new(RestStoreConfig {
      base_url: "http://localhost:1".into(),
      api_key: "k".into(),
      ..RestStoreConfig::default()
    })
    .expect("store");
    assert_eq!(store.name(), "rest");
    assert_eq!(store.config().table, "user_charts");
  }
}
