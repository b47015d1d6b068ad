//! `cb` configuration file (TOML).

use std::path::Path;

use anyhow::Context;
use callboard_core::{LoggingConfig, SessionConfig};
use callboard_store::RestStoreConfig;
use serde::{Deserialize, Serialize};

/// Example printed by `cb gen-config`.
pub const EXAMPLE: &str = r#"# Callboard example configuration
# Pass with: cb --config callboard.toml show --email you@example.com

[store]
base_url = "https://your-project.example.co"
api_key = "public-anon-key"
table = "user_charts"
key_column = "email"
timeout_secs = 10

[session]
clear_pending_on_save = true

[logging]
level = "info"
"#;

/// Whole file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
  /// Remote table settings.
  #[serde(default)]
  pub store: RestStoreConfig,
  /// Controller settings.
  #[serde(default)]
  pub session: SessionConfig,
  /// Log level.
  #[serde(default)]
  pub logging: LoggingConfig
}

/// Command-line values that win over the file.
#[derive(Debug, Default)]
pub struct Overrides {
  pub url: Option<String>,
  pub key: Option<String>,
  pub table: Option<String>
}

impl CliConfig {
  /// Read `path`, or start from defaults when no file is given.
  pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
    let Some(path) = path else {
      return Ok(Self::default());
    };

    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("cannot read config {}", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("invalid config {}", path.display()))
  }

  /// Apply flag values on top of the file.
  #[must_use]
  pub fn with_overrides(mut self, o: Overrides) -> Self {
    if let Some(url) = o.url {
      self.store.base_url = url;
    }
    if let Some(key) = o.key {
      self.store.api_key = key;
    }
    if let Some(table) = o.table {
      self.store.table = table;
    }
    self
  }
}
