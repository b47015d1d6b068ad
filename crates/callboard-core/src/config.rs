//! Callboard configuration.

use serde::{Deserialize, Serialize};

/// Session behaviour settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
  /// Clear pending edits after a successful save.
  #[serde(default = "SessionConfig::default_clear_pending_on_save")]
  pub clear_pending_on_save: bool
}

impl SessionConfig {
  const fn default_clear_pending_on_save() -> bool {
    true
  }
}

impl Default for SessionConfig {
  fn default() -> Self {
    Self {
      clear_pending_on_save: Self::default_clear_pending_on_save()
    }
  }
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
  /// Log level / `EnvFilter` directive.
  #[serde(default = "LoggingConfig::default_level")]
  pub level: String
}

impl LoggingConfig {
  fn default_level() -> String {
    "info".to_string()
  }
}

impl Default for LoggingConfig {
  fn default() -> Self {
    Self {
      level: Self::default_level()
    }
  }
}
