//! Session notifications for the presentation layer (CLI, logs, UI).

use crate::{controller::Phase, identity::Identity, series::SeriesModel};

/// Log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
  /// Debug information.
  Debug,
  /// Informational message.
  Info,
  /// Warning.
  Warn,
  /// Error.
  Error
}

/// Receiver of session notifications.
///
/// All methods default to no-ops, so implementors override only what they
/// render.
#[allow(unused_variables)]
pub trait SessionEventHandler: Send + Sync + 'static {
  /// Phase changed.
  fn on_phase_changed(&self, from: Phase, to: Phase) {}

  /// A stored record was found for `identity`.
  fn on_record_loaded(&self, identity: &Identity, remote: &SeriesModel) {}

  /// Series persisted.
  fn on_saved(&self, identity: &Identity, series: &SeriesModel) {}

  /// Persisting failed; local edits are kept.
  fn on_save_failed(&self, identity: &Identity, message: &str) {}

  /// Non-fatal error notice.
  fn on_error(&self, message: &str) {}

  /// Log message.
  fn on_log(&self, level: LogLevel, message: &str) {}
}

/// Event handler that ignores everything (tests, headless use).
pub struct NoopEventHandler;

impl SessionEventHandler for NoopEventHandler {}
