//! Error types for the controller and the store contract.

use crate::controller::Phase;

/// Rejected controller operation.
///
/// None of these change controller state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ControllerError {
  /// Identity is empty or not an email address.
  #[error("invalid identity: {0}")]
  Validation(String),
  /// Operation is not allowed in the current phase.
  #[error("{operation} is not allowed while {phase}")]
  InvalidPhase {
    /// Rejected operation.
    operation: &'static str,
    /// Phase at the time of the call.
    phase: Phase
  },
  /// A store call is outstanding.
  #[error("busy: {phase}")]
  Busy {
    /// `Fetching` or `Saving`.
    phase: Phase
  },
  /// Edit for a label outside `Mon`..`Fri`.
  #[error("unknown label: {0:?}")]
  UnknownLabel(String)
}

/// Remote store failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
  /// No record exists for the identity. Not a failure for fetch callers.
  #[error("no record for this identity")]
  NotFound,
  /// Credentials rejected.
  #[error("unauthorized (HTTP {0})")]
  Unauthorized(u16),
  /// Non-success HTTP status.
  #[error("HTTP {status}: {body}")]
  Http {
    /// Status code.
    status: u16,
    /// Response body (possibly truncated).
    body: String
  },
  /// Network failure, timeout, connection refused.
  #[error("transport error: {0}")]
  Transport(String),
  /// Stored record or response body could not be decoded.
  #[error("malformed record: {0}")]
  Malformed(String)
}

impl StoreError {
  /// Whether this error means "no record" rather than a failure.
  #[must_use]
  pub const fn is_not_found(&self) -> bool {
    matches!(self, Self::NotFound)
  }
}
