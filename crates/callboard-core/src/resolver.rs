//! Adopt-or-keep decision for a previously stored record.

use std::sync::Arc;

use tracing::{debug, info};

use crate::{identity::Identity, series::SeriesModel};

/// Synchronous yes/no prompt: "adopt remote data?".
///
/// Returns `None` when the host cannot ask (no terminal, no UI).
pub trait DecisionPort: Send + Sync + 'static {
  /// Ask whether to replace the current series with `remote`.
  fn confirm_adopt(&self, identity: &Identity, remote: &SeriesModel) -> Option<bool>;
}

/// Port that never prompts. Always resolves to "keep current data".
pub struct DeclineAll;

impl DecisionPort for DeclineAll {
  fn confirm_adopt(&self, _identity: &Identity, _remote: &SeriesModel) -> Option<bool> {
    None
  }
}

/// Port that always answers the same.
pub struct FixedDecision(pub bool);

impl DecisionPort for FixedDecision {
  fn confirm_adopt(&self, _identity: &Identity, _remote: &SeriesModel) -> Option<bool> {
    Some(self.0)
  }
}

/// Decides whether a fetched record replaces the in-memory series.
#[derive(Clone)]
pub struct ConflictResolver {
  port: Arc<dyn DecisionPort>
}

impl Default for ConflictResolver {
  fn default() -> Self {
    Self::new(Arc::new(DeclineAll))
  }
}

impl ConflictResolver {
  /// Resolver backed by `port`.
  #[must_use]
  pub fn new(port: Arc<dyn DecisionPort>) -> Self {
    Self { port }
  }

  /// `true` to adopt `remote`. A port that cannot prompt declines.
  #[must_use]
  pub fn decide(&self, identity: &Identity, remote: &SeriesModel) -> bool {
    match self.port.confirm_adopt(identity, remote) {
      Some(adopt) => {
        info!(%identity, adopt, "conflict decision");
        adopt
      }
      None => {
        debug!(%identity, "no prompt available, keeping current data");
        false
      }
    }
  }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
  use super::*;

  fn id() -> Identity {
    Identity::parse("x@y.com").expect("valid")
  }

  #[test]
  fn unavailable_prompt_declines() {
    let r = ConflictResolver::default();
    assert!(!r.decide(&id(), &SeriesModel::default()));
  }

  #[test]
  fn fixed_answers_pass_through() {
    assert!(ConflictResolver::new(Arc::new(FixedDecision(true))).decide(&id(), &SeriesModel::default()));
    assert!(!ConflictResolver::new(Arc::new(FixedDecision(false))).decide(&id(), &SeriesModel::default()));
  }
}
