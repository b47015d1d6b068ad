//! `RemoteStore` trait: the persistence contract consumed by the session.
//!
//! One record per identity; the store decides HOW it is kept, the session
//! only reads it whole and replaces it whole.

use crate::{error::StoreError, identity::Identity, series::SeriesModel};

/// Remote key-value store for per-identity series records.
///
/// Stateless gateway: implementations hold connection settings only.
pub trait RemoteStore: Send + Sync + 'static {
  /// Exact-match lookup by identity.
  ///
  /// `Ok(None)` or `Err(StoreError::NotFound)` when no record exists; any
  /// other error is a transport/backend failure.
  fn fetch(
    &self,
    identity: &Identity
  ) -> impl Future<Output = Result<Option<SeriesModel>, StoreError>> + Send;

  /// Insert or replace the whole record for `identity`.
  ///
  /// Idempotent for identical input. Last writer wins.
  fn upsert(
    &self,
    identity: &Identity,
    series: &SeriesModel
  ) -> impl Future<Output = Result<(), StoreError>> + Send;

  /// Store name for logs.
  fn name(&self) -> &'static str;
}

/// Persisted record: identity plus its series.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedRecord {
  /// Record key.
  pub identity: Identity,
  /// Stored series (`chart_data`).
  pub series: SeriesModel
}
