//! Test utilities: `MockStore`, `TestEventHandler`, `ScriptedDecisions`.

#![allow(clippy::expect_used)]

use std::{
  collections::HashMap,
  sync::{Arc, Mutex},
  time::Duration
};

use crate::{
  controller::Phase,
  error::StoreError,
  events::{LogLevel, SessionEventHandler},
  identity::Identity,
  resolver::DecisionPort,
  series::SeriesModel,
  store::{PersistedRecord, RemoteStore}
};

/// In-memory store for unit testing the controller and session.
///
/// Keeps records, records all calls, and can inject errors and delays.
pub struct MockStore {
  /// Stored records by identity.
  pub records: Arc<Mutex<HashMap<Identity, SeriesModel>>>,
  /// Recorded `fetch()` calls.
  pub fetch_calls: Arc<Mutex<Vec<Identity>>>,
  /// Recorded `upsert()` calls.
  pub upsert_calls: Arc<Mutex<Vec<PersistedRecord>>>,
  /// Error returned by `fetch()` (if set).
  pub fetch_error: Arc<Mutex<Option<StoreError>>>,
  /// Error returned by `upsert()` (if set).
  pub upsert_error: Arc<Mutex<Option<StoreError>>>,
  /// Delay before `fetch()` returns, per identity string.
  pub fetch_delays: Arc<Mutex<HashMap<String, Duration>>>,
  /// Delay before `upsert()` returns.
  pub upsert_delay: Arc<Mutex<Option<Duration>>>
}

impl Default for MockStore {
  fn default() -> Self {
    Self::new()
  }
}

impl MockStore {
  /// Empty store.
  #[must_use]
  pub fn new() -> Self {
    Self {
      records: Arc::new(Mutex::new(HashMap::new())),
      fetch_calls: Arc::new(Mutex::new(Vec::new())),
      upsert_calls: Arc::new(Mutex::new(Vec::new())),
      fetch_error: Arc::new(Mutex::new(None)),
      upsert_error: Arc::new(Mutex::new(None)),
      fetch_delays: Arc::new(Mutex::new(HashMap::new())),
      upsert_delay: Arc::new(Mutex::new(None))
    }
  }

  /// Store a record directly.
  pub fn insert_record(&self, identity: &str, series: SeriesModel) {
    let identity = Identity::parse(identity).expect("valid identity");
    self.records.lock().expect("lock").insert(identity, series);
  }

  /// Stored record for `identity`.
  pub fn record(&self, identity: &str) -> Option<SeriesModel> {
    let identity = Identity::parse(identity).expect("valid identity");
    self.records.lock().expect("lock").get(&identity).copied()
  }

  /// Set the `fetch()` error.
  pub fn set_fetch_error(&self, error: StoreError) {
    *self.fetch_error.lock().expect("lock") = Some(error);
  }

  /// Set the `upsert()` error.
  pub fn set_upsert_error(&self, error: StoreError) {
    *self.upsert_error.lock().expect("lock") = Some(error);
  }

  /// Clear the `upsert()` error.
  pub fn clear_upsert_error(&self) {
    *self.upsert_error.lock().expect("lock") = None;
  }

  /// Delay `fetch()` for one identity.
  pub fn set_fetch_delay(&self, identity: &str, delay: Duration) {
    self
      .fetch_delays
      .lock()
      .expect("lock")
      .insert(identity.to_string(), delay);
  }

  /// Delay every `upsert()`.
  pub fn set_upsert_delay(&self, delay: Duration) {
    *self.upsert_delay.lock().expect("lock") = Some(delay);
  }

  /// Number of `fetch()` calls.
  pub fn fetch_call_count(&self) -> usize {
    self.fetch_calls.lock().expect("lock").len()
  }

  /// Number of `upsert()` calls.
  pub fn upsert_call_count(&self) -> usize {
    self.upsert_calls.lock().expect("lock").len()
  }

  /// All `upsert()` calls so far.
  pub fn upserts(&self) -> Vec<PersistedRecord> {
    self.upsert_calls.lock().expect("lock").clone()
  }
}

impl RemoteStore for MockStore {
  async fn fetch(&self, identity: &Identity) -> Result<Option<SeriesModel>, StoreError> {
    self
      .fetch_calls
      .lock()
      .expect("lock")
      .push(identity.clone());

    let delay = self
      .fetch_delays
      .lock()
      .expect("lock")
      .get(identity.as_str())
      .copied();
    if let Some(d) = delay {
      tokio::time::sleep(d).await;
    }

    let maybe_err = self.fetch_error.lock().expect("lock").clone();
    if let Some(e) = maybe_err {
      return Err(e);
    }

    Ok(self.records.lock().expect("lock").get(identity).copied())
  }

  async fn upsert(&self, identity: &Identity, series: &SeriesModel) -> Result<(), StoreError> {
    self.upsert_calls.lock().expect("lock").push(PersistedRecord {
      identity: identity.clone(),
      series: *series
    });

    let delay = *self.upsert_delay.lock().expect("lock");
    if let Some(d) = delay {
      tokio::time::sleep(d).await;
    }

    let maybe_err = self.upsert_error.lock().expect("lock").clone();
    if let Some(e) = maybe_err {
      return Err(e);
    }

    self
      .records
      .lock()
      .expect("lock")
      .insert(identity.clone(), *series);
    Ok(())
  }

  fn name(&self) -> &'static str {
    "mock"
  }
}

/// Test event handler that records all calls.
pub struct TestEventHandler {
  /// Recorded `on_phase_changed(from, to)` calls.
  pub phase_calls: Arc<Mutex<Vec<(Phase, Phase)>>>,
  /// Recorded `on_record_loaded` identities.
  pub loaded_calls: Arc<Mutex<Vec<Identity>>>,
  /// Recorded `on_saved` calls.
  pub saved_calls: Arc<Mutex<Vec<(Identity, SeriesModel)>>>,
  /// Recorded `on_save_failed` calls.
  pub save_failed_calls: Arc<Mutex<Vec<(Identity, String)>>>,
  /// Recorded `on_error` messages.
  pub error_calls: Arc<Mutex<Vec<String>>>,
  /// Recorded `on_log(level, message)` calls.
  pub log_calls: Arc<Mutex<Vec<(LogLevel, String)>>>
}

impl Default for TestEventHandler {
  fn default() -> Self {
    Self::new()
  }
}

impl TestEventHandler {
  /// Create an empty handler.
  #[must_use]
  pub fn new() -> Self {
    Self {
      phase_calls: Arc::new(Mutex::new(Vec::new())),
      loaded_calls: Arc::new(Mutex::new(Vec::new())),
      saved_calls: Arc::new(Mutex::new(Vec::new())),
      save_failed_calls: Arc::new(Mutex::new(Vec::new())),
      error_calls: Arc::new(Mutex::new(Vec::new())),
      log_calls: Arc::new(Mutex::new(Vec::new()))
    }
  }

  /// Phases entered, in order.
  pub fn phases_entered(&self) -> Vec<Phase> {
    self
      .phase_calls
      .lock()
      .expect("lock")
      .iter()
      .map(|(_, to)| *to)
      .collect()
  }

  /// Number of `on_saved` calls.
  pub fn saved_count(&self) -> usize {
    self.saved_calls.lock().expect("lock").len()
  }

  /// Number of `on_save_failed` calls.
  pub fn save_failed_count(&self) -> usize {
    self.save_failed_calls.lock().expect("lock").len()
  }

  /// Number of `on_error` calls.
  pub fn error_count(&self) -> usize {
    self.error_calls.lock().expect("lock").len()
  }
}

impl SessionEventHandler for TestEventHandler {
  fn on_phase_changed(&self, from: Phase, to: Phase) {
    self.phase_calls.lock().expect("lock").push((from, to));
  }

  fn on_record_loaded(&self, identity: &Identity, _remote: &SeriesModel) {
    self
      .loaded_calls
      .lock()
      .expect("lock")
      .push(identity.clone());
  }

  fn on_saved(&self, identity: &Identity, series: &SeriesModel) {
    self
      .saved_calls
      .lock()
      .expect("lock")
      .push((identity.clone(), *series));
  }

  fn on_save_failed(&self, identity: &Identity, message: &str) {
    self
      .save_failed_calls
      .lock()
      .expect("lock")
      .push((identity.clone(), message.to_string()));
  }

  fn on_error(&self, message: &str) {
    self
      .error_calls
      .lock()
      .expect("lock")
      .push(message.to_string());
  }

  fn on_log(&self, level: LogLevel, message: &str) {
    self
      .log_calls
      .lock()
      .expect("lock")
      .push((level, message.to_string()));
  }
}

/// Decision port answering from a script and recording every prompt.
pub struct ScriptedDecisions {
  answers: Mutex<Vec<Option<bool>>>,
  /// Identities the port was asked about.
  pub asked: Arc<Mutex<Vec<Identity>>>
}

impl ScriptedDecisions {
  /// Answers are consumed in order; once exhausted, the port cannot prompt.
  #[must_use]
  pub fn new(answers: impl IntoIterator<Item = Option<bool>>) -> Self {
    let mut answers: Vec<_> = answers.into_iter().collect();
    answers.reverse();
    Self {
      answers: Mutex::new(answers),
      asked: Arc::new(Mutex::new(Vec::new()))
    }
  }

  /// Number of prompts so far.
  pub fn asked_count(&self) -> usize {
    self.asked.lock().expect("lock").len()
  }
}

impl DecisionPort for ScriptedDecisions {
  fn confirm_adopt(&self, identity: &Identity, _remote: &SeriesModel) -> Option<bool> {
    self.asked.lock().expect("lock").push(identity.clone());
    self.answers.lock().expect("lock").pop().flatten()
  }
}

/// Default timeout for async tests (10 seconds).
///
/// Prevents tests from hanging indefinitely due to deadlocks or timing issues.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Wrap an async test body with a timeout and status output.
///
/// Usage:
/// ```ignore
/// #[tokio::test]
/// async fn test_foo() {
///     with_timeout("test_foo", async {
///         // test body
///     }).await;
/// }
/// ```
#[allow(clippy::panic)]
pub async fn with_timeout<F, T>(test_name: &str, f: F) -> T
where
  F: std::future::Future<Output = T>
{
  eprintln!("[TEST] Starting: {test_name}");
  let result = tokio::time::timeout(TEST_TIMEOUT, f).await.unwrap_or_else(|_| {
    panic!("[TEST] {test_name} timed out after {TEST_TIMEOUT:?}, possible deadlock")
  });
  eprintln!("[TEST] Completed: {test_name}");
  result
}
