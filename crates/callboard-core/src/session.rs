//! Session driver.
//!
//! Runs the store calls a [`SyncController`] asks for as background tasks and
//! feeds their completions back into it. The caller keeps interacting while a
//! call is outstanding; [`Session::settle`] waits for the next completion.
//!
//! Does NOT decide anything about the data: transitions belong to the
//! controller, the adopt/keep choice to the [`ConflictResolver`].

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::{
  config::SessionConfig,
  controller::{
    ControllerView, FetchOutcome, FetchRequest, Phase, SaveOutcome, SaveRequest, SyncController,
    Ticket
  },
  error::{ControllerError, StoreError},
  events::{LogLevel, SessionEventHandler},
  identity::Identity,
  resolver::ConflictResolver,
  series::SeriesModel,
  store::RemoteStore
};

/// Result of a background store call.
#[derive(Debug)]
enum Completion {
  Fetched {
    ticket: Ticket,
    identity: Identity,
    result: Result<Option<SeriesModel>, StoreError>
  },
  Saved {
    ticket: Ticket,
    identity: Identity,
    result: Result<(), StoreError>
  }
}

/// A completion that was applied (stale ones are never reported).
#[derive(Debug, Clone, PartialEq)]
pub enum Settled {
  /// Fetch applied. With a resolver installed, a found record has already
  /// been adopted or declined.
  Fetch(FetchOutcome),
  /// Save applied.
  Save(SaveOutcome)
}

/// One user's session: controller + store + notification/decision ports.
pub struct Session<S: RemoteStore> {
  controller: SyncController,
  store: Arc<S>,
  events: Arc<dyn SessionEventHandler>,
  resolver: Option<ConflictResolver>,
  completion_tx: mpsc::Sender<Completion>,
  completion_rx: mpsc::Receiver<Completion>
}

impl<S: RemoteStore> Session<S> {
  /// Create a session. Without a resolver, a found record leaves the
  /// session in `ConflictPending` until [`Session::resolve_conflict`].
  pub fn new(store: Arc<S>, events: Arc<dyn SessionEventHandler>, config: SessionConfig) -> Self {
    let (completion_tx, completion_rx) = mpsc::channel(16);

    Self {
      controller: SyncController::new(config),
      store,
      events,
      resolver: None,
      completion_tx,
      completion_rx
    }
  }

  /// Consult `resolver` as soon as a stored record arrives.
  #[must_use]
  pub fn with_resolver(mut self, resolver: ConflictResolver) -> Self {
    self.resolver = Some(resolver);
    self
  }

  /// Snapshot for rendering.
  #[must_use]
  pub fn view(&self) -> ControllerView {
    self.controller.view()
  }

  /// Current phase.
  #[must_use]
  pub const fn phase(&self) -> Phase {
    self.controller.phase()
  }

  /// Set the identity and start loading its record.
  ///
  /// # Errors
  ///
  /// See [`SyncController::submit_identity`].
  pub fn submit_identity(&mut self, raw: &str) -> Result<(), ControllerError> {
    let request = self.observe(|c| c.submit_identity(raw));
    let request = self.report(request)?;
    self.spawn_fetch(request);
    Ok(())
  }

  /// Record raw input for a label.
  ///
  /// # Errors
  ///
  /// See [`SyncController::edit_field`].
  pub fn edit_field(&mut self, label: &str, raw: &str) -> Result<(), ControllerError> {
    let result = self.controller.edit_field(label, raw);
    self.report(result)
  }

  /// Merge edits and start saving.
  ///
  /// # Errors
  ///
  /// See [`SyncController::commit`].
  pub fn commit(&mut self) -> Result<(), ControllerError> {
    let request = self.observe(SyncController::commit);
    let request = self.report(request)?;
    self.spawn_save(request);
    Ok(())
  }

  /// Adopt or decline the held record.
  ///
  /// # Errors
  ///
  /// See [`SyncController::resolve_conflict`].
  pub fn resolve_conflict(&mut self, adopt: bool) -> Result<(), ControllerError> {
    let result = self.observe(|c| c.resolve_conflict(adopt));
    self.report(result)
  }

  /// Back to `AwaitingIdentity`; outstanding results will be dropped.
  pub fn reset(&mut self) {
    self.observe(SyncController::reset);
  }

  /// Wait until the outstanding request completes and apply it.
  ///
  /// Stale completions are discarded along the way. Returns `None` when
  /// nothing is in flight.
  pub async fn settle(&mut self) -> Option<Settled> {
    while self.controller.in_flight().is_some() {
      let completion = self.completion_rx.recv().await?;
      if let Some(settled) = self.apply(completion).await {
        return Some(settled);
      }
    }
    None
  }

  /// Apply every completion that has already arrived, without waiting.
  ///
  /// Returns the applied (non-stale) ones.
  pub async fn pump(&mut self) -> Vec<Settled> {
    let mut applied = Vec::new();
    while let Ok(completion) = self.completion_rx.try_recv() {
      if let Some(settled) = self.apply(completion).await {
        applied.push(settled);
      }
    }
    applied
  }

  fn spawn_fetch(&self, request: FetchRequest) {
    let store = Arc::clone(&self.store);
    let tx = self.completion_tx.clone();

    debug!(ticket = %request.ticket, identity = %request.identity, store = store.name(), "fetch");
    tokio::spawn(async move {
      let result = store.fetch(&request.identity).await;
      let completion = Completion::Fetched {
        ticket: request.ticket,
        identity: request.identity,
        result
      };
      if tx.send(completion).await.is_err() {
        debug!("session gone, fetch result discarded");
      }
    });
  }

  fn spawn_save(&self, request: SaveRequest) {
    let store = Arc::clone(&self.store);
    let tx = self.completion_tx.clone();

    debug!(ticket = %request.ticket, identity = %request.identity, store = store.name(), "upsert");
    tokio::spawn(async move {
      let result = store.upsert(&request.identity, &request.series).await;
      let completion = Completion::Saved {
        ticket: request.ticket,
        identity: request.identity,
        result
      };
      if tx.send(completion).await.is_err() {
        debug!("session gone, save result discarded");
      }
    });
  }

  async fn apply(&mut self, completion: Completion) -> Option<Settled> {
    match completion {
      Completion::Fetched {
        ticket,
        identity,
        result
      } => {
        let outcome = self.observe(|c| c.on_fetch_result(ticket, &identity, result));

        match &outcome {
          FetchOutcome::Stale => return None,
          FetchOutcome::RecordFound(remote) => {
            info!(%identity, "stored record found");
            self.events.on_record_loaded(&identity, remote);
            if let Some(resolver) = self.resolver.clone() {
              let adopt = Self::ask(resolver, identity.clone(), *remote).await;
              if let Err(e) = self.observe(|c| c.resolve_conflict(adopt)) {
                warn!(error = %e, "could not apply conflict decision");
              }
            }
          }
          FetchOutcome::NotFound => {
            info!(%identity, "no stored record, using default series");
          }
          FetchOutcome::Failed(e) => {
            self.events.on_error(&format!("could not load saved data: {e}"));
          }
        }
        Some(Settled::Fetch(outcome))
      }
      Completion::Saved {
        ticket,
        identity,
        result
      } => {
        let outcome = self.observe(|c| c.on_save_result(ticket, &identity, result));

        match &outcome {
          SaveOutcome::Stale => return None,
          SaveOutcome::Saved(series) => {
            info!(%identity, "series saved");
            self.events.on_saved(&identity, series);
          }
          SaveOutcome::Failed(e) => {
            self.events.on_save_failed(&identity, &e.to_string());
            self
              .events
              .on_log(LogLevel::Warn, &format!("save failed for {identity}: {e}"));
          }
        }
        Some(Settled::Save(outcome))
      }
    }
  }

  /// Run the (blocking) decision prompt off the async workers.
  async fn ask(resolver: ConflictResolver, identity: Identity, remote: SeriesModel) -> bool {
    tokio::task::spawn_blocking(move || resolver.decide(&identity, &remote))
      .await
      .unwrap_or_else(|e| {
        warn!(error = %e, "decision prompt failed, keeping current data");
        false
      })
  }

  /// Surface a rejected operation through `on_error`.
  fn report<T>(&self, result: Result<T, ControllerError>) -> Result<T, ControllerError> {
    if let Err(e) = &result {
      debug!(error = %e, "operation rejected");
      self.events.on_error(&e.to_string());
    }
    result
  }

  /// Run `f` on the controller and report a phase change.
  fn observe<T>(&mut self, f: impl FnOnce(&mut SyncController) -> T) -> T {
    let before = self.controller.phase();
    let out = f(&mut self.controller);
    let after = self.controller.phase();
    if before != after {
      self.events.on_phase_changed(before, after);
    }
    out
  }
}
