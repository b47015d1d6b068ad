//! Chart-state synchronization controller.
//!
//! Pure state machine: every operation is a synchronous transition. The two
//! side effects (fetch and upsert) are handed back to the caller as
//! [`FetchRequest`] / [`SaveRequest`]; their results come back through
//! [`SyncController::on_fetch_result`] and [`SyncController::on_save_result`].
//!
//! ```text
//! AwaitingIdentity ──submit──► Fetching ──found──► ConflictPending ──resolve──┐
//!        ▲                        │                                            ▼
//!        └──────reset──────    not found / failed ───────────────────────► Ready ◄─┐
//!                                                                             │   │
//!                                                                          commit  │
//!                                                                             ▼   │
//!                                                                          Saving ─┘
//! ```

use std::{collections::BTreeMap, fmt};

use tracing::{debug, warn};

use crate::{
  config::SessionConfig,
  error::{ControllerError, StoreError},
  identity::Identity,
  series::{SeriesModel, Weekday, parse_duration}
};

/// Controller phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
  /// No identity yet.
  AwaitingIdentity,
  /// Fetch outstanding.
  Fetching,
  /// A stored record was found; waiting for adopt/decline.
  ConflictPending,
  /// Interactive: edits and commits allowed.
  Ready,
  /// Upsert outstanding.
  Saving
}

impl Phase {
  /// A store call is outstanding.
  #[must_use]
  pub const fn is_busy(self) -> bool {
    matches!(self, Self::Fetching | Self::Saving)
  }
}

impl fmt::Display for Phase {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::AwaitingIdentity => "awaiting identity",
      Self::Fetching => "fetching",
      Self::ConflictPending => "conflict pending",
      Self::Ready => "ready",
      Self::Saving => "saving"
    })
  }
}

/// Sequence number of a store request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ticket(u64);

impl fmt::Display for Ticket {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "#{}", self.0)
  }
}

/// Fetch the caller must issue.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
  /// Request ticket.
  pub ticket: Ticket,
  /// Identity to look up.
  pub identity: Identity
}

/// Upsert the caller must issue.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveRequest {
  /// Request ticket.
  pub ticket: Ticket,
  /// Record key.
  pub identity: Identity,
  /// Merged series to persist.
  pub series: SeriesModel
}

/// What a fetch result did to the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
  /// Record found; waiting for [`SyncController::resolve_conflict`].
  RecordFound(SeriesModel),
  /// No record; default series kept.
  NotFound,
  /// Fetch failed; default series kept, error recorded.
  Failed(StoreError),
  /// Result did not belong to the in-flight request and was dropped.
  Stale
}

/// What a save result did to the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
  /// Persisted.
  Saved(SeriesModel),
  /// Not persisted; the in-memory series keeps the edit.
  Failed(StoreError),
  /// Result did not belong to the in-flight request and was dropped.
  Stale
}

/// Raw user input per label, not yet merged.
pub type PendingEdit = BTreeMap<Weekday, String>;

/// Read-only projection for the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerView {
  /// Current phase.
  pub phase: Phase,
  /// Current identity.
  pub identity: Option<Identity>,
  /// Current series.
  pub series: SeriesModel,
  /// Unmerged edits.
  pub pending: PendingEdit,
  /// Last surfaced error message.
  pub last_error: Option<String>
}

/// In-flight request.
#[derive(Debug, Clone)]
struct InFlight {
  ticket: Ticket,
  identity: Identity
}

/// Per-identity chart-state synchronization controller.
///
/// Owns the series, pending edits and phase. Not shared between sessions.
#[derive(Debug)]
pub struct SyncController {
  config: SessionConfig,
  phase: Phase,
  identity: Option<Identity>,
  series: SeriesModel,
  pending: PendingEdit,
  remote: Option<SeriesModel>,
  last_error: Option<String>,
  in_flight: Option<InFlight>,
  next_ticket: u64
}

impl Default for SyncController {
  fn default() -> Self {
    Self::new(SessionConfig::default())
  }
}

impl SyncController {
  /// New controller in `AwaitingIdentity` with the default series.
  #[must_use]
  pub fn new(config: SessionConfig) -> Self {
    Self {
      config,
      phase: Phase::AwaitingIdentity,
      identity: None,
      series: SeriesModel::default(),
      pending: PendingEdit::new(),
      remote: None,
      last_error: None,
      in_flight: None,
      next_ticket: 0
    }
  }

  /// Current phase.
  #[must_use]
  pub const fn phase(&self) -> Phase {
    self.phase
  }

  /// Current series.
  #[must_use]
  pub const fn series(&self) -> &SeriesModel {
    &self.series
  }

  /// Current identity.
  #[must_use]
  pub const fn identity(&self) -> Option<&Identity> {
    self.identity.as_ref()
  }

  /// Unmerged edits.
  #[must_use]
  pub const fn pending(&self) -> &PendingEdit {
    &self.pending
  }

  /// Record held while `ConflictPending`.
  #[must_use]
  pub const fn remote(&self) -> Option<&SeriesModel> {
    self.remote.as_ref()
  }

  /// Last surfaced error message.
  #[must_use]
  pub fn last_error(&self) -> Option<&str> {
    self.last_error.as_deref()
  }

  /// Ticket of the outstanding request, if any.
  #[must_use]
  pub fn in_flight(&self) -> Option<Ticket> {
    self.in_flight.as_ref().map(|f| f.ticket)
  }

  /// Snapshot for rendering.
  #[must_use]
  pub fn view(&self) -> ControllerView {
    ControllerView {
      phase: self.phase,
      identity: self.identity.clone(),
      series: self.series,
      pending: self.pending.clone(),
      last_error: self.last_error.clone()
    }
  }

  /// Set identity and start fetching its record.
  ///
  /// Resets the series to default and clears pending edits.
  ///
  /// # Errors
  ///
  /// - [`ControllerError::Validation`] for a bad identity (also recorded as
  ///   the last error; nothing else changes).
  /// - [`ControllerError::Busy`] while `Fetching`/`Saving`.
  /// - [`ControllerError::InvalidPhase`] while `ConflictPending`.
  pub fn submit_identity(&mut self, raw: &str) -> Result<FetchRequest, ControllerError> {
    if self.phase.is_busy() {
      return Err(ControllerError::Busy { phase: self.phase });
    }
    self.require(&[Phase::AwaitingIdentity, Phase::Ready], "submit_identity")?;

    let identity = match Identity::parse(raw) {
      Ok(identity) => identity,
      Err(e) => {
        self.last_error = Some(e.to_string());
        return Err(e);
      }
    };

    self.identity = Some(identity.clone());
    self.series = SeriesModel::default();
    self.pending.clear();
    self.remote = None;
    self.last_error = None;

    let ticket = self.issue(&identity);
    self.transition(Phase::Fetching);

    Ok(FetchRequest { ticket, identity })
  }

  /// Apply the result of a fetch.
  pub fn on_fetch_result(
    &mut self,
    ticket: Ticket,
    identity: &Identity,
    result: Result<Option<SeriesModel>, StoreError>
  ) -> FetchOutcome {
    if self.phase != Phase::Fetching || !self.accept(ticket, identity) {
      warn!(%ticket, %identity, phase = %self.phase, "dropping stale fetch result");
      return FetchOutcome::Stale;
    }
    self.in_flight = None;

    match result {
      Ok(Some(remote)) => {
        self.remote = Some(remote);
        self.transition(Phase::ConflictPending);
        FetchOutcome::RecordFound(remote)
      }
      Ok(None) | Err(StoreError::NotFound) => {
        self.transition(Phase::Ready);
        FetchOutcome::NotFound
      }
      Err(e) => {
        warn!(%identity, error = %e, "fetch failed, continuing with default series");
        self.last_error = Some(format!("could not load saved data: {e}"));
        self.transition(Phase::Ready);
        FetchOutcome::Failed(e)
      }
    }
  }

  /// Adopt the fetched record (`true`) or keep the current series (`false`).
  ///
  /// # Errors
  ///
  /// [`ControllerError::InvalidPhase`] outside `ConflictPending`.
  pub fn resolve_conflict(&mut self, adopt: bool) -> Result<(), ControllerError> {
    self.require(&[Phase::ConflictPending], "resolve_conflict")?;

    let remote = self.remote.take();
    if adopt {
      if let Some(remote) = remote {
        self.series = remote;
      }
    }
    debug!(adopt, "conflict resolved");
    self.transition(Phase::Ready);
    Ok(())
  }

  /// Record raw input for `label`. No numeric validation here.
  ///
  /// # Errors
  ///
  /// [`ControllerError::InvalidPhase`] outside `Ready`;
  /// [`ControllerError::UnknownLabel`] for a label outside `Mon`..`Fri`.
  pub fn edit_field(&mut self, label: &str, raw: &str) -> Result<(), ControllerError> {
    self.require(&[Phase::Ready], "edit_field")?;

    let day: Weekday = label
      .parse()
      .map_err(|_| ControllerError::UnknownLabel(label.to_string()))?;
    self.pending.insert(day, raw.to_string());
    Ok(())
  }

  /// Merge pending edits into the series and start saving it.
  ///
  /// Entries that do not parse as finite non-negative numbers are ignored.
  ///
  /// # Errors
  ///
  /// [`ControllerError::InvalidPhase`] outside `Ready`.
  pub fn commit(&mut self) -> Result<SaveRequest, ControllerError> {
    self.require(&[Phase::Ready], "commit")?;
    let Some(identity) = self.identity.clone() else {
      return Err(ControllerError::InvalidPhase {
        operation: "commit",
        phase: self.phase
      });
    };

    let mut merged = self.series;
    for (day, raw) in &self.pending {
      let Some(value) = parse_duration(raw) else {
        debug!(%day, raw = %raw, "ignoring unparsable edit");
        continue;
      };
      if let Ok(next) = merged.with(*day, value) {
        merged = next;
      }
    }

    self.series = merged;
    let ticket = self.issue(&identity);
    self.transition(Phase::Saving);

    Ok(SaveRequest {
      ticket,
      identity,
      series: merged
    })
  }

  /// Apply the result of an upsert.
  pub fn on_save_result(
    &mut self,
    ticket: Ticket,
    identity: &Identity,
    result: Result<(), StoreError>
  ) -> SaveOutcome {
    if self.phase != Phase::Saving || !self.accept(ticket, identity) {
      warn!(%ticket, %identity, phase = %self.phase, "dropping stale save result");
      return SaveOutcome::Stale;
    }
    self.in_flight = None;
    self.transition(Phase::Ready);

    match result {
      Ok(()) => {
        self.last_error = None;
        if self.config.clear_pending_on_save {
          self.pending.clear();
        }
        SaveOutcome::Saved(self.series)
      }
      Err(e) => {
        warn!(%identity, error = %e, "save failed, keeping local edits");
        self.last_error = Some(format!("could not save: {e}"));
        SaveOutcome::Failed(e)
      }
    }
  }

  /// Back to `AwaitingIdentity` with cleared state.
  ///
  /// Any outstanding request becomes stale.
  pub fn reset(&mut self) {
    self.identity = None;
    self.series = SeriesModel::default();
    self.pending.clear();
    self.remote = None;
    self.last_error = None;
    self.in_flight = None;
    self.transition(Phase::AwaitingIdentity);
  }

  fn require(&self, allowed: &[Phase], operation: &'static str) -> Result<(), ControllerError> {
    if allowed.contains(&self.phase) {
      Ok(())
    } else {
      Err(ControllerError::InvalidPhase {
        operation,
        phase: self.phase
      })
    }
  }

  fn issue(&mut self, identity: &Identity) -> Ticket {
    self.next_ticket += 1;
    let ticket = Ticket(self.next_ticket);
    self.in_flight = Some(InFlight {
      ticket,
      identity: identity.clone()
    });
    ticket
  }

  fn accept(&self, ticket: Ticket, identity: &Identity) -> bool {
    self
      .in_flight
      .as_ref()
      .is_some_and(|f| f.ticket == ticket && f.identity == *identity)
  }

  fn transition(&mut self, to: Phase) {
    if self.phase != to {
      debug!(from = %self.phase, %to, "phase transition");
    }
    self.phase = to;
  }
}
