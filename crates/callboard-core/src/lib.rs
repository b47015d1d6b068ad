//! callboard-core: per-user chart state synchronization for `Callboard`.
//!
//! Contains:
//! - `SeriesModel`: call duration per weekday, with its default
//! - `RemoteStore` trait: fetch/upsert one record per identity
//! - `SyncController`: phase state machine (identity → fetch → resolve → edit → save)
//! - `ConflictResolver`: adopt-or-keep decision through a pluggable `DecisionPort`
//! - `Session`: async driver running store calls and feeding results back
//! - `SessionEventHandler`: trait for notifications (UI, logs)
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ presentation │ ──► │   Session    │ ──► │ RemoteStore  │
//! │ (cli / ui)   │ ◄── │ (tasks+mpsc) │ ◄── │ (rest/mock)  │
//! └──────────────┘     └──────┬───────┘     └──────────────┘
//!                             │
//!                ┌────────────┴────────────┐
//!         ┌──────▼───────┐         ┌───────▼────────┐
//!         │SyncController│         │ConflictResolver│
//!         │ (transitions)│         │ (DecisionPort) │
//!         └──────────────┘         └────────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod identity;
pub mod resolver;
pub mod series;
pub mod session;
pub mod store;
pub mod test_utils;

pub use config::{LoggingConfig, SessionConfig};
pub use controller::{
  ControllerView, FetchOutcome, FetchRequest, PendingEdit, Phase, SaveOutcome, SaveRequest,
  SyncController, Ticket
};
pub use error::{ControllerError, StoreError};
pub use events::{LogLevel, NoopEventHandler, SessionEventHandler};
pub use identity::Identity;
pub use resolver::{ConflictResolver, DecisionPort, DeclineAll, FixedDecision};
pub use series::{SeriesModel, SeriesPoint, Weekday};
pub use session::{Session, Settled};
pub use store::{PersistedRecord, RemoteStore};
