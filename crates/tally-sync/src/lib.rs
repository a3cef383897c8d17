//! # tally-sync: Recompute-on-Change for Open Documents
//!
//! This crate keeps an open document's line amounts and totals consistent
//! with its inputs while the user types, without flooding the form with
//! intermediate recalculations.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Sync Controller Architecture                     │
//! │                                                                         │
//! │   Form layer                                                            │
//! │   ──────────                                                            │
//! │   Observable<FieldChange> ──attach()──┐                                 │
//! │   apply_header(HeaderChange) ─────────┤                                 │
//! │                                       ▼                                 │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                      SyncController                              │  │
//! │  │                                                                  │  │
//! │  │  coerce value ──► mark Stale ──► Immediate: recompute now        │  │
//! │  │                                  Debounced: Debouncer (120ms)    │  │
//! │  │                                                                  │  │
//! │  │  recompute: Stale lines ──► write-back (≥ tolerance) ──► totals  │  │
//! │  └───────────────────────────────┬──────────────────────────────────┘  │
//! │                                  │                                      │
//! │                                  ▼                                      │
//! │   Observable<TotalsChanged> ──► form display                           │
//! │                                                                         │
//! │   All math lives in tally-core; this crate only decides WHEN.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`config`] - Sync configuration (mode, debounce window, tolerance)
//! - [`controller`] - `SyncController` and line state tracking
//! - [`debounce`] - Cancellable tokio timer
//! - [`error`] - Sync error types
//! - [`events`] - Inbound edits and outbound totals events
//! - [`observer`] - Minimal publish/subscribe

pub mod config;
pub mod controller;
pub mod debounce;
pub mod error;
pub mod events;
pub mod observer;

pub use config::{SyncConfig, SyncMode, DEFAULT_DEBOUNCE_MS};
pub use controller::{ControllerConfig, LineState, SyncController, SyncStats};
pub use debounce::Debouncer;
pub use error::{SyncError, SyncResult};
pub use events::{FieldChange, HeaderChange, LineField, TotalsChanged};
pub use observer::{Observable, SubscriptionId};
