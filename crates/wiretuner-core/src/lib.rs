//! Event-sourced core for a vector graphics editor.
//!
//! # Overview
//!
//! Every mutation to a [`document::Document`] is represented as a committed
//! [`event::Envelope`] appended to a per-document [`store::FileEventStore`].
//! The current document is never stored directly -- it is always a
//! reduction of the event log, optionally accelerated by a
//! [`snapshot::SnapshotStore`] checkpoint.
//!
//! # Pipeline
//!
//! ```text
//! tool layer -> DraftEvent -> SamplingRecorder -> FileEventStore
//!                                                       |
//!                              SnapshotStore <- replay_to_sequence
//! ```
//!
//! - **Record**: [`recorder::SamplingRecorder`] coalesces high-frequency
//!   continuous events (drag, rotate, scale) into sampled committed events.
//! - **Apply**: [`applier::apply`] is the single pure function mapping
//!   `(state, event) -> state`, enforcing every document invariant.
//! - **Replay**: [`replay::replay_to_sequence`] reconstructs state at any
//!   sequence from the nearest usable snapshot plus the event tail.
//! - **Group**: [`grouping::GroupTracker`] folds the flat event stream into
//!   undo/redo-sized operation groups.
//! - **Navigate**: [`undo::UndoNavigator`] moves a sequence cursor across
//!   those groups, backed by an LRU cache of replayed document states.
//! - **Hit-test**: [`hittest::HitTestIndex`] answers point/rect queries
//!   against the current scene without a full linear scan.
//! - **Transform**: [`ot::transform`] resolves concurrent edits for
//!   collaborative sessions.
//!
//! [`engine::Engine`] is the single entry point a tool layer opens a
//! document through -- it owns the event store, snapshot store, recorder,
//! group tracker, and undo navigator for one open document, so callers
//! never wire those up individually.
//!
//! # Invariants
//!
//! - Canonical JSON only: declaration-order struct fields, `BTreeMap`/
//!   `BTreeSet` everywhere a map or set appears, never `HashMap`/`HashSet`.
//! - A committed [`event::Envelope`] can only be constructed by
//!   [`event::Envelope::commit`], called exclusively by the event store.
//! - Replay never panics on a malformed document tree; every failure mode
//!   surfaces as an [`error::EngineError`].

pub mod applier;
pub mod config;
pub mod document;
pub mod engine;
pub mod error;
pub mod event;
pub mod grouping;
pub mod hittest;
pub mod ids;
pub mod ot;
pub mod orchestrator;
pub mod recorder;
pub mod replay;
pub mod session;
pub mod snapshot;
pub mod store;
pub mod undo;

pub use config::EngineConfig;
pub use document::Document;
pub use engine::Engine;
pub use error::{EngineError, Result};
pub use event::{DraftEvent, Envelope, EventPayload};
pub use ids::{ArtboardId, DocumentId, EventId, GroupId, LayerId, ObjectId};
