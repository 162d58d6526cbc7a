//! Single entry point a tool layer opens a document through, bundling
//! every subsystem a session needs (§9's "mixed global state" redesign
//! note: replace ad hoc access to the event store, snapshot store,
//! recorder, and navigator with explicit injection through one context).
//! Mirrors how a TUI-style `App` bundles an event log, reducer state, and
//! a view model behind one struct rather than passing each separately.

use crate::config::EngineConfig;
use crate::document::Document;
use crate::error::Result;
use crate::event::{DraftEvent, EventPayload};
use crate::grouping::GroupTracker;
use crate::hittest::{HitResult, HitTestIndex};
use crate::ids::{DocumentId, GroupId};
use crate::orchestrator::{self, LoadResult, SaveResult, WireTunerStore};
use crate::recorder::SamplingRecorder;
use crate::session::SessionLifecycle;
use crate::snapshot::SnapshotStore;
use crate::store::FileEventStore;
use crate::undo::UndoNavigator;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use wiretuner_geom::{Point, Rectangle};

/// An open document: every store and subsystem a tool layer needs,
/// wired up once at [`Engine::open`]/[`Engine::create`] instead of at
/// every call site.
pub struct Engine {
    root: PathBuf,
    config: EngineConfig,
    document_id: DocumentId,
    event_store: Arc<FileEventStore>,
    snapshot_store: SnapshotStore,
    recorder: SamplingRecorder,
    group_tracker: GroupTracker,
    observed_sequence: i64,
    navigator: UndoNavigator,
    session: SessionLifecycle,
}

impl Engine {
    /// Create a brand-new `.wiretuner` directory at `root` and open an
    /// engine over it (§4.9 first-save path).
    pub fn create(
        root: impl Into<PathBuf>,
        title: impl Into<String>,
        config: EngineConfig,
        now: i64,
    ) -> Result<Self> {
        let root = root.into();
        let mut document = Document::empty(DocumentId::new(), config.schema_version);
        document.title = title.into();
        orchestrator::create(&root, &document, &config, now)?;
        Self::open(root, config)
    }

    /// Open an existing `.wiretuner` directory: replay it to its tip,
    /// fold its full history into undo/redo groups, and start the
    /// sampling recorder.
    pub fn open(root: impl Into<PathBuf>, config: EngineConfig) -> Result<Self> {
        let root = root.into();
        let LoadResult { document, store } = orchestrator::load(&root, &config)?;
        let document_id = document.id.clone();
        let WireTunerStore { event_store, snapshot_store, .. } = store;
        let event_store = Arc::new(event_store);

        let mut group_tracker = GroupTracker::new(config.idle_threshold_ms);
        for envelope in event_store.range(&document_id, 0, None)? {
            group_tracker.observe(&envelope?);
        }
        let boundaries: Vec<u64> = group_tracker.groups().iter().map(|g| g.to_sequence).collect();
        let tip = event_store.max_sequence(&document_id)?;
        let navigator = UndoNavigator::initialize(
            document_id.clone(),
            tip,
            boundaries,
            config.undo_cache_capacity,
        );
        let recorder = SamplingRecorder::start(event_store.clone(), config.clone());
        let mut session = SessionLifecycle::new(document_id.clone());
        session.session_opened();

        Ok(Engine {
            root,
            config,
            document_id,
            event_store,
            snapshot_store,
            recorder,
            group_tracker,
            observed_sequence: tip,
            navigator,
            session,
        })
    }

    pub fn document_id(&self) -> &DocumentId {
        &self.document_id
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn session(&mut self) -> &mut SessionLifecycle {
        &mut self.session
    }

    /// Enqueue a draft event for this document; returns immediately and
    /// is durable only after [`Engine::sync`] or [`Engine::save`].
    pub fn record(&self, now: i64, payload: EventPayload) {
        self.recorder
            .record(DraftEvent::new(self.document_id.clone(), now, payload));
    }

    pub fn begin_group(&self, now: i64, label: impl Into<String>, tool_id: impl Into<String>) -> GroupId {
        self.recorder
            .begin_group(self.document_id.clone(), now, label, tool_id)
    }

    pub fn end_group(&self, now: i64, group_id: GroupId, label: impl Into<String>) {
        self.recorder
            .end_group(self.document_id.clone(), now, group_id, label)
    }

    /// Block until every enqueued event is durable, fold newly committed
    /// events into the undo/redo group tracker, and advance the
    /// navigator's tip. Cache entries for sequences before the old tip
    /// are untouched -- only the tip moves (§4.8).
    pub fn sync(&mut self) -> Result<()> {
        self.recorder.flush()?;
        let new_tip = self.event_store.max_sequence(&self.document_id)?;
        if new_tip <= self.observed_sequence {
            return Ok(());
        }
        let from = (self.observed_sequence + 1).max(0) as u64;
        let mut seen_groups = self.group_tracker.groups().len();
        for envelope in self
            .event_store
            .range(&self.document_id, from, Some(new_tip as u64))?
        {
            self.group_tracker.observe(&envelope?);
            let groups = self.group_tracker.groups();
            if groups.len() > seen_groups {
                for group in &groups[seen_groups..] {
                    self.navigator
                        .advance_tip(group.to_sequence as i64, Some(group.to_sequence));
                }
                seen_groups = groups.len();
            }
        }
        self.navigator.advance_tip(new_tip, None);
        self.observed_sequence = new_tip;
        Ok(())
    }

    /// The document state at the navigator's current cursor (the tip,
    /// unless `undo`/`redo`/`navigate_to_sequence` moved it elsewhere).
    pub fn current(&mut self) -> Result<Arc<Document>> {
        let target = self.navigator.cursor_sequence();
        self.navigator
            .navigate_to_sequence(target, &self.event_store, &self.snapshot_store)
    }

    pub fn can_undo(&self) -> bool {
        self.navigator.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.navigator.can_redo()
    }

    pub fn undo(&mut self) -> Result<Arc<Document>> {
        self.navigator.undo(&self.event_store, &self.snapshot_store)
    }

    pub fn redo(&mut self) -> Result<Arc<Document>> {
        self.navigator.redo(&self.event_store, &self.snapshot_store)
    }

    pub fn navigate_to_sequence(&mut self, target: i64) -> Result<Arc<Document>> {
        self.navigator
            .navigate_to_sequence(target, &self.event_store, &self.snapshot_store)
    }

    /// Rebuild a hit-test index over the document's current state; the
    /// caller is expected to cache this themselves across queries and
    /// rebuild it only when the object set changes (§4.10).
    pub fn hit_test_index(&mut self) -> Result<HitTestIndex> {
        let document = self.current()?;
        Ok(HitTestIndex::build(&document))
    }

    pub fn hit_test(&mut self, point: Point, tolerance: f64) -> Result<Vec<HitResult>> {
        let document = self.current()?;
        let index = HitTestIndex::build(&document);
        Ok(index.hit_test(&document, point, tolerance, &self.config))
    }

    pub fn hit_test_bounds(&mut self, rect: &Rectangle) -> Result<Vec<crate::ids::ObjectId>> {
        let document = self.current()?;
        let index = HitTestIndex::build(&document);
        Ok(index.hit_test_bounds(rect))
    }

    /// Flush, snapshot if due, and update metadata (§4.9 save flow).
    pub fn save(&mut self, now: i64) -> Result<SaveResult> {
        self.sync()?;
        let document = self.current()?;
        orchestrator::save(
            &self.root,
            &self.document_id,
            &document,
            &self.event_store,
            &self.snapshot_store,
            &self.recorder,
            &self.config,
            now,
        )
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Unregister this engine's session, returning `true` if it was the
    /// last one referencing the document (§3 "freed when all sessions
    /// referencing it close" -- the caller drops the `Engine` once this
    /// returns `true`).
    pub fn close(&mut self) -> bool {
        self.session.session_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{ArtboardId, LayerId};
    use tempfile::tempdir;
    use wiretuner_geom::Rectangle as Rect;

    #[test]
    fn create_then_record_then_sync_updates_current_document() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("doc.wiretuner");
        let mut engine = Engine::create(&root, "Untitled", EngineConfig::default(), 1_000).unwrap();

        let artboard_id = ArtboardId::new();
        engine.record(
            1_100,
            EventPayload::CreateArtboard {
                artboard_id: artboard_id.clone(),
                name: "Board".to_string(),
                bounds: Rect::new(0.0, 0.0, 500.0, 500.0),
            },
        );
        engine.sync().unwrap();

        let document = engine.current().unwrap();
        assert_eq!(document.artboards.len(), 1);
        assert_eq!(document.artboards[0].id, artboard_id);
    }

    #[test]
    fn undo_after_recording_restores_prior_state() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("doc.wiretuner");
        let mut engine = Engine::create(&root, "Untitled", EngineConfig::default(), 0).unwrap();

        let artboard_id = ArtboardId::new();
        let layer_id = LayerId::new();
        engine.record(
            0,
            EventPayload::CreateArtboard {
                artboard_id: artboard_id.clone(),
                name: "Board".to_string(),
                bounds: Rect::new(0.0, 0.0, 500.0, 500.0),
            },
        );
        engine.record(
            10,
            EventPayload::CreateLayer {
                artboard_id,
                layer_id,
                name: "Layer 1".to_string(),
            },
        );
        engine.sync().unwrap();
        assert_eq!(engine.current().unwrap().artboards[0].layers.len(), 1);

        assert!(engine.can_undo());
        let undone = engine.undo().unwrap();
        assert!(undone.artboards[0].layers.is_empty());

        assert!(engine.can_redo());
        let redone = engine.redo().unwrap();
        assert_eq!(redone.artboards[0].layers.len(), 1);
    }

    #[test]
    fn save_then_reopen_round_trips_recorded_events() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("doc.wiretuner");
        let artboard_id;
        {
            let mut engine = Engine::create(&root, "Untitled", EngineConfig::default(), 0).unwrap();
            artboard_id = ArtboardId::new();
            engine.record(
                0,
                EventPayload::CreateArtboard {
                    artboard_id: artboard_id.clone(),
                    name: "Board".to_string(),
                    bounds: Rect::new(0.0, 0.0, 500.0, 500.0),
                },
            );
            engine.save(1_000).unwrap();
        }

        let mut reopened = Engine::open(&root, EngineConfig::default()).unwrap();
        let document = reopened.current().unwrap();
        assert_eq!(document.artboards.len(), 1);
        assert_eq!(document.artboards[0].id, artboard_id);
    }

    #[test]
    fn hit_test_finds_object_created_through_the_engine() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("doc.wiretuner");
        let mut engine = Engine::create(&root, "Untitled", EngineConfig::default(), 0).unwrap();

        let artboard_id = ArtboardId::new();
        let layer_id = LayerId::new();
        let object_id = crate::ids::ObjectId::new();
        engine.record(
            0,
            EventPayload::CreateArtboard {
                artboard_id: artboard_id.clone(),
                name: "Board".to_string(),
                bounds: Rect::new(0.0, 0.0, 500.0, 500.0),
            },
        );
        engine.record(
            1,
            EventPayload::CreateLayer {
                artboard_id: artboard_id.clone(),
                layer_id: layer_id.clone(),
                name: "Layer 1".to_string(),
            },
        );
        engine.record(
            2,
            EventPayload::CreateShape {
                artboard_id,
                layer_id,
                object_id: object_id.clone(),
                shape: wiretuner_geom::Shape::rect(Rect::new(10.0, 10.0, 100.0, 100.0)),
            },
        );
        engine.sync().unwrap();

        let hits = engine.hit_test(Point::new(50.0, 50.0), 2.0).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].object_id, object_id);
    }
}
