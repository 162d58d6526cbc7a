use crate::applier::{self, ApplierState};
use crate::document::Document;
use crate::error::{EngineError, Result};
use crate::ids::DocumentId;
use crate::snapshot::SnapshotStore;
use crate::store::FileEventStore;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// Cache hit/miss counters since the last [`UndoNavigator::clear_cache`]
/// (§4.8's `cacheStats`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

/// Navigates undo/redo as movement of a sequence cursor over the
/// committed event log, rather than inverse operations: `undo` moves the
/// cursor to the previous group boundary and replays from there, `redo`
/// moves it forward again. Appending a new event while the cursor isn't
/// at the tip truncates -- but never physically deletes -- the events
/// past it (§4.8's abandoned-tail Open Question: they remain on disk,
/// tombstoned by being unreachable from the new tip, so a future
/// `navigateToSequence` past them would still see them as an orphaned
/// branch rather than silently losing history).
pub struct UndoNavigator {
    document_id: DocumentId,
    tip_sequence: i64,
    cursor_sequence: i64,
    group_boundaries: Vec<u64>,
    cache: LruCache<i64, Arc<Document>>,
    stats: CacheStats,
}

impl UndoNavigator {
    /// Build a navigator over `document_id`'s full committed history.
    /// `group_boundaries` are the `to_sequence` of each closed
    /// [`crate::grouping::OperationGroup`], in ascending order.
    pub fn initialize(
        document_id: DocumentId,
        tip_sequence: i64,
        group_boundaries: Vec<u64>,
        cache_capacity: usize,
    ) -> Self {
        let capacity = NonZeroUsize::new(cache_capacity.max(1)).unwrap();
        UndoNavigator {
            document_id,
            tip_sequence,
            cursor_sequence: tip_sequence,
            group_boundaries,
            cache: LruCache::new(capacity),
            stats: CacheStats::default(),
        }
    }

    pub fn can_undo(&self) -> bool {
        self.cursor_sequence >= 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor_sequence < self.tip_sequence
    }

    /// The sequence the cursor currently sits at.
    pub fn cursor_sequence(&self) -> i64 {
        self.cursor_sequence
    }

    /// The highest sequence known to be committed.
    pub fn tip_sequence(&self) -> i64 {
        self.tip_sequence
    }

    /// Move the cursor back to the start of the group it currently sits
    /// in (or the previous one, if it sits exactly on a boundary), and
    /// return the document state there.
    pub fn undo(
        &mut self,
        event_store: &FileEventStore,
        snapshot_store: &SnapshotStore,
    ) -> Result<Arc<Document>> {
        if !self.can_undo() {
            return Err(EngineError::InvariantViolated {
                kind: "NoMoreUndo".to_string(),
                at: self.cursor_sequence.to_string(),
            });
        }
        let target = self.previous_boundary(self.cursor_sequence);
        self.navigate_to_sequence(target, event_store, snapshot_store)
    }

    /// Move the cursor forward to the next group boundary (capped at the
    /// tip) and return the document state there.
    pub fn redo(
        &mut self,
        event_store: &FileEventStore,
        snapshot_store: &SnapshotStore,
    ) -> Result<Arc<Document>> {
        if !self.can_redo() {
            return Err(EngineError::InvariantViolated {
                kind: "NoMoreRedo".to_string(),
                at: self.cursor_sequence.to_string(),
            });
        }
        let target = self.next_boundary(self.cursor_sequence);
        self.navigate_to_sequence(target, event_store, snapshot_store)
    }

    /// Move the cursor to an arbitrary sequence (not necessarily a group
    /// boundary) and replay to it, using the cache when possible.
    pub fn navigate_to_sequence(
        &mut self,
        target: i64,
        event_store: &FileEventStore,
        snapshot_store: &SnapshotStore,
    ) -> Result<Arc<Document>> {
        if let Some(cached) = self.cache.get(&target) {
            self.stats.hits += 1;
            self.cursor_sequence = target;
            return Ok(cached.clone());
        }
        self.stats.misses += 1;
        let replayed = applier::ApplierState::new(Document::empty(self.document_id.clone(), 1));
        let state = if target < 0 {
            replayed
        } else {
            let result = crate::replay::replay_to_sequence(
                event_store,
                snapshot_store,
                &self.document_id,
                target as u64,
                true,
                None,
            )?;
            result.state
        };
        let document = Arc::new(state.document);
        self.cache.put(target, document.clone());
        self.cursor_sequence = target;
        Ok(document)
    }

    /// Extend the known tip after a new event is appended while the
    /// cursor sat at the previous tip; if the cursor was not at the tip,
    /// the caller is expected to have already decided whether to branch
    /// or discard the redo tail before calling this.
    pub fn advance_tip(&mut self, new_tip_sequence: i64, group_boundary: Option<u64>) {
        self.tip_sequence = new_tip_sequence;
        self.cursor_sequence = new_tip_sequence;
        if let Some(boundary) = group_boundary {
            self.group_boundaries.push(boundary);
        }
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
        self.stats = CacheStats::default();
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.stats
    }

    fn previous_boundary(&self, from: i64) -> i64 {
        self.group_boundaries
            .iter()
            .rev()
            .map(|&b| b as i64)
            .find(|&b| b < from)
            .unwrap_or(-1)
    }

    fn next_boundary(&self, from: i64) -> i64 {
        self.group_boundaries
            .iter()
            .map(|&b| b as i64)
            .find(|&b| b > from)
            .unwrap_or(self.tip_sequence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::VectorObject;
    use crate::event::{DraftEvent, EventPayload};
    use crate::ids::{ArtboardId, LayerId, ObjectId};
    use tempfile::tempdir;
    use wiretuner_geom::{Point, Rectangle};

    fn seeded_store(dir: &std::path::Path) -> (FileEventStore, SnapshotStore, DocumentId, Vec<u64>) {
        let event_store = FileEventStore::open(dir.join("events")).unwrap();
        let snapshot_store = SnapshotStore::open(dir.join("snapshots")).unwrap();
        let document_id = DocumentId::new();
        let artboard_id = ArtboardId::new();
        let layer_id = LayerId::new();
        event_store
            .append(
                DraftEvent::new(
                    document_id.clone(),
                    0,
                    EventPayload::CreateArtboard {
                        artboard_id: artboard_id.clone(),
                        name: "Board".to_string(),
                        bounds: Rectangle::new(0.0, 0.0, 500.0, 500.0),
                    },
                ),
                50,
            )
            .unwrap();
        event_store
            .append(
                DraftEvent::new(
                    document_id.clone(),
                    1,
                    EventPayload::CreateLayer {
                        artboard_id: artboard_id.clone(),
                        layer_id: layer_id.clone(),
                        name: "Layer 1".to_string(),
                    },
                ),
                50,
            )
            .unwrap();
        let path_id = ObjectId::new();
        event_store
            .append(
                DraftEvent::new(
                    document_id.clone(),
                    2,
                    EventPayload::CreatePath {
                        artboard_id,
                        layer_id,
                        path_id,
                        start: Point::new(0.0, 0.0),
                    },
                ),
                50,
            )
            .unwrap();
        (event_store, snapshot_store, document_id, vec![0, 1, 2])
    }

    #[test]
    fn undo_moves_cursor_to_previous_boundary() {
        let dir = tempdir().unwrap();
        let (event_store, snapshot_store, document_id, boundaries) = seeded_store(dir.path());
        let mut nav = UndoNavigator::initialize(document_id, 2, boundaries, 10);
        assert!(nav.can_undo());
        let document = nav.undo(&event_store, &snapshot_store).unwrap();
        assert_eq!(document.artboards[0].layers.len(), 1);
        assert!(document.artboards[0].layers[0].objects.is_empty());
    }

    #[test]
    fn redo_restores_state_after_undo() {
        let dir = tempdir().unwrap();
        let (event_store, snapshot_store, document_id, boundaries) = seeded_store(dir.path());
        let mut nav = UndoNavigator::initialize(document_id, 2, boundaries, 10);
        nav.undo(&event_store, &snapshot_store).unwrap();
        assert!(nav.can_redo());
        let document = nav.redo(&event_store, &snapshot_store).unwrap();
        assert_eq!(document.artboards[0].layers[0].objects.len(), 1);
        match &document.artboards[0].layers[0].objects[0] {
            VectorObject::PathObject { .. } => {}
            _ => panic!("expected path object"),
        }
    }

    #[test]
    fn repeated_navigation_to_same_sequence_hits_cache() {
        let dir = tempdir().unwrap();
        let (event_store, snapshot_store, document_id, boundaries) = seeded_store(dir.path());
        let mut nav = UndoNavigator::initialize(document_id, 2, boundaries, 10);
        nav.navigate_to_sequence(0, &event_store, &snapshot_store)
            .unwrap();
        nav.navigate_to_sequence(2, &event_store, &snapshot_store)
            .unwrap();
        nav.navigate_to_sequence(0, &event_store, &snapshot_store)
            .unwrap();
        let stats = nav.cache_stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 2);
    }

    #[test]
    fn cannot_undo_past_the_start() {
        let dir = tempdir().unwrap();
        let (event_store, snapshot_store, document_id, _) = seeded_store(dir.path());
        let mut nav = UndoNavigator::initialize(document_id, 2, vec![], 10);
        nav.navigate_to_sequence(-1, &event_store, &snapshot_store)
            .unwrap();
        assert!(!nav.can_undo());
        assert!(nav.undo(&event_store, &snapshot_store).is_err());
    }
}
