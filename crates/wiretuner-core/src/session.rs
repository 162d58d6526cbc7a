use crate::document::Viewport;
use crate::ids::{ArtboardId, DocumentId};
use std::collections::BTreeMap;

/// Per-session, per-artboard window state: the last viewport the user left
/// an artboard at, when it was last focused, and whether it holds unsaved
/// changes. None of this is event-sourced (§3 lifecycle) -- it lives only
/// for the duration of the session that opened the document and is never
/// replayed from the event log.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowState {
    pub viewport: Viewport,
    pub last_focused_at: i64,
    pub dirty: bool,
}

impl WindowState {
    pub fn new(viewport: Viewport, opened_at: i64) -> Self {
        WindowState {
            viewport,
            last_focused_at: opened_at,
            dirty: false,
        }
    }
}

/// Tracks the set of artboard windows a single session has open against one
/// document, plus document-close coordination across sessions. A document's
/// backing storage is only released once every session referencing it has
/// closed (§3 "freed when all sessions referencing it close").
pub struct SessionLifecycle {
    document_id: DocumentId,
    windows: BTreeMap<ArtboardId, WindowState>,
    open_session_count: u32,
}

impl SessionLifecycle {
    pub fn new(document_id: DocumentId) -> Self {
        SessionLifecycle {
            document_id,
            windows: BTreeMap::new(),
            open_session_count: 0,
        }
    }

    pub fn document_id(&self) -> &DocumentId {
        &self.document_id
    }

    /// Register a new session referencing this document, e.g. a second
    /// window opened on the same file.
    pub fn session_opened(&mut self) {
        self.open_session_count += 1;
    }

    /// Unregister a session. Returns `true` once the last referencing
    /// session has closed, signaling to the orchestrator that backing
    /// storage may be released.
    pub fn session_closed(&mut self) -> bool {
        self.open_session_count = self.open_session_count.saturating_sub(1);
        self.open_session_count == 0
    }

    pub fn open_session_count(&self) -> u32 {
        self.open_session_count
    }

    /// Record that `artboard_id`'s window gained focus at `now`, persisting
    /// its viewport if one is supplied.
    pub fn focus_artboard(&mut self, artboard_id: ArtboardId, viewport: Viewport, now: i64) {
        self.windows
            .entry(artboard_id)
            .and_modify(|w| {
                w.viewport = viewport;
                w.last_focused_at = now;
            })
            .or_insert_with(|| WindowState::new(viewport, now));
    }

    /// Mark an artboard window dirty (unsaved edits) or clean (just saved).
    pub fn set_dirty(&mut self, artboard_id: &ArtboardId, dirty: bool) {
        if let Some(window) = self.windows.get_mut(artboard_id) {
            window.dirty = dirty;
        }
    }

    pub fn window(&self, artboard_id: &ArtboardId) -> Option<&WindowState> {
        self.windows.get(artboard_id)
    }

    /// True if any open window holds unsaved changes; callers use this to
    /// decide whether a close requires a save prompt.
    pub fn any_dirty(&self) -> bool {
        self.windows.values().any(|w| w.dirty)
    }

    /// Drop the window state for an artboard that was closed or deleted.
    pub fn close_artboard(&mut self, artboard_id: &ArtboardId) {
        self.windows.remove(artboard_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{CanvasSize, Viewport};

    fn vp() -> Viewport {
        Viewport {
            pan_x: 0.0,
            pan_y: 0.0,
            zoom: 1.0,
            canvas_size: CanvasSize {
                width: 800.0,
                height: 600.0,
            },
        }
    }

    #[test]
    fn document_is_released_only_after_last_session_closes() {
        let mut lifecycle = SessionLifecycle::new(DocumentId::new());
        lifecycle.session_opened();
        lifecycle.session_opened();
        assert!(!lifecycle.session_closed());
        assert!(lifecycle.session_closed());
    }

    #[test]
    fn focus_artboard_persists_viewport_per_session() {
        let mut lifecycle = SessionLifecycle::new(DocumentId::new());
        let artboard_id = ArtboardId::new();
        lifecycle.focus_artboard(artboard_id.clone(), vp().with_zoom(2.0), 1_000);
        let window = lifecycle.window(&artboard_id).unwrap();
        assert_eq!(window.viewport.zoom, 2.0);
        assert_eq!(window.last_focused_at, 1_000);
        assert!(!window.dirty);
    }

    #[test]
    fn dirty_bit_is_not_event_sourced_and_tracked_per_window() {
        let mut lifecycle = SessionLifecycle::new(DocumentId::new());
        let artboard_id = ArtboardId::new();
        lifecycle.focus_artboard(artboard_id.clone(), vp(), 0);
        assert!(!lifecycle.any_dirty());
        lifecycle.set_dirty(&artboard_id, true);
        assert!(lifecycle.any_dirty());
        lifecycle.set_dirty(&artboard_id, false);
        assert!(!lifecycle.any_dirty());
    }

    #[test]
    fn closing_artboard_drops_its_window_state() {
        let mut lifecycle = SessionLifecycle::new(DocumentId::new());
        let artboard_id = ArtboardId::new();
        lifecycle.focus_artboard(artboard_id.clone(), vp(), 0);
        lifecycle.close_artboard(&artboard_id);
        assert!(lifecycle.window(&artboard_id).is_none());
    }
}
