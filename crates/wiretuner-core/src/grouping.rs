use crate::event::{Envelope, EventPayload};
use crate::ids::GroupId;

/// A resolved run of events that undo/redo treats as one step (§4.7).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationGroup {
    pub group_id: Option<GroupId>,
    pub from_sequence: u64,
    pub to_sequence: u64,
}

/// Reason an implicit group boundary was forced, surfaced for logging/UI
/// feedback rather than stored on the event stream itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryReason {
    ExplicitGroup,
    Idle,
    ToolSwitch,
    Forced,
}

/// Folds a flat committed-event stream into undo/redo groups: explicit
/// `StartGroup`/`EndGroup` pairs bound a group (nested pairs flatten into
/// their outer pair); outside of an explicit pair, an idle gap above the
/// configured threshold or an explicit tool-switch boundary closes the
/// group in progress.
pub struct GroupTracker {
    idle_threshold_ms: u64,
    depth: u32,
    current: Option<PartialGroup>,
    completed: Vec<OperationGroup>,
}

struct PartialGroup {
    group_id: Option<GroupId>,
    from_sequence: u64,
    to_sequence: u64,
    last_timestamp_ms: i64,
}

impl GroupTracker {
    pub fn new(idle_threshold_ms: u64) -> Self {
        GroupTracker {
            idle_threshold_ms,
            depth: 0,
            current: None,
            completed: Vec::new(),
        }
    }

    /// Feed the next committed event, in sequence order.
    pub fn observe(&mut self, envelope: &Envelope) {
        match envelope.payload() {
            EventPayload::StartGroup { group_id, .. } => {
                if self.depth == 0 {
                    self.close_current(BoundaryReason::ExplicitGroup);
                    self.current = Some(PartialGroup {
                        group_id: Some(group_id.clone()),
                        from_sequence: envelope.event_sequence,
                        to_sequence: envelope.event_sequence,
                        last_timestamp_ms: envelope_timestamp(envelope),
                    });
                } else if let Some(group) = &mut self.current {
                    group.to_sequence = envelope.event_sequence;
                }
                self.depth += 1;
            }
            EventPayload::EndGroup { .. } => {
                self.depth = self.depth.saturating_sub(1);
                if let Some(group) = &mut self.current {
                    group.to_sequence = envelope.event_sequence;
                }
                if self.depth == 0 {
                    self.close_current(BoundaryReason::ExplicitGroup);
                }
            }
            _ => {
                let timestamp = envelope_timestamp(envelope);
                if self.depth == 0 {
                    let idle = self
                        .current
                        .as_ref()
                        .map(|g| (timestamp - g.last_timestamp_ms) as u64 > self.idle_threshold_ms)
                        .unwrap_or(false);
                    if idle {
                        self.close_current(BoundaryReason::Idle);
                    }
                    match &mut self.current {
                        Some(group) => {
                            group.to_sequence = envelope.event_sequence;
                            group.last_timestamp_ms = timestamp;
                        }
                        None => {
                            self.current = Some(PartialGroup {
                                group_id: envelope.draft.undo_group_id.clone(),
                                from_sequence: envelope.event_sequence,
                                to_sequence: envelope.event_sequence,
                                last_timestamp_ms: timestamp,
                            });
                        }
                    }
                } else if let Some(group) = &mut self.current {
                    group.to_sequence = envelope.event_sequence;
                }
            }
        }
    }

    /// Force the in-progress implicit group (if any) to close, e.g. on a
    /// tool switch. No-op while inside an explicit `StartGroup`/`EndGroup`
    /// pair, since only the matching `EndGroup` can close that.
    pub fn force_boundary(&mut self, reason: BoundaryReason) {
        if self.depth == 0 {
            self.close_current(reason);
        }
    }

    fn close_current(&mut self, _reason: BoundaryReason) {
        if let Some(group) = self.current.take() {
            self.completed.push(OperationGroup {
                group_id: group.group_id,
                from_sequence: group.from_sequence,
                to_sequence: group.to_sequence,
            });
        }
    }

    /// Groups closed so far, in sequence order. The in-progress group (if
    /// any) is not included until it closes.
    pub fn groups(&self) -> &[OperationGroup] {
        &self.completed
    }
}

fn envelope_timestamp(envelope: &Envelope) -> i64 {
    envelope.draft.timestamp
}
