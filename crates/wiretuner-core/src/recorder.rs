use crate::config::EngineConfig;
use crate::error::Result;
use crate::event::{DraftEvent, Envelope, EventPayload};
use crate::ids::{DocumentId, GroupId};
use crate::store::FileEventStore;
use crossbeam_channel::{bounded, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

enum Message {
    Record(DraftEvent),
    Flush(Sender<Result<()>>),
    Shutdown,
}

/// Coalesces high-frequency continuous events into a sampled stream on a
/// dedicated thread (§4.3, §9's "replace the framework timer" redesign):
/// a `crossbeam_channel` feeds drafts to the sampler, which keeps the
/// first and last sample of every 50ms window and drops the rest, while
/// discrete events pass straight through.
pub struct SamplingRecorder {
    sender: Sender<Message>,
    handle: Option<JoinHandle<()>>,
}

impl SamplingRecorder {
    pub fn start(store: Arc<FileEventStore>, config: EngineConfig) -> Self {
        let (sender, receiver) = bounded::<Message>(4096);
        let handle = thread::spawn(move || sampler_loop(receiver, store, config));
        SamplingRecorder {
            sender,
            handle: Some(handle),
        }
    }

    /// Enqueue a draft event; returns immediately.
    pub fn record(&self, draft: DraftEvent) {
        let _ = self.sender.send(Message::Record(draft));
    }

    /// Block until every buffered event has been durably committed.
    pub fn flush(&self) -> Result<()> {
        let (ack_tx, ack_rx) = bounded(1);
        self.sender
            .send(Message::Flush(ack_tx))
            .expect("sampler thread must be alive");
        ack_rx.recv().expect("sampler thread must reply")
    }

    pub fn begin_group(
        &self,
        document_id: DocumentId,
        timestamp: i64,
        label: impl Into<String>,
        tool_id: impl Into<String>,
    ) -> GroupId {
        let group_id = GroupId::new();
        let draft = DraftEvent::new(
            document_id,
            timestamp,
            EventPayload::StartGroup {
                group_id: group_id.clone(),
                label: label.into(),
                reason: tool_id.into(),
            },
        )
        .with_undo_group(group_id.clone());
        self.record(draft);
        group_id
    }

    pub fn end_group(
        &self,
        document_id: DocumentId,
        timestamp: i64,
        group_id: GroupId,
        label: impl Into<String>,
    ) {
        let draft = DraftEvent::new(
            document_id,
            timestamp,
            EventPayload::EndGroup {
                group_id: group_id.clone(),
                label: label.into(),
            },
        )
        .with_undo_group(group_id);
        self.record(draft);
    }
}

impl Drop for SamplingRecorder {
    fn drop(&mut self) {
        let _ = self.sender.send(Message::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// A continuous-action window: discrete events flush immediately; a
/// continuous event opens a window that emits its first sample right away
/// and holds the most recent sample until the window's tick or a
/// boundary-crossing discrete/group event forces a flush.
struct ActiveWindow {
    first: Option<DraftEvent>,
    last: Option<DraftEvent>,
    opened_at: Instant,
}

fn sampler_loop(receiver: Receiver<Message>, store: Arc<FileEventStore>, config: EngineConfig) {
    let window = Duration::from_millis(config.sampling_interval_ms);
    let mut active: Option<ActiveWindow> = None;
    let mut pending_commit: Vec<DraftEvent> = Vec::new();

    loop {
        let timeout = match &active {
            Some(w) => window.saturating_sub(w.opened_at.elapsed()),
            None => Duration::from_millis(config.sampling_interval_ms),
        };
        match receiver.recv_timeout(timeout) {
            Ok(Message::Record(draft)) => {
                if draft.payload.is_continuous() {
                    match &mut active {
                        Some(w) => w.last = Some(draft),
                        None => {
                            active = Some(ActiveWindow {
                                first: Some(draft.clone()),
                                last: Some(draft),
                                opened_at: Instant::now(),
                            });
                        }
                    }
                } else {
                    flush_window(&mut active, &mut pending_commit);
                    pending_commit.push(draft);
                    commit_pending(&store, &config, &mut pending_commit);
                }
            }
            Ok(Message::Flush(ack)) => {
                flush_window(&mut active, &mut pending_commit);
                let result = commit_pending(&store, &config, &mut pending_commit);
                let _ = ack.send(result);
            }
            Ok(Message::Shutdown) => {
                flush_window(&mut active, &mut pending_commit);
                let _ = commit_pending(&store, &config, &mut pending_commit);
                return;
            }
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {
                flush_window(&mut active, &mut pending_commit);
                let _ = commit_pending(&store, &config, &mut pending_commit);
            }
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                flush_window(&mut active, &mut pending_commit);
                let _ = commit_pending(&store, &config, &mut pending_commit);
                return;
            }
        }
    }
}

/// Emit the first and last sample of the active window (they may be the
/// same event if the window closed on its first tick), then clear it.
fn flush_window(active: &mut Option<ActiveWindow>, pending: &mut Vec<DraftEvent>) {
    if let Some(window) = active.take() {
        if let Some(first) = window.first {
            pending.push(first.clone());
            if let Some(last) = window.last {
                if last != first {
                    pending.push(last);
                }
            }
        }
    }
}

/// Commit every buffered draft in one batch; if the append fails, none of
/// the batch is persisted and the failure is surfaced to the caller (§4.3
/// failure policy: an append failure mid-flush rejects the whole batch).
fn commit_pending(
    store: &FileEventStore,
    config: &EngineConfig,
    pending: &mut Vec<DraftEvent>,
) -> Result<()> {
    if pending.is_empty() {
        return Ok(());
    }
    let batch = std::mem::take(pending);
    let document_id = batch[0].document_id.clone();
    match store.append_batch(batch, config.append_latency_warn_ms) {
        Ok(envelopes) => {
            let _ = envelopes;
            Ok(())
        }
        Err(e) => {
            tracing::warn!(document_id = %document_id, error = %e, "sampling recorder degraded: batch append failed");
            Err(e)
        }
    }
}
