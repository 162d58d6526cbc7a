use crate::error::{EngineError, Result};
use crate::event::{DraftEvent, Envelope};
use crate::ids::{DocumentId, EventId};
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::time::Instant;

/// An append-only, per-document JSONL event log. One file per document,
/// one `Envelope` per line, sequence assignment serialized through a
/// single writer (§4.2, §5).
pub struct FileEventStore {
    root: PathBuf,
}

impl FileEventStore {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(FileEventStore { root })
    }

    fn log_path(&self, document_id: &DocumentId) -> PathBuf {
        self.root.join(format!("{}.jsonl", document_id.0))
    }

    /// The highest committed sequence for `document_id`, or `-1` if empty.
    pub fn max_sequence(&self, document_id: &DocumentId) -> Result<i64> {
        let path = self.log_path(document_id);
        if !path.exists() {
            return Ok(-1);
        }
        let file = fs::File::open(path)?;
        let reader = BufReader::new(file);
        let mut max: i64 = -1;
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let envelope: Envelope = serde_json::from_str(&line)?;
            max = max.max(envelope.event_sequence as i64);
        }
        Ok(max)
    }

    /// Assign the next sequence to `draft`, persist it durably, and return
    /// the committed envelope. Append latency above the configured
    /// threshold is logged, not blocked on (§4.2 policy).
    pub fn append(&self, draft: DraftEvent, warn_after_ms: u64) -> Result<Envelope> {
        let next = (self.max_sequence(&draft.document_id)? + 1) as u64;
        let envelope = Envelope::commit(draft, next, EventId::new());
        self.write_committed(&envelope, warn_after_ms)?;
        Ok(envelope)
    }

    /// All-or-nothing batch append: sequences are assigned contiguously
    /// starting at the next free sequence, and either every event is
    /// persisted or none are.
    pub fn append_batch(
        &self,
        drafts: Vec<DraftEvent>,
        warn_after_ms: u64,
    ) -> Result<Vec<Envelope>> {
        if drafts.is_empty() {
            return Ok(Vec::new());
        }
        let document_id = drafts[0].document_id.clone();
        let mut next = (self.max_sequence(&document_id)? + 1) as u64;
        let mut envelopes = Vec::with_capacity(drafts.len());
        let mut buffer = String::new();
        for draft in drafts {
            let envelope = Envelope::commit(draft, next, EventId::new());
            buffer.push_str(&serde_json::to_string(&envelope)?);
            buffer.push('\n');
            envelopes.push(envelope);
            next += 1;
        }
        let path = self.log_path(&document_id);
        let started = Instant::now();
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)?;
        file.write_all(buffer.as_bytes())?;
        file.sync_data()?;
        let elapsed_ms = started.elapsed().as_millis() as u64;
        if elapsed_ms > warn_after_ms {
            tracing::warn!(
                document_id = %document_id,
                elapsed_ms,
                "event append latency exceeded threshold"
            );
        }
        Ok(envelopes)
    }

    fn write_committed(&self, envelope: &Envelope, warn_after_ms: u64) -> Result<()> {
        let path = self.log_path(envelope.document_id());
        let mut line = serde_json::to_string(envelope)?;
        line.push('\n');
        let started = Instant::now();
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)?;
        file.write_all(line.as_bytes())?;
        file.sync_data()?;
        let elapsed_ms = started.elapsed().as_millis() as u64;
        if elapsed_ms > warn_after_ms {
            tracing::warn!(
                document_id = %envelope.document_id(),
                sequence = envelope.event_sequence,
                elapsed_ms,
                "event append latency exceeded threshold"
            );
        }
        Ok(())
    }

    /// Stream committed events for `document_id` with `from_seq <= seq <=
    /// to_seq` (inclusive; `to_seq = None` means latest). Scans the log
    /// rather than materializing the whole file into memory up front.
    pub fn range(
        &self,
        document_id: &DocumentId,
        from_seq: u64,
        to_seq: Option<u64>,
    ) -> Result<impl Iterator<Item = Result<Envelope>>> {
        let path = self.log_path(document_id);
        let file = if path.exists() {
            Some(fs::File::open(path)?)
        } else {
            None
        };
        let reader = file.map(BufReader::new);
        Ok(RangeIter {
            reader,
            from_seq,
            to_seq,
        })
    }

    /// Drop events with `sequence < seq`. Refuses unless a snapshot at or
    /// above `seq` exists -- callers pass that proof in via `has_snapshot_at_or_after`
    /// since the event store has no dependency on the snapshot store.
    pub fn prune_before(
        &self,
        document_id: &DocumentId,
        seq: u64,
        has_snapshot_at_or_after: bool,
    ) -> Result<()> {
        if !has_snapshot_at_or_after {
            return Err(EngineError::InvariantViolated {
                kind: "PruneWithoutSnapshot".to_string(),
                at: seq.to_string(),
            });
        }
        let path = self.log_path(document_id);
        if !path.exists() {
            return Ok(());
        }
        let contents = fs::read_to_string(&path)?;
        let mut kept = String::new();
        for line in contents.lines() {
            if line.trim().is_empty() {
                continue;
            }
            let envelope: Envelope = serde_json::from_str(line)?;
            if envelope.event_sequence >= seq {
                kept.push_str(line);
                kept.push('\n');
            }
        }
        fs::write(path, kept)?;
        Ok(())
    }
}

struct RangeIter {
    reader: Option<BufReader<fs::File>>,
    from_seq: u64,
    to_seq: Option<u64>,
}

impl Iterator for RangeIter {
    type Item = Result<Envelope>;

    fn next(&mut self) -> Option<Self::Item> {
        let reader = self.reader.as_mut()?;
        loop {
            let mut line = String::new();
            match reader.read_line(&mut line) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => return Some(Err(e.into())),
            }
            if line.trim().is_empty() {
                continue;
            }
            let envelope: Envelope = match serde_json::from_str(line.trim_end()) {
                Ok(e) => e,
                Err(e) => return Some(Err(e.into())),
            };
            if envelope.event_sequence < self.from_seq {
                continue;
            }
            if let Some(to) = self.to_seq {
                if envelope.event_sequence > to {
                    return None;
                }
            }
            return Some(Ok(envelope));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventPayload;
    use tempfile::tempdir;

    fn draft(document_id: &DocumentId, seq_hint: i64) -> DraftEvent {
        DraftEvent::new(
            document_id.clone(),
            1_000 + seq_hint,
            EventPayload::ClearSelection {},
        )
    }

    #[test]
    fn new_store_starts_at_minus_one() {
        let dir = tempdir().unwrap();
        let store = FileEventStore::open(dir.path()).unwrap();
        let doc_id = DocumentId::new();
        assert_eq!(store.max_sequence(&doc_id).unwrap(), -1);
    }

    #[test]
    fn append_assigns_monotonic_sequences() {
        let dir = tempdir().unwrap();
        let store = FileEventStore::open(dir.path()).unwrap();
        let doc_id = DocumentId::new();
        for i in 0..50 {
            let envelope = store.append(draft(&doc_id, i), 50).unwrap();
            assert_eq!(envelope.event_sequence, i as u64);
        }
        assert_eq!(store.max_sequence(&doc_id).unwrap(), 49);
    }

    #[test]
    fn append_batch_is_contiguous() {
        let dir = tempdir().unwrap();
        let store = FileEventStore::open(dir.path()).unwrap();
        let doc_id = DocumentId::new();
        let drafts: Vec<_> = (0..10).map(|i| draft(&doc_id, i)).collect();
        let envelopes = store.append_batch(drafts, 50).unwrap();
        for (i, e) in envelopes.iter().enumerate() {
            assert_eq!(e.event_sequence, i as u64);
        }
    }

    #[test]
    fn range_respects_inclusive_bounds() {
        let dir = tempdir().unwrap();
        let store = FileEventStore::open(dir.path()).unwrap();
        let doc_id = DocumentId::new();
        for i in 0..20 {
            store.append(draft(&doc_id, i), 50).unwrap();
        }
        let collected: Vec<_> = store
            .range(&doc_id, 5, Some(10))
            .unwrap()
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(collected.len(), 6);
        assert_eq!(collected.first().unwrap().event_sequence, 5);
        assert_eq!(collected.last().unwrap().event_sequence, 10);
    }

    #[test]
    fn prune_before_requires_snapshot_proof() {
        let dir = tempdir().unwrap();
        let store = FileEventStore::open(dir.path()).unwrap();
        let doc_id = DocumentId::new();
        for i in 0..10 {
            store.append(draft(&doc_id, i), 50).unwrap();
        }
        assert!(store.prune_before(&doc_id, 5, false).is_err());
        store.prune_before(&doc_id, 5, true).unwrap();
        let remaining: Vec<_> = store
            .range(&doc_id, 0, None)
            .unwrap()
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(remaining.len(), 5);
        assert_eq!(remaining.first().unwrap().event_sequence, 5);
    }

    #[test]
    fn resume_from_existing_log_continues_sequence() {
        let dir = tempdir().unwrap();
        let doc_id = DocumentId::new();
        {
            let store = FileEventStore::open(dir.path()).unwrap();
            for i in 0..5 {
                store.append(draft(&doc_id, i), 50).unwrap();
            }
        }
        let store = FileEventStore::open(dir.path()).unwrap();
        let envelope = store.append(draft(&doc_id, 5), 50).unwrap();
        assert_eq!(envelope.event_sequence, 5);
    }
}
