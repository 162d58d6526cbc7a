use crate::document::Document;
use crate::error::{EngineError, Result};
use crate::ids::DocumentId;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs;
use std::io::{Read, Write};
use std::path::PathBuf;

const MAGIC: &[u8; 4] = b"WTSN";
const FORMAT_VERSION: u16 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionKind {
    None,
    Gzip,
}

impl CompressionKind {
    fn tag(self) -> u8 {
        match self {
            CompressionKind::None => 0,
            CompressionKind::Gzip => 1,
        }
    }

    fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(CompressionKind::None),
            1 => Some(CompressionKind::Gzip),
            _ => None,
        }
    }
}

/// A serialized [`Document`] at a given sequence, with the fixed header
/// from §4.5: `{ magic: 4B, format_version: u16, compression: u8,
/// uncompressed_size: u32, crc32: u32 }` followed by the payload bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub document_id: DocumentId,
    pub event_sequence: u64,
    pub created_at: i64,
    pub compression: CompressionKind,
    pub payload: Vec<u8>,
}

/// Build the on-disk framed bytes: header + compressed/raw payload.
fn encode_frame(uncompressed: &[u8], compression: CompressionKind) -> Result<Vec<u8>> {
    let crc = crc32fast::hash(uncompressed);
    let body = match compression {
        CompressionKind::None => uncompressed.to_vec(),
        CompressionKind::Gzip => {
            let mut encoder = GzEncoder::new(Vec::new(), Compression::new(6));
            encoder.write_all(uncompressed)?;
            encoder.finish()?
        }
    };
    let mut frame = Vec::with_capacity(15 + body.len());
    frame.extend_from_slice(MAGIC);
    frame.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    frame.push(compression.tag());
    frame.extend_from_slice(&(uncompressed.len() as u32).to_le_bytes());
    frame.extend_from_slice(&crc.to_le_bytes());
    frame.extend_from_slice(&body);
    Ok(frame)
}

/// Decode a framed snapshot back to its original (decompressed) bytes,
/// verifying the header magic/version and the CRC32 of the decompressed
/// payload.
fn decode_frame(frame: &[u8], sequence: u64) -> Result<Vec<u8>> {
    if frame.len() < 15 || &frame[0..4] != MAGIC {
        return Err(EngineError::CorruptSnapshot {
            sequence,
            reason: "bad magic".to_string(),
        });
    }
    let format_version = u16::from_le_bytes([frame[4], frame[5]]);
    if format_version != FORMAT_VERSION {
        return Err(EngineError::CorruptSnapshot {
            sequence,
            reason: format!("unsupported format version {format_version}"),
        });
    }
    let compression = CompressionKind::from_tag(frame[6]).ok_or_else(|| EngineError::CorruptSnapshot {
        sequence,
        reason: "unknown compression tag".to_string(),
    })?;
    let uncompressed_size = u32::from_le_bytes([frame[7], frame[8], frame[9], frame[10]]) as usize;
    let stored_crc = u32::from_le_bytes([frame[11], frame[12], frame[13], frame[14]]);
    let body = &frame[15..];
    let decompressed = match compression {
        CompressionKind::None => body.to_vec(),
        CompressionKind::Gzip => {
            let mut decoder = GzDecoder::new(body);
            let mut out = Vec::with_capacity(uncompressed_size);
            decoder
                .read_to_end(&mut out)
                .map_err(|e| EngineError::CorruptSnapshot {
                    sequence,
                    reason: format!("decompression failed: {e}"),
                })?;
            out
        }
    };
    if decompressed.len() != uncompressed_size {
        return Err(EngineError::CorruptSnapshot {
            sequence,
            reason: "uncompressed size mismatch".to_string(),
        });
    }
    let actual_crc = crc32fast::hash(&decompressed);
    if actual_crc != stored_crc {
        return Err(EngineError::CorruptSnapshot {
            sequence,
            reason: "crc32 mismatch".to_string(),
        });
    }
    Ok(decompressed)
}

/// Pure construction of a snapshot from a document at a sequence, always
/// gzip-compressed (§4.5 step 3).
pub fn create(document: &Document, sequence: u64, created_at: i64) -> Result<Snapshot> {
    let json = document.to_canonical_json()?;
    Ok(Snapshot {
        document_id: document.id.clone(),
        event_sequence: sequence,
        created_at,
        compression: CompressionKind::Gzip,
        payload: json,
    })
}

/// Content-addressed, directory-sharded snapshot store. Generalizes a
/// blob-store's dedup-by-digest write path: the write is skipped if a file
/// with the computed digest already exists.
pub struct SnapshotStore {
    root: PathBuf,
}

impl SnapshotStore {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(SnapshotStore { root })
    }

    fn index_path(&self, document_id: &DocumentId) -> PathBuf {
        self.root.join(format!("{}.index", document_id.0))
    }

    fn blob_path(&self, digest: &str) -> PathBuf {
        let (prefix, rest) = digest.split_at(2.min(digest.len()));
        self.root.join("blobs").join(prefix).join(rest)
    }

    /// Durably persist `snapshot`, skipping the write if an identical-digest
    /// blob already exists, and appending a pointer record to the
    /// document's sequence index.
    pub fn write(&self, snapshot: &Snapshot) -> Result<()> {
        let frame = encode_frame(&snapshot.payload, snapshot.compression)?;
        let digest = blake3::hash(&frame).to_hex().to_string();
        let blob_path = self.blob_path(&digest);
        if !blob_path.exists() {
            if let Some(parent) = blob_path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&blob_path, &frame)?;
        }
        let index_path = self.index_path(&snapshot.document_id);
        let mut line = serde_json::to_string(&IndexEntry {
            event_sequence: snapshot.event_sequence,
            created_at: snapshot.created_at,
            digest,
        })?;
        line.push('\n');
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(index_path)?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }

    fn index_entries(&self, document_id: &DocumentId) -> Result<Vec<IndexEntry>> {
        let index_path = self.index_path(document_id);
        if !index_path.exists() {
            return Ok(Vec::new());
        }
        let contents = fs::read_to_string(index_path)?;
        let mut entries = Vec::new();
        for line in contents.lines() {
            if line.trim().is_empty() {
                continue;
            }
            entries.push(serde_json::from_str(line)?);
        }
        Ok(entries)
    }

    /// The highest-sequence snapshot with `sequence <= target`, degrading
    /// to progressively older snapshots on CRC/decode failure (§4.5).
    pub fn latest_at_or_before(
        &self,
        document_id: &DocumentId,
        target: u64,
    ) -> Result<(Option<Snapshot>, Vec<EngineError>)> {
        let mut entries = self.index_entries(document_id)?;
        entries.retain(|e| e.event_sequence <= target);
        entries.sort_by(|a, b| b.event_sequence.cmp(&a.event_sequence));
        let mut warnings = Vec::new();
        for entry in entries {
            let blob_path = self.blob_path(&entry.digest);
            let frame = match fs::read(&blob_path) {
                Ok(bytes) => bytes,
                Err(e) => {
                    warnings.push(EngineError::CorruptSnapshot {
                        sequence: entry.event_sequence,
                        reason: format!("missing blob: {e}"),
                    });
                    continue;
                }
            };
            match decode_frame(&frame, entry.event_sequence) {
                Ok(payload) => {
                    let snapshot = Snapshot {
                        document_id: document_id.clone(),
                        event_sequence: entry.event_sequence,
                        created_at: entry.created_at,
                        compression: CompressionKind::Gzip,
                        payload,
                    };
                    return Ok((Some(snapshot), warnings));
                }
                Err(e) => warnings.push(e),
            }
        }
        // Every candidate at or below `target` failed to decode: no usable
        // snapshot exists, so the replayer falls back to sequence 0.
        Ok((None, warnings))
    }

    /// Retain only the newest `keep_count` index entries for a document.
    /// Unreferenced blobs are left in place; they are content-addressed and
    /// may be shared by snapshots of other documents or sequences.
    pub fn prune(&self, document_id: &DocumentId, keep_count: usize) -> Result<()> {
        let mut entries = self.index_entries(document_id)?;
        entries.sort_by(|a, b| b.event_sequence.cmp(&a.event_sequence));
        entries.truncate(keep_count);
        entries.sort_by_key(|e| e.event_sequence);
        let index_path = self.index_path(document_id);
        let mut contents = String::new();
        for entry in &entries {
            contents.push_str(&serde_json::to_string(entry)?);
            contents.push('\n');
        }
        fs::write(index_path, contents)?;
        Ok(())
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct IndexEntry {
    event_sequence: u64,
    created_at: i64,
    digest: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use tempfile::tempdir;

    #[test]
    fn create_and_write_then_read_back() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::open(dir.path()).unwrap();
        let doc = Document::empty(DocumentId::new(), 1);
        let snap = create(&doc, 100, 1000).unwrap();
        store.write(&snap).unwrap();

        let (found, warnings) = store.latest_at_or_before(&doc.id, 200).unwrap();
        let found = found.expect("snapshot should be found");
        assert!(warnings.is_empty());
        assert_eq!(found.event_sequence, 100);
        let restored: Document = serde_json::from_slice(&found.payload).unwrap();
        assert_eq!(restored, doc);
    }

    #[test]
    fn no_snapshot_before_target_returns_none() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::open(dir.path()).unwrap();
        let doc_id = DocumentId::new();
        let (found, _) = store.latest_at_or_before(&doc_id, 50).unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn dedup_skips_rewriting_identical_digest() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::open(dir.path()).unwrap();
        let doc = Document::empty(DocumentId::new(), 1);
        let snap1 = create(&doc, 100, 1000).unwrap();
        let snap2 = create(&doc, 200, 2000).unwrap();
        store.write(&snap1).unwrap();
        store.write(&snap2).unwrap();
        // Both snapshots carry identical document bytes -> identical digest,
        // but two distinct index entries (different sequence).
        let (found, _) = store.latest_at_or_before(&doc.id, 200).unwrap();
        assert_eq!(found.unwrap().event_sequence, 200);
    }

    #[test]
    fn prune_keeps_only_newest_n() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::open(dir.path()).unwrap();
        let doc = Document::empty(DocumentId::new(), 1);
        for seq in [100u64, 200, 300, 400] {
            let mut d = doc.clone();
            d.title = format!("seq-{seq}");
            store.write(&create(&d, seq, seq as i64).unwrap()).unwrap();
        }
        store.prune(&doc.id, 2).unwrap();
        let entries = store.index_entries(&doc.id).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].event_sequence, 300);
        assert_eq!(entries[1].event_sequence, 400);
    }
}
