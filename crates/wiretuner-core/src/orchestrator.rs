use crate::config::EngineConfig;
use crate::document::Document;
use crate::error::{EngineError, Result};
use crate::ids::DocumentId;
use crate::recorder::SamplingRecorder;
use crate::snapshot::{self, SnapshotStore};
use crate::store::FileEventStore;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

/// The on-disk record at `<root>/metadata.json`, identifying the document
/// a `.wiretuner` directory belongs to and the schema it was last written
/// with (§6.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub document_id: DocumentId,
    pub schema_version: u32,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Migrates a document from one schema version to the next. Migrations
/// are applied in sequence until the document reaches
/// [`EngineConfig::schema_version`]; a document already at the current
/// version runs through none of them.
pub trait Migration {
    fn from_version(&self) -> u32;
    fn to_version(&self) -> u32;
    fn migrate(&self, document: Document) -> Result<Document>;
}

/// The only migration this build ships: v1 is the only schema version
/// that has ever existed, so it is a no-op placeholder for the migration
/// chain future schema bumps will extend.
pub struct V1Identity;

impl Migration for V1Identity {
    fn from_version(&self) -> u32 {
        1
    }

    fn to_version(&self) -> u32 {
        1
    }

    fn migrate(&self, document: Document) -> Result<Document> {
        Ok(document)
    }
}

fn migrations() -> Vec<Box<dyn Migration>> {
    vec![Box::new(V1Identity)]
}

fn run_migrations(mut document: Document, target_version: u32) -> Result<Document> {
    if document.schema_version > target_version {
        return Err(EngineError::VersionMismatch {
            found: document.schema_version,
            supported: target_version,
        });
    }
    let chain = migrations();
    while document.schema_version < target_version {
        let step = chain
            .iter()
            .find(|m| m.from_version() == document.schema_version);
        let Some(step) = step else {
            return Err(EngineError::MigrationFailed {
                from: document.schema_version,
                to: target_version,
                reason: "no migration registered for this version".to_string(),
            });
        };
        let from = document.schema_version;
        document = step.migrate(document)?;
        document.schema_version = step.to_version();
        if document.schema_version == from {
            // identity migration at the target version: stop rather than loop.
            break;
        }
    }
    Ok(document)
}

/// Backing storage for a single `.wiretuner` document directory: a
/// metadata file, a per-document event log, and a snapshot store,
/// co-located under `root` (§6.1).
pub struct WireTunerStore {
    root: PathBuf,
    pub event_store: FileEventStore,
    pub snapshot_store: SnapshotStore,
}

/// Outcome of a save (§4.9 step 5).
#[derive(Debug, Clone, PartialEq)]
pub struct SaveResult {
    pub file_path: PathBuf,
    pub sequence_number: i64,
    pub duration_ms: u64,
}

/// Outcome of a load: the reconstructed document plus the store it was
/// loaded from, ready for further appends.
pub struct LoadResult {
    pub document: Document,
    pub store: WireTunerStore,
}

fn validate_path(path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Err(EngineError::InvalidPath("empty path".to_string()));
    }
    Ok(())
}

/// Run `op`, retrying up to `config.load_retry_attempts` times on a
/// transient-looking IO error with the configured exponential backoff
/// (§5). `StorageFull`, `PermissionDenied`, and corruption errors are not
/// retried -- only bare IO errors, which are the only kind a transient
/// disk hiccup or lock contention would surface as.
fn with_retry<T>(config: &EngineConfig, mut op: impl FnMut() -> Result<T>) -> Result<T> {
    let mut attempt = 0;
    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(EngineError::Io(e)) if attempt + 1 < config.load_retry_attempts => {
                let backoff_ms = config
                    .load_retry_backoff_ms
                    .get(attempt as usize)
                    .copied()
                    .unwrap_or(160);
                tracing::warn!(attempt, backoff_ms, error = %e, "retrying transient storage error");
                thread::sleep(Duration::from_millis(backoff_ms));
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Create a brand-new `.wiretuner` directory at `path` for `document`
/// (§4.9 save flow, first-save path).
pub fn create(path: impl AsRef<Path>, document: &Document, config: &EngineConfig, now: i64) -> Result<SaveResult> {
    let path = path.as_ref();
    validate_path(path)?;
    let started = Instant::now();
    if path.exists() && fs::read_dir(path).map(|mut d| d.next().is_some()).unwrap_or(false) {
        return Err(EngineError::FileExists(path.display().to_string()));
    }
    with_retry(config, || fs::create_dir_all(path).map_err(EngineError::from))?;

    let event_store = FileEventStore::open(path.join("events"))?;
    let snapshot_store = SnapshotStore::open(path.join("snapshots"))?;

    let metadata = DocumentMetadata {
        document_id: document.id.clone(),
        schema_version: document.schema_version,
        created_at: now,
        updated_at: now,
    };
    write_metadata(path, &metadata)?;

    let snapshot = snapshot::create(document, 0, now)?;
    snapshot_store.write(&snapshot)?;

    Ok(SaveResult {
        file_path: path.to_path_buf(),
        sequence_number: -1,
        duration_ms: started.elapsed().as_millis() as u64,
    })
}

/// Persist the current state of an already-open document (§4.9 save
/// flow): flush the recorder so every buffered event is durable, then
/// snapshot if the event count since the last snapshot has crossed
/// [`EngineConfig::snapshot_interval`].
pub fn save(
    path: impl AsRef<Path>,
    document_id: &DocumentId,
    document: &Document,
    event_store: &FileEventStore,
    snapshot_store: &SnapshotStore,
    recorder: &SamplingRecorder,
    config: &EngineConfig,
    now: i64,
) -> Result<SaveResult> {
    let path = path.as_ref();
    validate_path(path)?;
    let started = Instant::now();

    recorder.flush()?;

    let sequence = event_store.max_sequence(document_id)?;
    let (latest, _warnings) =
        snapshot_store.latest_at_or_before(document_id, u64::try_from(sequence.max(0)).unwrap_or(0))?;
    let should_snapshot = match latest {
        None => sequence >= 0,
        Some(snap) => {
            sequence >= 0
                && (sequence as u64).saturating_sub(snap.event_sequence) >= config.snapshot_interval
        }
    };
    if should_snapshot && sequence >= 0 {
        let snapshot = snapshot::create(document, sequence as u64, now)?;
        snapshot_store.write(&snapshot)?;
        snapshot_store.prune(document_id, config.snapshot_keep_count)?;
    }

    let mut metadata = read_metadata(path)?;
    metadata.updated_at = now;
    metadata.schema_version = document.schema_version;
    write_metadata(path, &metadata)?;

    Ok(SaveResult {
        file_path: path.to_path_buf(),
        sequence_number: sequence,
        duration_ms: started.elapsed().as_millis() as u64,
    })
}

/// Open an existing `.wiretuner` directory and replay it to its tip,
/// migrating the document forward if it was written by an older schema
/// version (§4.9 load flow).
pub fn load(path: impl AsRef<Path>, config: &EngineConfig) -> Result<LoadResult> {
    let path = path.as_ref();
    validate_path(path)?;
    if !path.exists() {
        return Err(EngineError::FileNotFound(path.display().to_string()));
    }

    let metadata = with_retry(config, || read_metadata(path))?;
    let event_store = FileEventStore::open(path.join("events"))?;
    let snapshot_store = SnapshotStore::open(path.join("snapshots"))?;

    let tip = event_store.max_sequence(&metadata.document_id)?;
    let target = tip.max(0) as u64;
    let result = crate::replay::replay_to_sequence(
        &event_store,
        &snapshot_store,
        &metadata.document_id,
        target,
        true,
        None,
    )?;

    let document = run_migrations(result.state.document, config.schema_version)?;

    Ok(LoadResult {
        document,
        store: WireTunerStore {
            root: path.to_path_buf(),
            event_store,
            snapshot_store,
        },
    })
}

impl WireTunerStore {
    pub fn root(&self) -> &Path {
        &self.root
    }
}

fn metadata_path(root: &Path) -> PathBuf {
    root.join("metadata.json")
}

fn read_metadata(root: &Path) -> Result<DocumentMetadata> {
    let bytes = fs::read(metadata_path(root))?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn write_metadata(root: &Path, metadata: &DocumentMetadata) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(metadata)?;
    fs::write(metadata_path(root), bytes)?;
    Ok(())
}
