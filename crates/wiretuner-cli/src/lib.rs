//! `wiretuner` -- export/import a bounded range of a document's event log
//! (§6.5). Exit code `0` on success, `1` on validation or I/O failure.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use wiretuner_core::ids::DocumentId;
use wiretuner_core::snapshot::SnapshotStore;
use wiretuner_core::store::FileEventStore;
use wiretuner_export::{export_range, import_bundle, DebugExport};

#[derive(Parser)]
#[command(name = "wiretuner")]
#[command(version, about = "Export and import bounded ranges of a WireTuner document's event log", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Export `[start, end]` of a document's event log to a JSON file.
    Export {
        #[arg(long = "document-id")]
        document_id: String,

        #[arg(long)]
        start: u64,

        #[arg(long)]
        end: u64,

        #[arg(long)]
        output: PathBuf,

        /// Root directory holding the document's `events`/`snapshots` trees.
        #[arg(long, default_value = ".")]
        store_root: PathBuf,

        #[arg(long)]
        verbose: bool,
    },

    /// Import a previously exported bundle into a document.
    Import {
        #[arg(long = "document-id")]
        document_id: String,

        #[arg(long)]
        input: PathBuf,

        /// Root directory to write the document's `events`/`snapshots` trees into.
        #[arg(long, default_value = ".")]
        store_root: PathBuf,

        #[arg(long)]
        skip_validation: bool,

        #[arg(long)]
        verbose: bool,
    },
}

fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

fn init_tracing(verbose: bool) {
    let filter = if verbose { "debug" } else { "warn" };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .try_init();
}

pub fn run_export(
    document_id: String,
    start: u64,
    end: u64,
    output: PathBuf,
    store_root: PathBuf,
    verbose: bool,
) -> Result<String, String> {
    init_tracing(verbose);
    let document_id = DocumentId::from(document_id);
    let event_store =
        FileEventStore::open(store_root.join("events")).map_err(|e| e.to_string())?;
    let snapshot_store =
        SnapshotStore::open(store_root.join("snapshots")).map_err(|e| e.to_string())?;

    let bundle = export_range(&event_store, &snapshot_store, &document_id, start, end, now_millis())
        .map_err(|e| e.to_string())?;

    let json = serde_json::to_vec_pretty(&bundle).map_err(|e| e.to_string())?;
    std::fs::write(&output, json).map_err(|e| e.to_string())?;

    if verbose {
        tracing::info!(
            events = bundle.events.len(),
            has_snapshot = bundle.snapshot.is_some(),
            output = %output.display(),
            "export complete"
        );
    }
    Ok(format!(
        "exported {} events ({}..={}) to {}",
        bundle.events.len(),
        start,
        end,
        output.display()
    ))
}

pub fn run_import(
    document_id: String,
    input: PathBuf,
    store_root: PathBuf,
    skip_validation: bool,
    verbose: bool,
) -> Result<String, String> {
    init_tracing(verbose);
    let document_id = DocumentId::from(document_id);
    let event_store =
        FileEventStore::open(store_root.join("events")).map_err(|e| e.to_string())?;
    let snapshot_store =
        SnapshotStore::open(store_root.join("snapshots")).map_err(|e| e.to_string())?;

    let bytes = std::fs::read(&input).map_err(|e| e.to_string())?;
    let bundle: DebugExport = serde_json::from_slice(&bytes).map_err(|e| e.to_string())?;

    let result =
        import_bundle(&event_store, &snapshot_store, &document_id, &bundle, skip_validation)
            .map_err(|e| e.to_string())?;

    if verbose {
        tracing::info!(
            imported = result.imported_event_count,
            warnings = result.warnings.len(),
            "import complete"
        );
    }
    Ok(format!(
        "imported {} events into document {} ({} warnings)",
        result.imported_event_count,
        document_id,
        result.warnings.len()
    ))
}

pub fn dispatch(cli: Cli) -> Result<String, String> {
    match cli.command {
        Commands::Export {
            document_id,
            start,
            end,
            output,
            store_root,
            verbose,
        } => run_export(document_id, start, end, output, store_root, verbose),
        Commands::Import {
            document_id,
            input,
            store_root,
            skip_validation,
            verbose,
        } => run_import(document_id, input, store_root, skip_validation, verbose),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use wiretuner_core::event::{DraftEvent, EventPayload};

    #[test]
    fn export_then_import_round_trip_via_files() {
        let source_dir = tempdir().unwrap();
        let event_store = FileEventStore::open(source_dir.path().join("events")).unwrap();
        SnapshotStore::open(source_dir.path().join("snapshots")).unwrap();
        let document_id = DocumentId::new();
        for i in 0..10 {
            event_store
                .append(
                    DraftEvent::new(document_id.clone(), 1_000 + i, EventPayload::ClearSelection {}),
                    50,
                )
                .unwrap();
        }

        let export_file = source_dir.path().join("bundle.json");
        let summary = run_export(
            document_id.0.clone(),
            0,
            9,
            export_file.clone(),
            source_dir.path().to_path_buf(),
            false,
        )
        .unwrap();
        assert!(summary.contains("exported 10 events"));

        let target_dir = tempdir().unwrap();
        let target_document_id = DocumentId::new();
        let summary = run_import(
            target_document_id.0.clone(),
            export_file,
            target_dir.path().to_path_buf(),
            false,
            false,
        )
        .unwrap();
        assert!(summary.contains("imported 10 events"));
    }

    #[test]
    fn export_of_an_oversized_range_fails() {
        let dir = tempdir().unwrap();
        FileEventStore::open(dir.path().join("events")).unwrap();
        SnapshotStore::open(dir.path().join("snapshots")).unwrap();
        let document_id = DocumentId::new();
        let result = run_export(
            document_id.0,
            0,
            wiretuner_export::MAX_EXPORT_RANGE,
            dir.path().join("bundle.json"),
            dir.path().to_path_buf(),
            false,
        );
        assert!(result.is_err());
    }

    #[test]
    fn import_of_a_missing_file_fails() {
        let dir = tempdir().unwrap();
        let result = run_import(
            DocumentId::new().0,
            dir.path().join("missing.json"),
            dir.path().to_path_buf(),
            false,
            false,
        );
        assert!(result.is_err());
    }
}
