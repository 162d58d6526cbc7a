use thiserror::Error;

/// Every distinct failure kind the engine surfaces, across storage,
/// integrity, schema, and live-application errors.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("storage full")]
    StorageFull,

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("file already exists: {0}")]
    FileExists(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("corrupt snapshot at sequence {sequence}: {reason}")]
    CorruptSnapshot { sequence: u64, reason: String },

    #[error("corrupt event at sequence {sequence}: {reason}")]
    CorruptEvent { sequence: u64, reason: String },

    #[error("corrupt store: {0}")]
    CorruptStore(String),

    #[error("schema version mismatch: document is v{found}, engine supports up to v{supported}")]
    VersionMismatch { found: u32, supported: u32 },

    #[error("migration failed from v{from} to v{to}: {reason}")]
    MigrationFailed { from: u32, to: u32, reason: String },

    #[error("invariant violated ({kind}) at {at}")]
    InvariantViolated { kind: String, at: String },

    #[error("replay failed at sequence {at_sequence}")]
    ReplayFailed { at_sequence: u64 },

    #[error("storage degraded: {0}")]
    StorageDegraded(String),

    #[error("schema validation failed on field `{field}`: {reason}")]
    SchemaValidation { field: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
