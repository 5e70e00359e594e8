use std::path::PathBuf;
use thiserror::Error;

/// Broad class of a failure, used by callers that only need to know
/// whether a run was refused up front or died in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Upload,
    Format,
    Record,
    Store,
}

#[derive(Error, Debug)]
pub enum PorterError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] rusqlite_migration::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown transfer descriptor: {name}")]
    UnknownDescriptor { name: String },

    #[error("Transfer descriptor registered twice: {name}")]
    DuplicateDescriptor { name: String },

    #[error("Foreign key {relation} declared twice in descriptor {descriptor}")]
    DuplicateForeignKey { descriptor: String, relation: String },

    #[error("Invalid settings file {}: {reason}", path.display())]
    InvalidSettings { path: PathBuf, reason: String },

    #[error("Invalid descriptor file {}: {reason}", path.display())]
    InvalidDescriptors { path: PathBuf, reason: String },

    #[error("Transfer file not defined")]
    MissingFile,

    #[error("Could not upload file: {code}")]
    UploadFailed { code: u32 },

    #[error("Invalid file or file size too big: {name} ({size} bytes)")]
    InvalidUpload { name: String, size: u64 },

    #[error("File does not contain data for chosen transfer type (expected {expected}, found {found})")]
    TransferTypeMismatch { expected: String, found: String },

    #[error("Malformed transfer document: {0}")]
    MalformedDocument(String),

    #[error("Foreign key {relation} expects {expected} records, got {actual}")]
    TypeMismatch {
        relation: String,
        expected: String,
        actual: String,
    },

    #[error("Record rejected by store: {0}")]
    Rejected(String),

    #[error("Export error: {0}")]
    Export(String),
}

impl PorterError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PorterError::UnknownDescriptor { .. }
            | PorterError::DuplicateDescriptor { .. }
            | PorterError::DuplicateForeignKey { .. }
            | PorterError::InvalidSettings { .. }
            | PorterError::InvalidDescriptors { .. } => ErrorKind::Configuration,
            PorterError::MissingFile
            | PorterError::UploadFailed { .. }
            | PorterError::InvalidUpload { .. } => ErrorKind::Upload,
            PorterError::TransferTypeMismatch { .. } | PorterError::MalformedDocument(_) => {
                ErrorKind::Format
            }
            PorterError::TypeMismatch { .. } | PorterError::Rejected(_) => ErrorKind::Record,
            PorterError::Io(_)
            | PorterError::Database(_)
            | PorterError::Migration(_)
            | PorterError::Json(_)
            | PorterError::Export(_) => ErrorKind::Store,
        }
    }
}

pub type Result<T> = std::result::Result<T, PorterError>;
