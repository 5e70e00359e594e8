//! Descriptor-driven export and import of content records.

pub mod descriptor;
pub mod export;
pub mod format;
pub mod import;
pub mod registry;
pub mod relation;
pub mod report;

pub use descriptor::TransferDescriptor;
pub use export::{
    DEFAULT_PAGE_SIZE, ExportEngine, ExportStats, OverwriteAction, WriteOutcome, write_document,
};
pub use format::{ExportDocument, export_file_name};
pub use import::{DEFAULT_MAX_UPLOAD_BYTES, ImportEngine, RemapTable, UploadedFile, check_upload};
pub use registry::{
    BuiltinDescriptors, DescriptorRegistry, DescriptorSource, JsonDescriptorFile, RegistryBuilder,
};
pub use relation::ForeignKeyRelation;
pub use report::{ErrorSink, ImportReport, LogSink, RecordError};
