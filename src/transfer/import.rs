use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{PorterError, Result};
use crate::record::{Record, flatten_values, remap_key};
use crate::store::ContentStore;

use super::descriptor::TransferDescriptor;
use super::format::ExportDocument;
use super::registry::DescriptorRegistry;
use super::report::{ErrorSink, ImportReport, RecordError};

/// Uploads of this size or larger are refused.
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 500_000_000;

const ACCEPTED_EXTENSION: &str = ".json";

/// A file handed to the import, as described by whoever received it.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub size: u64,
    /// Non-zero when the upload itself failed.
    pub error_code: u32,
    pub path: PathBuf,
}

impl UploadedFile {
    /// Describe a local file from its metadata, without reading it.
    pub fn from_path(path: &Path) -> Result<Self> {
        let metadata = fs::metadata(path)?;
        Ok(UploadedFile {
            name: path
                .file_name()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default(),
            size: metadata.len(),
            error_code: 0,
            path: path.to_path_buf(),
        })
    }
}

/// Accept or refuse an upload from its name, size and error code alone.
pub fn check_upload(file: &UploadedFile, max_bytes: u64) -> Result<()> {
    if file.error_code > 0 {
        return Err(PorterError::UploadFailed {
            code: file.error_code,
        });
    }
    if !file.name.ends_with(ACCEPTED_EXTENSION) || file.size >= max_bytes {
        return Err(PorterError::InvalidUpload {
            name: file.name.clone(),
            size: file.size,
        });
    }
    Ok(())
}

fn check_transfer_type(descriptor: &TransferDescriptor, document: &ExportDocument) -> Result<()> {
    if document.transfer_type != descriptor.name() {
        return Err(PorterError::TransferTypeMismatch {
            expected: descriptor.name().to_string(),
            found: document.transfer_type.clone(),
        });
    }
    Ok(())
}

/// Pre-import to post-import values of one relation's target field.
#[derive(Debug, Default, Clone)]
pub struct RemapTable {
    entries: HashMap<String, Value>,
}

impl RemapTable {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, old: &Value) -> Option<&Value> {
        remap_key(old).and_then(|key| self.entries.get(&key))
    }

    /// Record that `old` became `new`; later entries win. Returns false when
    /// `old` cannot be used as a key.
    pub fn insert(&mut self, old: &Value, new: Value) -> bool {
        match remap_key(old) {
            Some(key) => {
                self.entries.insert(key, new);
                true
            }
            None => false,
        }
    }
}

/// Re-inserts the records of a transfer document, keeping foreign keys
/// pointed at the new identifiers.
pub struct ImportEngine<'a> {
    registry: &'a DescriptorRegistry,
    max_upload_bytes: u64,
}

impl<'a> ImportEngine<'a> {
    pub fn new(registry: &'a DescriptorRegistry) -> Self {
        ImportEngine {
            registry,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    pub fn with_max_upload_bytes(mut self, max_upload_bytes: u64) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }

    /// Validate and read an uploaded document, then import it.
    ///
    /// Unknown descriptors, refused uploads and documents for another
    /// transfer fail before the store is touched.
    pub fn import_file(
        &self,
        transfer: &str,
        file: Option<&UploadedFile>,
        store: &mut impl ContentStore,
        sink: &mut impl ErrorSink,
    ) -> Result<ImportReport> {
        let document = self.read_upload(transfer, file)?;
        self.import_document(transfer, document, store, sink)
    }

    /// Every check `import_file` makes before touching a store, returning
    /// the parsed document for `transfer`.
    pub fn read_upload(
        &self,
        transfer: &str,
        file: Option<&UploadedFile>,
    ) -> Result<ExportDocument> {
        let descriptor = self.registry.get(transfer)?;
        let file = file.ok_or(PorterError::MissingFile)?;
        check_upload(file, self.max_upload_bytes)?;

        let bytes = fs::read(&file.path)?;
        let document = ExportDocument::from_slice(&bytes)?;
        check_transfer_type(descriptor, &document)?;
        Ok(document)
    }

    pub fn import_document(
        &self,
        transfer: &str,
        document: ExportDocument,
        store: &mut impl ContentStore,
        sink: &mut impl ErrorSink,
    ) -> Result<ImportReport> {
        let descriptor = self.registry.get(transfer)?;
        Self::run(descriptor, document, store, sink)
    }

    fn run(
        descriptor: &TransferDescriptor,
        mut document: ExportDocument,
        store: &mut impl ContentStore,
        sink: &mut impl ErrorSink,
    ) -> Result<ImportReport> {
        check_transfer_type(descriptor, &document)?;

        info!(
            transfer = descriptor.name(),
            records = document.record_count(),
            "starting import"
        );

        let mut run = ImportRun::new(descriptor);
        for content_type in descriptor.content_types() {
            let Some(records) = document.data.shift_remove(content_type) else {
                warn!(content_type = %content_type, "document has no records for content type");
                continue;
            };
            for record in records {
                run.import_record(record, store, sink)?;
            }
        }

        let report = run.report;
        info!(
            transfer = descriptor.name(),
            imported = report.imported,
            failed = report.failed,
            "import finished"
        );
        Ok(report)
    }
}

/// State of one import: remap tables live exactly as long as this.
struct ImportRun<'d> {
    descriptor: &'d TransferDescriptor,
    remap: HashMap<String, RemapTable>,
    report: ImportReport,
}

impl<'d> ImportRun<'d> {
    fn new(descriptor: &'d TransferDescriptor) -> Self {
        ImportRun {
            descriptor,
            remap: HashMap::new(),
            report: ImportReport::default(),
        }
    }

    fn import_record(
        &mut self,
        mut record: Record,
        store: &mut impl ContentStore,
        sink: &mut impl ErrorSink,
    ) -> Result<()> {
        let old_id = record.id_label();
        debug!(
            record_type = %record.record_type,
            id = %old_id,
            title = record.title(),
            "importing record"
        );

        let old_targets = match self.rewrite_references(&mut record) {
            Ok(old_targets) => old_targets,
            Err(e) => {
                self.skip(&record, old_id, format!("Cannot set new foreign key ({})", e), sink);
                return Ok(());
            }
        };

        record.take_id();
        let new_id = match store.insert(&record) {
            Ok(id) => id,
            Err(PorterError::Rejected(reason)) => {
                self.skip(
                    &record,
                    old_id,
                    format!("Could not add record to the store ({})", reason),
                    sink,
                );
                return Ok(());
            }
            Err(e) => return Err(e),
        };
        record.set_id(new_id);

        for (field, values) in &record.custom_fields {
            if let Some(value) = flatten_values(values) {
                store.store_custom_field(new_id, field, &value, true)?;
            }
        }

        self.capture_remaps(&record, &old_targets)?;
        self.report.record_imported(&record.record_type);
        Ok(())
    }

    /// Point origin fields at targets already re-inserted, and remember the
    /// current target values of this record before its identifier changes.
    fn rewrite_references(&self, record: &mut Record) -> Result<HashMap<String, Value>> {
        let mut old_targets = HashMap::new();

        for key in self.descriptor.foreign_keys() {
            let name = key.name();

            if key.matches_origin(record)
                && let Some(table) = self.remap.get(&name)
                && !table.is_empty()
                && let Some(old) = key.read_origin(record)?
                && let Some(new) = table.get(&old)
            {
                debug!(relation = %name, %old, %new, "rewriting reference");
                key.write_origin(record, new.clone())?;
            }

            if key.matches_target(record)
                && let Some(old) = key.read_target(record)?
                && !old.is_null()
            {
                old_targets.insert(name, old);
            }
        }

        Ok(old_targets)
    }

    fn capture_remaps(&mut self, record: &Record, old_targets: &HashMap<String, Value>) -> Result<()> {
        for key in self.descriptor.foreign_keys() {
            if !key.matches_target(record) {
                continue;
            }
            let name = key.name();
            let Some(old) = old_targets.get(&name) else {
                continue;
            };

            let new = key.read_target(record)?.unwrap_or(Value::Null);
            if &new != old && self.remap.entry(name.clone()).or_default().insert(old, new.clone()) {
                debug!(relation = %name, %old, %new, "remapped target");
            }
        }
        Ok(())
    }

    fn skip(&mut self, record: &Record, old_id: String, reason: String, sink: &mut impl ErrorSink) {
        let error = RecordError {
            record_type: record.record_type.clone(),
            title: record.title().to_string(),
            old_id,
            reason,
        };
        debug!(%error, "record skipped");
        sink.report(&error.to_string());
        self.report.record_failed(error);
    }
}
