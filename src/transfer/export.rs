use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::{debug, info};

use crate::error::{PorterError, Result};
use crate::record::Record;
use crate::store::ContentStore;

use super::format::{ExportDocument, export_file_name};
use super::registry::DescriptorRegistry;

/// Records requested from the store per query.
pub const DEFAULT_PAGE_SIZE: usize = 20;

pub struct ExportStats {
    pub path: PathBuf,
    pub records: usize,
    pub outcome: WriteOutcome,
}

pub enum OverwriteAction {
    Overwrite,
    Skip,
    Abort,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    Skipped,
    Aborted,
}

/// Write bytes to a file, calling `on_conflict` if the file already exists.
fn write_with_conflict_check(
    path: &Path,
    bytes: &[u8],
    on_conflict: &mut impl FnMut(&Path) -> Result<OverwriteAction>,
) -> Result<WriteOutcome> {
    if path.exists() {
        match on_conflict(path)? {
            OverwriteAction::Overwrite => {
                std::fs::write(path, bytes)?;
                Ok(WriteOutcome::Written)
            }
            OverwriteAction::Skip => Ok(WriteOutcome::Skipped),
            OverwriteAction::Abort => Ok(WriteOutcome::Aborted),
        }
    } else {
        std::fs::write(path, bytes)?;
        Ok(WriteOutcome::Written)
    }
}

/// Reads every record a descriptor covers into one [`ExportDocument`].
pub struct ExportEngine<'a> {
    registry: &'a DescriptorRegistry,
    page_size: usize,
}

impl<'a> ExportEngine<'a> {
    pub fn new(registry: &'a DescriptorRegistry) -> Self {
        ExportEngine {
            registry,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Build the complete document for `transfer`. Nothing is returned until
    /// every content type has been read.
    pub fn export(&self, transfer: &str, store: &impl ContentStore) -> Result<ExportDocument> {
        let descriptor = self.registry.get(transfer)?;
        info!(transfer, "starting export");

        let mut document = ExportDocument::new(descriptor.name());
        for content_type in descriptor.content_types() {
            let records = self.records_of_type(store, content_type)?;
            debug!(content_type = %content_type, count = records.len(), "exported content type");
            document.data.insert(content_type.clone(), records);
        }

        info!(transfer, records = document.record_count(), "export finished");
        Ok(document)
    }

    fn records_of_type(&self, store: &impl ContentStore, content_type: &str) -> Result<Vec<Record>> {
        let mut records = Vec::new();
        let mut offset = 0;

        loop {
            let page = store.query(content_type, self.page_size, offset)?;
            if page.is_empty() {
                break;
            }
            debug!(content_type, offset, count = page.len(), "fetched page");

            for mut record in page {
                record.custom_fields = store.read_custom_fields(&record)?;
                records.push(record);
            }
            offset += self.page_size;
        }

        Ok(records)
    }
}

/// Write a document into `output_dir` under the conventional file name.
///
/// The `on_conflict` callback is called when the file already exists,
/// letting the caller decide whether to overwrite, skip, or abort.
pub fn write_document(
    document: &ExportDocument,
    output_dir: &Path,
    site_name: &str,
    on_conflict: &mut impl FnMut(&Path) -> Result<OverwriteAction>,
) -> Result<ExportStats> {
    let json = document.to_json_pretty()?;

    std::fs::create_dir_all(output_dir).map_err(|e| {
        PorterError::Export(format!(
            "Failed to create directory {}: {}",
            output_dir.display(),
            e
        ))
    })?;

    let file_name = export_file_name(
        site_name,
        &document.transfer_type,
        Local::now().date_naive(),
    );
    let path = output_dir.join(file_name);
    let outcome = write_with_conflict_check(&path, json.as_bytes(), on_conflict)?;
    info!(path = %path.display(), ?outcome, "export document written");

    Ok(ExportStats {
        path,
        records: document.record_count(),
        outcome,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::CustomFields;
    use crate::store::SqliteStore;
    use crate::transfer::registry::BuiltinDescriptors;
    use serde_json::{Value, json};
    use std::cell::Cell;

    fn seed_posts(store: &mut SqliteStore, count: usize) {
        for i in 0..count {
            let id = store
                .insert(&Record::new("post").with_field("post_title", format!("Post {}", i)))
                .unwrap();
            store
                .store_custom_field(id, "position", &json!(i.to_string()), true)
                .unwrap();
        }
    }

    fn registry() -> DescriptorRegistry {
        DescriptorRegistry::from_sources(&[&BuiltinDescriptors]).unwrap()
    }

    /// Counts how often the store is queried.
    struct CountingStore<'s> {
        inner: &'s SqliteStore,
        queries: Cell<usize>,
    }

    impl ContentStore for CountingStore<'_> {
        fn query(&self, content_type: &str, limit: usize, offset: usize) -> Result<Vec<Record>> {
            self.queries.set(self.queries.get() + 1);
            assert_eq!(limit, DEFAULT_PAGE_SIZE);
            self.inner.query(content_type, limit, offset)
        }

        fn read_custom_fields(&self, record: &Record) -> Result<CustomFields> {
            self.inner.read_custom_fields(record)
        }

        fn insert(&mut self, _record: &Record) -> Result<i64> {
            unreachable!("export never inserts")
        }

        fn store_custom_field(&mut self, _: i64, _: &str, _: &Value, _: bool) -> Result<bool> {
            unreachable!("export never writes custom fields")
        }
    }

    #[test]
    fn test_paged_export_matches_unbounded_read() {
        let registry = registry();
        for count in [0, 1, 19, 20, 21, 45] {
            let mut store = SqliteStore::open_in_memory().unwrap();
            seed_posts(&mut store, count);

            let counting = CountingStore {
                inner: &store,
                queries: Cell::new(0),
            };
            let doc = ExportEngine::new(&registry).export("posts", &counting).unwrap();

            let exported: Vec<&Value> = doc
                .records("post")
                .iter()
                .filter_map(Record::id)
                .collect();
            let all = store.load_all("post").unwrap();
            let expected: Vec<&Value> = all.iter().filter_map(Record::id).collect();
            assert_eq!(exported, expected, "count {}", count);

            // one query per full or partial page, plus the empty one that ends the loop
            let pages = count.div_ceil(DEFAULT_PAGE_SIZE);
            assert_eq!(counting.queries.get(), pages + 1);
        }
    }

    #[test]
    fn test_export_attaches_custom_fields() {
        let registry = registry();
        let mut store = SqliteStore::open_in_memory().unwrap();
        seed_posts(&mut store, 2);

        let doc = ExportEngine::new(&registry).export("posts", &store).unwrap();
        assert_eq!(doc.transfer_type, "posts");
        assert_eq!(doc.data.keys().collect::<Vec<_>>(), vec!["post"]);
        assert_eq!(doc.records("post")[1].custom_fields["position"], vec![json!("1")]);
    }

    #[test]
    fn test_small_page_size() {
        let registry = registry();
        let mut store = SqliteStore::open_in_memory().unwrap();
        seed_posts(&mut store, 7);

        let doc = ExportEngine::new(&registry)
            .with_page_size(3)
            .export("posts", &store)
            .unwrap();
        let titles: Vec<&str> = doc.records("post").iter().map(Record::title).collect();
        assert_eq!(titles.len(), 7);
        assert_eq!(titles[0], "Post 0");
        assert_eq!(titles[6], "Post 6");
    }

    #[test]
    fn test_unknown_descriptor() {
        let registry = registry();
        let store = SqliteStore::open_in_memory().unwrap();
        let result = ExportEngine::new(&registry).export("pages", &store);
        assert!(matches!(result, Err(PorterError::UnknownDescriptor { .. })));
    }

    #[test]
    fn test_write_document_and_conflicts() {
        let temp_dir = tempfile::tempdir().unwrap();
        let out = temp_dir.path().join("exports");
        let doc = ExportDocument::new("posts");

        let mut never = |_: &Path| -> Result<OverwriteAction> { panic!("no conflict expected") };
        let stats = write_document(&doc, &out, "My Site", &mut never).unwrap();
        assert_eq!(stats.outcome, WriteOutcome::Written);
        let name = stats.path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("MySite-posts-"));
        assert!(name.ends_with(".json"));

        let written = std::fs::read_to_string(&stats.path).unwrap();
        assert_eq!(ExportDocument::from_json(&written).unwrap(), doc);

        let mut skip = |_: &Path| Ok(OverwriteAction::Skip);
        let stats = write_document(&doc, &out, "My Site", &mut skip).unwrap();
        assert_eq!(stats.outcome, WriteOutcome::Skipped);

        let mut abort = |_: &Path| Ok(OverwriteAction::Abort);
        let stats = write_document(&doc, &out, "My Site", &mut abort).unwrap();
        assert_eq!(stats.outcome, WriteOutcome::Aborted);

        let mut overwrite = |_: &Path| Ok(OverwriteAction::Overwrite);
        let stats = write_document(&doc, &out, "My Site", &mut overwrite).unwrap();
        assert_eq!(stats.outcome, WriteOutcome::Written);
    }
}
