use std::collections::BTreeMap;

use thiserror::Error;
use tracing::warn;

/// A record the import had to skip. The run goes on without it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}: {record_type} \"{title}\" (Id: {old_id}) ignored")]
pub struct RecordError {
    pub record_type: String,
    pub title: String,
    pub old_id: String,
    pub reason: String,
}

/// Receives human-readable messages about problems during a run.
pub trait ErrorSink {
    fn report(&mut self, message: &str);
}

impl ErrorSink for Vec<String> {
    fn report(&mut self, message: &str) {
        self.push(message.to_string());
    }
}

/// Forwards messages to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl ErrorSink for LogSink {
    fn report(&mut self, message: &str) {
        warn!("{}", message);
    }
}

/// Outcome of an import run.
#[derive(Debug, Default, Clone)]
pub struct ImportReport {
    pub imported: usize,
    pub failed: usize,
    pub imported_by_type: BTreeMap<String, usize>,
    pub errors: Vec<RecordError>,
}

impl ImportReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    pub(crate) fn record_imported(&mut self, record_type: &str) {
        self.imported += 1;
        *self
            .imported_by_type
            .entry(record_type.to_string())
            .or_default() += 1;
    }

    pub(crate) fn record_failed(&mut self, error: RecordError) {
        self.failed += 1;
        self.errors.push(error);
    }
}
