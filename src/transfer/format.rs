use chrono::{Local, NaiveDate};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{PorterError, Result};
use crate::record::Record;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// The portable transfer document. `data` keeps content types in the order
/// they were exported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportDocument {
    #[serde(rename = "type")]
    pub transfer_type: String,
    pub timestamp: String,
    pub data: IndexMap<String, Vec<Record>>,
}

impl ExportDocument {
    /// An empty document stamped with the current local time.
    pub fn new(transfer_type: impl Into<String>) -> Self {
        ExportDocument {
            transfer_type: transfer_type.into(),
            timestamp: Local::now().format(TIMESTAMP_FORMAT).to_string(),
            data: IndexMap::new(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Self::from_slice(json.as_bytes())
    }

    /// Parse raw file content; invalid UTF-8 is malformed like any other
    /// bad input.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| PorterError::MalformedDocument(e.to_string()))
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Records of one content type; empty when the document has none.
    pub fn records(&self, content_type: &str) -> &[Record] {
        self.data
            .get(content_type)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn record_count(&self) -> usize {
        self.data.values().map(Vec::len).sum()
    }
}

/// `<site>-<transfer>-<YYYY-MM-DD>.json`, with spaces dropped from the site name.
pub fn export_file_name(site_name: &str, transfer: &str, date: NaiveDate) -> String {
    let site: String = site_name.chars().filter(|c| *c != ' ').collect();
    format!("{}-{}-{}.json", site, transfer, date.format("%Y-%m-%d"))
}
