pub mod schema;
pub mod sqlite;

use serde_json::Value;

use crate::error::Result;
use crate::record::{CustomFields, Record};

pub use schema::run_migrations;
pub use sqlite::SqliteStore;

/// The content store a transfer reads from and writes to.
///
/// `insert` signals a record the store refuses to take with
/// [`PorterError::Rejected`](crate::error::PorterError::Rejected); any other
/// error means the store itself is unusable.
pub trait ContentStore {
    /// One page of records of `content_type`, in identifier order.
    fn query(&self, content_type: &str, limit: usize, offset: usize) -> Result<Vec<Record>>;

    fn read_custom_fields(&self, record: &Record) -> Result<CustomFields>;

    /// Insert a record (its identifier, if any, is ignored) and return the new id.
    fn insert(&mut self, record: &Record) -> Result<i64>;

    /// Attach a custom field value to record `id`. With `unique` set, an
    /// existing value for `field` wins and `false` is returned.
    fn store_custom_field(
        &mut self,
        id: i64,
        field: &str,
        value: &Value,
        unique: bool,
    ) -> Result<bool>;
}
