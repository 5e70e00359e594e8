pub mod types;
pub mod value;

pub use types::{CustomFields, FieldRef, ID_FIELD, Record, TITLE_FIELD};
pub use value::{flatten_values, parse_record_id, remap_key};
