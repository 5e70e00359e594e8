use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use super::value::flatten_values;

/// Standard field holding the store-assigned identifier.
pub const ID_FIELD: &str = "ID";
pub const TITLE_FIELD: &str = "post_title";

/// Custom (metadata) fields: every key may carry several values.
pub type CustomFields = BTreeMap<String, Vec<Value>>;

/// Reference to one field of a record, either a structural field or a
/// custom metadata field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldRef {
    Standard(String),
    Custom(String),
}

impl FieldRef {
    pub fn standard(name: impl Into<String>) -> Self {
        FieldRef::Standard(name.into())
    }

    pub fn custom(name: impl Into<String>) -> Self {
        FieldRef::Custom(name.into())
    }

    /// The identifier field.
    pub fn id() -> Self {
        FieldRef::Standard(ID_FIELD.to_string())
    }

    pub fn name(&self) -> &str {
        match self {
            FieldRef::Standard(name) | FieldRef::Custom(name) => name,
        }
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A content record as it travels through a transfer.
///
/// Serialized as a flat JSON object: the type under `post_type`, every
/// standard field at top level, and custom fields under `__custom_fields`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "post_type")]
    pub record_type: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
    #[serde(
        rename = "__custom_fields",
        default,
        deserialize_with = "deserialize_custom_fields"
    )]
    pub custom_fields: CustomFields,
}

impl Record {
    pub fn new(record_type: impl Into<String>) -> Self {
        Record {
            record_type: record_type.into(),
            fields: Map::new(),
            custom_fields: CustomFields::new(),
        }
    }

    pub fn with_field(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(name.to_string(), value.into());
        self
    }

    pub fn with_custom(mut self, name: &str, values: Vec<Value>) -> Self {
        self.custom_fields.insert(name.to_string(), values);
        self
    }

    pub fn id(&self) -> Option<&Value> {
        self.fields.get(ID_FIELD)
    }

    /// Identifier rendered for messages; `-` when the record has none.
    pub fn id_label(&self) -> String {
        match self.id() {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => "-".to_string(),
        }
    }

    pub fn title(&self) -> &str {
        self.fields
            .get(TITLE_FIELD)
            .and_then(Value::as_str)
            .unwrap_or("")
    }

    /// Remove and return the identifier, keeping the order of the other fields.
    pub fn take_id(&mut self) -> Option<Value> {
        self.fields.shift_remove(ID_FIELD)
    }

    pub fn set_id(&mut self, id: i64) {
        self.fields.insert(ID_FIELD.to_string(), Value::from(id));
    }

    /// Read a field. A custom field with a single value reads as that value,
    /// one with several values reads as an array.
    pub fn get(&self, field: &FieldRef) -> Option<Value> {
        match field {
            FieldRef::Standard(name) => self.fields.get(name).cloned(),
            FieldRef::Custom(name) => self
                .custom_fields
                .get(name)
                .and_then(|values| flatten_values(values)),
        }
    }

    pub fn set(&mut self, field: &FieldRef, value: Value) {
        match field {
            FieldRef::Standard(name) => {
                self.fields.insert(name.clone(), value);
            }
            FieldRef::Custom(name) => {
                self.custom_fields.insert(name.clone(), vec![value]);
            }
        }
    }
}

/// Accepts an object of field -> values, a bare scalar per field, or the
/// empty array older exporters wrote for records without metadata.
fn deserialize_custom_fields<'de, D>(deserializer: D) -> Result<CustomFields, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Fields(BTreeMap<String, Value>),
        List(Vec<Value>),
    }

    match Option::<Repr>::deserialize(deserializer)? {
        None => Ok(CustomFields::new()),
        Some(Repr::Fields(map)) => Ok(map
            .into_iter()
            .map(|(field, value)| match value {
                Value::Array(values) => (field, values),
                other => (field, vec![other]),
            })
            .collect()),
        Some(Repr::List(values)) if values.is_empty() => Ok(CustomFields::new()),
        Some(Repr::List(_)) => Err(serde::de::Error::custom(
            "__custom_fields must be an object",
        )),
    }
}
