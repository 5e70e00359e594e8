use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{PorterError, Result};
use crate::record::{FieldRef, Record};

/// A foreign key between two record types, which may be the same type.
///
/// In most cases it connects a custom field of the origin record to the
/// identifier of the target record. The relation knows which field on each
/// side participates and whether it is a standard or a custom field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyRelation {
    pub origin_type: String,
    pub origin_field: FieldRef,
    pub target_type: String,
    pub target_field: FieldRef,
}

#[derive(Clone, Copy)]
enum Side {
    Origin,
    Target,
}

impl ForeignKeyRelation {
    pub fn new(
        origin_type: impl Into<String>,
        origin_field: FieldRef,
        target_type: impl Into<String>,
        target_field: FieldRef,
    ) -> Self {
        ForeignKeyRelation {
            origin_type: origin_type.into(),
            origin_field,
            target_type: target_type.into(),
            target_field,
        }
    }

    /// Relation from `origin_field` to the identifier of `target_type`.
    pub fn to_id(
        origin_type: impl Into<String>,
        origin_field: FieldRef,
        target_type: impl Into<String>,
    ) -> Self {
        Self::new(origin_type, origin_field, target_type, FieldRef::id())
    }

    /// `origin_type.origin_field->target_type.target_field`; unique within a
    /// descriptor and used to key remap tables.
    pub fn name(&self) -> String {
        format!(
            "{}.{}->{}.{}",
            self.origin_type, self.origin_field, self.target_type, self.target_field
        )
    }

    pub fn matches_origin(&self, record: &Record) -> bool {
        record.record_type == self.origin_type
    }

    pub fn matches_target(&self, record: &Record) -> bool {
        record.record_type == self.target_type
    }

    pub fn read_origin(&self, record: &Record) -> Result<Option<Value>> {
        self.read(Side::Origin, record)
    }

    pub fn read_target(&self, record: &Record) -> Result<Option<Value>> {
        self.read(Side::Target, record)
    }

    pub fn write_origin(&self, record: &mut Record, value: Value) -> Result<()> {
        self.write(Side::Origin, record, value)
    }

    pub fn write_target(&self, record: &mut Record, value: Value) -> Result<()> {
        self.write(Side::Target, record, value)
    }

    fn endpoint(&self, side: Side) -> (&str, &FieldRef) {
        match side {
            Side::Origin => (self.origin_type.as_str(), &self.origin_field),
            Side::Target => (self.target_type.as_str(), &self.target_field),
        }
    }

    fn check_type(&self, expected: &str, record: &Record) -> Result<()> {
        if record.record_type == expected {
            Ok(())
        } else {
            Err(PorterError::TypeMismatch {
                relation: self.name(),
                expected: expected.to_string(),
                actual: record.record_type.clone(),
            })
        }
    }

    fn read(&self, side: Side, record: &Record) -> Result<Option<Value>> {
        let (record_type, field) = self.endpoint(side);
        self.check_type(record_type, record)?;
        Ok(record.get(field))
    }

    fn write(&self, side: Side, record: &mut Record, value: Value) -> Result<()> {
        let (record_type, field) = self.endpoint(side);
        self.check_type(record_type, record)?;
        record.set(field, value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn category_key() -> ForeignKeyRelation {
        ForeignKeyRelation::to_id("post", FieldRef::custom("category_id"), "category")
    }

    #[test]
    fn test_name() {
        assert_eq!(category_key().name(), "post.category_id->category.ID");

        let parent = ForeignKeyRelation::new(
            "page",
            FieldRef::standard("post_parent"),
            "page",
            FieldRef::custom("legacy_id"),
        );
        assert_eq!(parent.name(), "page.post_parent->page.legacy_id");
    }

    #[test]
    fn test_matches() {
        let key = category_key();
        let post = Record::new("post");
        let category = Record::new("category");

        assert!(key.matches_origin(&post));
        assert!(!key.matches_target(&post));
        assert!(key.matches_target(&category));
        assert!(!key.matches_origin(&category));
    }

    #[test]
    fn test_read_routes_by_field_kind() {
        let key = category_key();
        let post = Record::new("post").with_custom("category_id", vec![json!("5")]);
        let category = Record::new("category").with_field("ID", 5);

        assert_eq!(key.read_origin(&post).unwrap(), Some(json!("5")));
        assert_eq!(key.read_target(&category).unwrap(), Some(json!(5)));
    }

    #[test]
    fn test_read_missing_field() {
        let key = category_key();
        let post = Record::new("post");
        assert_eq!(key.read_origin(&post).unwrap(), None);
    }

    #[test]
    fn test_read_wrong_type_fails() {
        let key = category_key();
        let page = Record::new("page");

        match key.read_origin(&page) {
            Err(PorterError::TypeMismatch {
                expected, actual, ..
            }) => {
                assert_eq!(expected, "post");
                assert_eq!(actual, "page");
            }
            other => panic!("Expected TypeMismatch, got {:?}", other),
        }
        assert!(key.read_target(&page).is_err());
    }

    #[test]
    fn test_write() {
        let key = category_key();
        let mut post = Record::new("post").with_custom("category_id", vec![json!("5")]);
        key.write_origin(&mut post, json!(205)).unwrap();
        assert_eq!(post.custom_fields["category_id"], vec![json!(205)]);

        let mut category = Record::new("category").with_field("ID", 5);
        key.write_target(&mut category, json!(205)).unwrap();
        assert_eq!(category.id(), Some(&json!(205)));
    }

    #[test]
    fn test_write_wrong_type_leaves_record_untouched() {
        let key = category_key();
        let mut category = Record::new("category").with_field("ID", 5);
        assert!(key.write_origin(&mut category, json!(1)).is_err());
        assert!(category.custom_fields.is_empty());
    }

    #[test]
    fn test_serde_layout() {
        let value = serde_json::to_value(category_key()).unwrap();
        assert_eq!(
            value,
            json!({
                "origin_type": "post",
                "origin_field": { "custom": "category_id" },
                "target_type": "category",
                "target_field": { "standard": "ID" }
            })
        );
    }
}
