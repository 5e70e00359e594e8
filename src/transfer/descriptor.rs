use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{PorterError, Result};

use super::relation::ForeignKeyRelation;

/// Describes one transfer: which content types it carries, in which order,
/// and which foreign keys must survive re-insertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferDescriptor {
    name: String,
    caption: String,
    content_types: Vec<String>,
    #[serde(default)]
    foreign_keys: Vec<ForeignKeyRelation>,
}

impl TransferDescriptor {
    pub fn new<I, S>(name: impl Into<String>, caption: impl Into<String>, content_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        TransferDescriptor {
            name: name.into(),
            caption: caption.into(),
            content_types: content_types.into_iter().map(Into::into).collect(),
            foreign_keys: Vec::new(),
        }
    }

    pub fn with_foreign_key(mut self, key: ForeignKeyRelation) -> Result<Self> {
        let relation = key.name();
        if self.foreign_keys.iter().any(|k| k.name() == relation) {
            return Err(PorterError::DuplicateForeignKey {
                descriptor: self.name,
                relation,
            });
        }
        self.foreign_keys.push(key);
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn caption(&self) -> &str {
        &self.caption
    }

    /// Content types in processing order.
    pub fn content_types(&self) -> &[String] {
        &self.content_types
    }

    pub fn foreign_keys(&self) -> &[ForeignKeyRelation] {
        &self.foreign_keys
    }

    /// Check invariants that deserialization cannot enforce.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for key in &self.foreign_keys {
            let relation = key.name();
            if !seen.insert(relation.clone()) {
                return Err(PorterError::DuplicateForeignKey {
                    descriptor: self.name.clone(),
                    relation,
                });
            }
        }
        Ok(())
    }
}
