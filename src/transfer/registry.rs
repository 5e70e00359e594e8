use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{PorterError, Result};

use super::descriptor::TransferDescriptor;

/// Supplies descriptors to the registry while it is being built.
///
/// Applications register their own transfers by implementing this trait and
/// passing the source to [`RegistryBuilder::source`].
pub trait DescriptorSource {
    fn add_descriptors(&self, builder: &mut RegistryBuilder) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct RegistryBuilder {
    descriptors: Vec<TransferDescriptor>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, descriptor: TransferDescriptor) {
        self.descriptors.push(descriptor);
    }

    pub fn source(mut self, source: &dyn DescriptorSource) -> Result<Self> {
        source.add_descriptors(&mut self)?;
        Ok(self)
    }

    /// Validate every descriptor and freeze the catalog.
    pub fn build(self) -> Result<DescriptorRegistry> {
        let mut names = HashSet::new();
        for descriptor in &self.descriptors {
            descriptor.validate()?;
            if !names.insert(descriptor.name()) {
                return Err(PorterError::DuplicateDescriptor {
                    name: descriptor.name().to_string(),
                });
            }
        }

        debug!(count = self.descriptors.len(), "descriptor registry built");
        Ok(DescriptorRegistry {
            descriptors: self.descriptors,
        })
    }
}

/// Catalog of the transfers known to this process. Built once at startup and
/// handed to the export and import engines by reference.
#[derive(Debug)]
pub struct DescriptorRegistry {
    descriptors: Vec<TransferDescriptor>,
}

impl DescriptorRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    pub fn from_sources(sources: &[&dyn DescriptorSource]) -> Result<Self> {
        let mut builder = RegistryBuilder::new();
        for source in sources {
            source.add_descriptors(&mut builder)?;
        }
        builder.build()
    }

    /// Look up a descriptor; an unknown name is a configuration error.
    pub fn get(&self, name: &str) -> Result<&TransferDescriptor> {
        self.descriptors
            .iter()
            .find(|d| d.name() == name)
            .ok_or_else(|| PorterError::UnknownDescriptor {
                name: name.to_string(),
            })
    }

    /// Descriptors in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &TransferDescriptor> {
        self.descriptors.iter()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

/// The standard `posts` transfer.
pub struct BuiltinDescriptors;

impl DescriptorSource for BuiltinDescriptors {
    fn add_descriptors(&self, builder: &mut RegistryBuilder) -> Result<()> {
        builder.add(TransferDescriptor::new("posts", "Posts", ["post"]));
        Ok(())
    }
}

/// Descriptors read from a JSON file holding an array of descriptors.
pub struct JsonDescriptorFile {
    path: PathBuf,
}

impl JsonDescriptorFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonDescriptorFile { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DescriptorSource for JsonDescriptorFile {
    fn add_descriptors(&self, builder: &mut RegistryBuilder) -> Result<()> {
        let invalid = |reason: String| PorterError::InvalidDescriptors {
            path: self.path.clone(),
            reason,
        };

        let json = fs::read_to_string(&self.path).map_err(|e| invalid(e.to_string()))?;
        let descriptors: Vec<TransferDescriptor> =
            serde_json::from_str(&json).map_err(|e| invalid(e.to_string()))?;
        debug!(
            path = %self.path.display(),
            count = descriptors.len(),
            "loaded descriptors"
        );
        for descriptor in descriptors {
            builder.add(descriptor);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::FieldRef;
    use crate::transfer::ForeignKeyRelation;

    struct BlogDescriptors;

    impl DescriptorSource for BlogDescriptors {
        fn add_descriptors(&self, builder: &mut RegistryBuilder) -> Result<()> {
            builder.add(
                TransferDescriptor::new("blog", "Blog", ["category", "post"]).with_foreign_key(
                    ForeignKeyRelation::to_id("post", FieldRef::custom("category_id"), "category"),
                )?,
            );
            Ok(())
        }
    }

    #[test]
    fn test_builtin_posts() {
        let registry = DescriptorRegistry::from_sources(&[&BuiltinDescriptors]).unwrap();
        let posts = registry.get("posts").unwrap();
        assert_eq!(posts.caption(), "Posts");
        assert_eq!(posts.content_types(), ["post"]);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unknown_descriptor() {
        let registry = DescriptorRegistry::from_sources(&[&BuiltinDescriptors]).unwrap();
        match registry.get("pages") {
            Err(PorterError::UnknownDescriptor { name }) => assert_eq!(name, "pages"),
            other => panic!("Expected UnknownDescriptor, got {:?}", other),
        }
    }

    #[test]
    fn test_multiple_sources_keep_order() {
        let registry =
            DescriptorRegistry::from_sources(&[&BuiltinDescriptors, &BlogDescriptors]).unwrap();
        let names: Vec<&str> = registry.iter().map(TransferDescriptor::name).collect();
        assert_eq!(names, vec!["posts", "blog"]);
        assert_eq!(registry.get("blog").unwrap().foreign_keys().len(), 1);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let result = DescriptorRegistry::builder()
            .source(&BuiltinDescriptors)
            .and_then(|b| b.source(&BuiltinDescriptors))
            .and_then(RegistryBuilder::build);
        assert!(matches!(
            result,
            Err(PorterError::DuplicateDescriptor { name }) if name == "posts"
        ));
    }

    #[test]
    fn test_empty_registry() {
        let registry = DescriptorRegistry::builder().build().unwrap();
        assert!(registry.is_empty());
        assert!(registry.get("posts").is_err());
    }

    #[test]
    fn test_json_descriptor_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("descriptors.json");
        std::fs::write(
            &path,
            r#"[{
                "name": "pages",
                "caption": "Pages",
                "content_types": ["page"],
                "foreign_keys": [{
                    "origin_type": "page",
                    "origin_field": {"standard": "post_parent"},
                    "target_type": "page",
                    "target_field": {"standard": "ID"}
                }]
            }]"#,
        )
        .unwrap();

        let source = JsonDescriptorFile::new(&path);
        assert_eq!(source.path(), path.as_path());

        let registry =
            DescriptorRegistry::from_sources(&[&BuiltinDescriptors, &source]).unwrap();
        let pages = registry.get("pages").unwrap();
        assert_eq!(
            pages.foreign_keys()[0].name(),
            "page.post_parent->page.ID"
        );
    }

    #[test]
    fn test_json_descriptor_file_missing() {
        let source = JsonDescriptorFile::new("/nonexistent/descriptors.json");
        let result = DescriptorRegistry::from_sources(&[&source]);
        assert!(matches!(result, Err(PorterError::InvalidDescriptors { .. })));
    }

    #[test]
    fn test_json_descriptor_file_malformed_is_configuration_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("descriptors.json");
        std::fs::write(&path, r#"[{ "name": "pages" }]"#).unwrap();

        let err = DescriptorRegistry::from_sources(&[&JsonDescriptorFile::new(&path)]).unwrap_err();
        match &err {
            PorterError::InvalidDescriptors { path: p, .. } => assert_eq!(p, &path),
            other => panic!("Expected InvalidDescriptors, got {:?}", other),
        }
        assert_eq!(err.kind(), crate::error::ErrorKind::Configuration);
    }
}
