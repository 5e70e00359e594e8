use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PorterError, Result};
use crate::transfer::{DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_PAGE_SIZE};

const SETTINGS_FILE: &str = "settings.json";

/// Runtime settings. Every field may be left out of the settings file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub db_path: PathBuf,
    pub export_dir: PathBuf,
    /// Extra transfer descriptors, as a JSON array.
    pub descriptors_file: Option<PathBuf>,
    /// Used as the first part of export file names.
    pub site_name: String,
    pub page_size: usize,
    pub max_upload_bytes: u64,
}

impl Default for Settings {
    fn default() -> Self {
        let (db_path, export_dir) = match ProjectDirs::from("", "", "porter") {
            Some(proj_dirs) => {
                let data_dir = proj_dirs.data_dir();
                (data_dir.join("porter.db"), data_dir.join("exports"))
            }
            None => (PathBuf::from("porter.db"), PathBuf::from("exports")),
        };

        Settings {
            db_path,
            export_dir,
            descriptors_file: None,
            site_name: "porter".to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl Settings {
    /// Location of the settings file in the user's config directory.
    pub fn settings_file() -> Option<PathBuf> {
        let proj_dirs = ProjectDirs::from("", "", "porter")?;
        Some(proj_dirs.config_dir().join(SETTINGS_FILE))
    }

    pub fn load(path: &Path) -> Result<Settings> {
        let invalid = |reason: String| PorterError::InvalidSettings {
            path: path.to_path_buf(),
            reason,
        };

        let json = fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
        let settings: Settings = serde_json::from_str(&json).map_err(|e| invalid(e.to_string()))?;
        if settings.page_size == 0 {
            return Err(invalid("page_size must be at least 1".to_string()));
        }

        debug!(path = %path.display(), "loaded settings");
        Ok(settings)
    }

    /// Load `path` if given, else the default settings file if it exists,
    /// else the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Settings> {
        if let Some(path) = path {
            return Settings::load(path);
        }
        match Settings::settings_file() {
            Some(default_path) if default_path.exists() => Settings::load(&default_path),
            _ => Ok(Settings::default()),
        }
    }

    pub fn ensure_dirs_exist(&self) -> std::io::Result<()> {
        if let Some(parent) = self.db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        fs::create_dir_all(&self.export_dir)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.page_size, 20);
        assert_eq!(settings.max_upload_bytes, 500_000_000);
        assert!(settings.descriptors_file.is_none());
        assert!(settings.db_path.ends_with("porter.db"));
    }

    #[test]
    fn test_load_partial_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("settings.json");
        fs::write(&path, r#"{ "site_name": "My Blog", "page_size": 5 }"#).unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.site_name, "My Blog");
        assert_eq!(settings.page_size, 5);
        assert_eq!(settings.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
    }

    #[test]
    fn test_load_invalid_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("settings.json");
        fs::write(&path, r#"{ "page_size": "many" }"#).unwrap();

        match Settings::load(&path) {
            Err(PorterError::InvalidSettings { path: p, .. }) => assert_eq!(p, path),
            other => panic!("Expected InvalidSettings, got {:?}", other),
        }

        fs::write(&path, r#"{ "page_size": 0 }"#).unwrap();
        assert!(matches!(
            Settings::load(&path),
            Err(PorterError::InvalidSettings { .. })
        ));
    }

    #[test]
    fn test_explicit_missing_file_fails() {
        let result = Settings::load_or_default(Some(Path::new("/nonexistent/settings.json")));
        assert!(matches!(result, Err(PorterError::InvalidSettings { .. })));
    }

    #[test]
    fn test_ensure_dirs_exist() {
        let temp_dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            db_path: temp_dir.path().join("data").join("porter.db"),
            export_dir: temp_dir.path().join("exports"),
            ..Settings::default()
        };

        settings.ensure_dirs_exist().unwrap();
        assert!(temp_dir.path().join("data").is_dir());
        assert!(settings.export_dir.is_dir());
    }
}
