use directories::ProjectDirs;
use pdf_editor_core::EditorConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_SCHEMA_VERSION: u32 = 1;
const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("unable to resolve local data directory")]
    NoDataDirectory,
    #[error("unsupported config schema version {0}")]
    UnsupportedVersion(u32),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct Storage {
    root: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConfigEnvelope {
    version: u32,
    config: EditorConfig,
}

impl Storage {
    pub fn from_default_project() -> Result<Self, StorageError> {
        let dirs = ProjectDirs::from("dev", "PdfEditor", "PdfEditor")
            .ok_or(StorageError::NoDataDirectory)?;

        Ok(Self { root: dirs.config_dir().to_path_buf() })
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join(CONFIG_FILE_NAME)
    }

    /// Loads the stored config, or defaults when nothing has been saved yet.
    pub fn load_config(&self) -> Result<EditorConfig, StorageError> {
        let path = self.config_path();
        if !path.exists() {
            log::debug!("no config at {}, using defaults", path.display());
            return Ok(EditorConfig::default());
        }

        load_config_file(&path)
    }

    pub fn save_config(&self, config: &EditorConfig) -> Result<(), StorageError> {
        fs::create_dir_all(&self.root)?;

        let envelope = ConfigEnvelope { version: CONFIG_SCHEMA_VERSION, config: config.clone() };

        let bytes = serde_json::to_vec_pretty(&envelope)?;
        fs::write(self.config_path(), bytes)?;
        Ok(())
    }
}

/// Reads a config envelope from an explicit path.
pub fn load_config_file(path: &Path) -> Result<EditorConfig, StorageError> {
    let bytes = fs::read(path)?;
    let envelope: ConfigEnvelope = serde_json::from_slice(&bytes)?;

    if envelope.version > CONFIG_SCHEMA_VERSION {
        return Err(StorageError::UnsupportedVersion(envelope.version));
    }

    log::debug!("loaded config from {}", path.display());
    Ok(envelope.config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use doc_model::ViewMode;

    #[test]
    fn config_round_trip() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let store = Storage::with_root(temp.path().join("nested"));

        let config = EditorConfig::default()
            .with_commit_before_reorder(true)
            .with_default_view_mode(ViewMode::SinglePage)
            .with_lazy_margin_px(250.0);

        store.save_config(&config).expect("save should succeed");
        let loaded = store.load_config().expect("load should succeed");

        assert_eq!(loaded, config);
    }

    #[test]
    fn load_defaults_when_file_absent() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let store = Storage::with_root(temp.path());

        let loaded = store.load_config().expect("load should succeed");
        assert_eq!(loaded, EditorConfig::default());
    }

    #[test]
    fn partial_config_keeps_defaults_for_missing_fields() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let path = temp.path().join("custom.json");
        fs::write(&path, r#"{ "version": 1, "config": { "rotation_step": 270 } }"#)
            .expect("write should succeed");

        let loaded = load_config_file(&path).expect("load should succeed");

        assert_eq!(loaded.rotation_step, 270);
        assert!(!loaded.commit_before_reorder);
    }

    #[test]
    fn newer_schema_is_rejected() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let store = Storage::with_root(temp.path());
        fs::write(store.config_path(), r#"{ "version": 9, "config": {} }"#)
            .expect("write should succeed");

        let err = store.load_config().expect_err("load should fail");
        assert!(matches!(err, StorageError::UnsupportedVersion(9)));
    }
}
