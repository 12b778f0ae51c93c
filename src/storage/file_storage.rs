use std::fs;
use std::path::PathBuf;

use thiserror::Error;

use super::KeyValueStore;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Data directory not found")]
    DataDirNotFound,
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// Key-value store keeping one JSON document per key
///
/// Directory structure:
/// ```text
/// {data-dir}/recall/
/// └── {key}.json
/// ```
pub struct FileStore {
    base_path: PathBuf,
}

impl FileStore {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    /// Get the default data directory
    pub fn default_data_dir() -> Result<PathBuf> {
        if let Some(dir) = std::env::var_os("PARLA_DATA_DIR") {
            return Ok(PathBuf::from(dir));
        }
        dirs::data_local_dir()
            .map(|p| p.join("parla"))
            .ok_or(StorageError::DataDirNotFound)
    }

    /// Open the recall store under a data directory, creating it if needed
    pub fn open(data_dir: PathBuf) -> Result<Self> {
        let store = Self::new(data_dir.join("recall"));
        store.init()?;
        Ok(store)
    }

    /// Initialize storage directories
    pub fn init(&self) -> Result<()> {
        fs::create_dir_all(&self.base_path)?;
        Ok(())
    }

    /// Get the file path backing a key
    ///
    /// Keys are percent-encoded, so distinct keys never share a file and
    /// path separators cannot escape the store directory.
    fn key_path(&self, key: &str) -> PathBuf {
        self.base_path.join(format!("{}.json", urlencoding::encode(key)))
    }

    /// List the keys that currently hold a value
    pub fn keys(&self) -> Result<Vec<String>> {
        if !self.base_path.exists() {
            return Ok(Vec::new());
        }

        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.base_path)? {
            let path = entry?.path();
            if path.extension().map_or(false, |ext| ext == "json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    match urlencoding::decode(stem) {
                        Ok(key) => keys.push(key.into_owned()),
                        Err(e) => log::warn!("Skipping undecodable store file {}: {}", stem, e),
                    }
                }
            }
        }

        keys.sort();
        Ok(keys)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.key_path(key);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(&path)?))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.init()?;
        fs::write(self.key_path(key), value)?;
        Ok(())
    }
}
