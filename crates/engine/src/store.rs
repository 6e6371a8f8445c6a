//! High score persistence
//!
//! One number survives between runs: the best score. It lives in a small
//! JSON file:
//!
//! ```json
//! { "version": 1, "high_score": 42 }
//! ```
//!
//! A missing file reads as 0. Callers treat every other failure as
//! recoverable.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

pub const HIGH_SCORE_VERSION: u32 = 1;

const PATH_ENV: &str = "STACKER_HIGHSCORE_PATH";
const APP_DIR: &str = "tui-stacker";
const FILE_NAME: &str = "highscore.json";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unsupported high score version: {0}")]
    InvalidVersion(u32),

    #[error("No data directory available")]
    NoDataDir,
}

pub trait HighScoreStore {
    /// Stored best score; 0 when nothing was saved yet.
    fn load(&mut self) -> Result<u32, StoreError>;

    fn save(&mut self, high_score: u32) -> Result<(), StoreError>;
}

impl<T: HighScoreStore + ?Sized> HighScoreStore for Box<T> {
    fn load(&mut self) -> Result<u32, StoreError> {
        (**self).load()
    }

    fn save(&mut self, high_score: u32) -> Result<(), StoreError> {
        (**self).save(high_score)
    }
}

/// In-process store. Nothing survives the process.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    high_score: u32,
    saves: u32,
}

impl MemoryStore {
    pub fn new(high_score: u32) -> Self {
        Self {
            high_score,
            saves: 0,
        }
    }

    pub fn value(&self) -> u32 {
        self.high_score
    }

    /// Number of successful `save` calls.
    pub fn saves(&self) -> u32 {
        self.saves
    }
}

impl HighScoreStore for MemoryStore {
    fn load(&mut self) -> Result<u32, StoreError> {
        Ok(self.high_score)
    }

    fn save(&mut self, high_score: u32) -> Result<(), StoreError> {
        self.high_score = high_score;
        self.saves += 1;
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct HighScoreFile {
    version: u32,
    high_score: u32,
}

#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// `STACKER_HIGHSCORE_PATH`, falling back to the platform data directory.
    pub fn from_env() -> Result<Self, StoreError> {
        if let Ok(path) = std::env::var(PATH_ENV) {
            if !path.trim().is_empty() {
                return Ok(Self::new(path));
            }
        }
        Self::default_path().map(Self::new)
    }

    /// `<data_dir>/tui-stacker/highscore.json`
    pub fn default_path() -> Result<PathBuf, StoreError> {
        let dir = dirs::data_dir().ok_or(StoreError::NoDataDir)?;
        Ok(dir.join(APP_DIR).join(FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl HighScoreStore for JsonFileStore {
    fn load(&mut self) -> Result<u32, StoreError> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "no high score file yet");
            return Ok(0);
        }

        let json = fs::read_to_string(&self.path)?;
        let file: HighScoreFile = serde_json::from_str(&json)?;
        if file.version > HIGH_SCORE_VERSION {
            return Err(StoreError::InvalidVersion(file.version));
        }
        Ok(file.high_score)
    }

    fn save(&mut self, high_score: u32) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string_pretty(&HighScoreFile {
            version: HIGH_SCORE_VERSION,
            high_score,
        })?;

        // Write then rename; readers never see a partial file.
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;

        info!(path = %self.path.display(), high_score, "high score saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "tui-stacker-store-{}-{}",
            name,
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_memory_store() {
        let mut store = MemoryStore::new(3);
        assert_eq!(store.load().unwrap(), 3);
        store.save(9).unwrap();
        assert_eq!(store.load().unwrap(), 9);
        assert_eq!(store.saves(), 1);
    }

    #[test]
    fn test_missing_file_reads_zero() {
        let dir = scratch("missing");
        let mut store = JsonFileStore::new(dir.join(FILE_NAME));
        assert_eq!(store.load().unwrap(), 0);
    }

    #[test]
    fn test_save_creates_directories_and_reloads() {
        let dir = scratch("save");
        let path = dir.join("nested").join(FILE_NAME);
        let mut store = JsonFileStore::new(&path);
        store.save(17).unwrap();

        let mut again = JsonFileStore::new(&path);
        assert_eq!(again.load().unwrap(), 17);

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["version"], 1);
        assert_eq!(raw["high_score"], 17);
        assert!(!path.with_extension("json.tmp").exists());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = scratch("corrupt");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(FILE_NAME);
        fs::write(&path, "not json").unwrap();

        let mut store = JsonFileStore::new(&path);
        assert!(matches!(store.load(), Err(StoreError::Serialization(_))));

        fs::write(&path, r#"{"version":99,"high_score":5}"#).unwrap();
        assert!(matches!(store.load(), Err(StoreError::InvalidVersion(99))));

        let _ = fs::remove_dir_all(&dir);
    }
}
