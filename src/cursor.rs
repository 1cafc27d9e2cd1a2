use crate::models::PostId;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum CursorError {
    #[error("Cursor file I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Cursor file holds an invalid id {0:?}")]
    Parse(String),
}

/// Durable storage for the id of the last processed mention.
pub trait CursorStore: Send + Sync {
    /// `None` means no cursor: start from the current time.
    fn load(&self) -> Result<Option<PostId>, CursorError>;
    fn save(&self, id: PostId) -> Result<(), CursorError>;
}

/// Keeps the cursor as a decimal id in a single small text file.
#[derive(Debug, Clone)]
pub struct FileCursorStore {
    path: PathBuf,
}

impl FileCursorStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CursorStore for FileCursorStore {
    fn load(&self) -> Result<Option<PostId>, CursorError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No cursor file at {}", self.path.display());
                return Ok(None);
            }
            Err(e) => return Err(CursorError::Io(e)),
        };

        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        trimmed
            .parse::<PostId>()
            .map(Some)
            .map_err(|_| CursorError::Parse(trimmed.to_string()))
    }

    fn save(&self, id: PostId) -> Result<(), CursorError> {
        fs::write(&self.path, id.to_string())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_means_no_cursor() {
        let dir = tempdir().unwrap();
        let store = FileCursorStore::new(dir.path().join("since.id"));
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_empty_file_means_no_cursor() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("since.id");
        fs::write(&path, "  \n").unwrap();
        assert_eq!(FileCursorStore::new(path).load().unwrap(), None);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let store = FileCursorStore::new(dir.path().join("since.id"));
        store.save(1_234_567_890_123).unwrap();
        assert_eq!(store.load().unwrap(), Some(1_234_567_890_123));

        store.save(42).unwrap();
        assert_eq!(store.load().unwrap(), Some(42));
    }

    #[test]
    fn test_garbage_is_a_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("since.id");
        fs::write(&path, "not-an-id").unwrap();
        match FileCursorStore::new(path).load() {
            Err(CursorError::Parse(raw)) => assert_eq!(raw, "not-an-id"),
            other => panic!("Expected Parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_save_into_missing_directory_fails() {
        let dir = tempdir().unwrap();
        let store = FileCursorStore::new(dir.path().join("missing").join("since.id"));
        assert!(matches!(store.save(1), Err(CursorError::Io(_))));
    }
}
