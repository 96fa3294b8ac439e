use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

use super::Storage;

/// Durable slot: one JSON file holding the whole task list.
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn open_default() -> Result<Self> {
        Ok(Self::new(default_store_path()?))
    }

    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Storage for FileStorage {
    fn read(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        // A freshly created or truncated file counts as an absent slot.
        if content.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(content))
    }

    fn write(&self, payload: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create store dir {}", parent.display()))?;
        }
        fs::write(&self.path, payload)
            .with_context(|| format!("failed to write {}", self.path.display()))
    }
}

fn default_store_path() -> Result<PathBuf> {
    let base = dirs::data_dir().context("failed to resolve data dir")?;
    Ok(base.join("tarea").join("tasks.json"))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::domain::task::Task;
    use crate::store::TaskStore;

    #[test]
    fn missing_file_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("tasks.json"));
        assert!(storage.read().unwrap().is_none());
    }

    #[test]
    fn blank_file_reads_as_none() {
        let file = tempfile::NamedTempFile::new().unwrap();
        fs::write(file.path(), "   \n").unwrap();
        let storage = FileStorage::new(file.path());
        assert!(storage.read().unwrap().is_none());
    }

    #[test]
    fn write_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("nested").join("tasks.json"));
        storage.write("[]").unwrap();
        assert_eq!(storage.read().unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn store_round_trip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(FileStorage::new(dir.path().join("tasks.json")));

        let mut store = TaskStore::new(storage.clone()).unwrap();
        store.add("hello", None).unwrap().wait().unwrap();
        let expected: Vec<Task> = store.tasks().to_vec();

        let mut reloaded = TaskStore::new(storage).unwrap();
        reloaded.load();
        assert_eq!(reloaded.tasks(), expected);
    }
}
