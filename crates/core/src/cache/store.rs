//! Parquet-backed storage of per-project asset tables.
//!
//! Layout: `{root}/{project}/{file_name}`. One file per project; a save
//! replaces the previous table wholesale.

use std::fs::File;
use std::path::{Path, PathBuf};

use arrow::array::RecordBatch;
use arrow::compute::concat_batches;
use chrono::{DateTime, Utc};
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::file::properties::WriterProperties;

use crate::Error;

/// Handle to a project's cached asset table on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheHandle {
    pub project: String,
    pub path: PathBuf,
    pub rows: usize,
    /// Last modification time of the cache file, when the filesystem reports one.
    pub modified: Option<DateTime<Utc>>,
}

/// File-backed store of asset tables keyed by project name.
#[derive(Debug, Clone)]
pub struct CacheStore {
    root: PathBuf,
    file_name: String,
}

impl CacheStore {
    pub fn new(root: impl Into<PathBuf>, file_name: impl Into<String>) -> Self {
        Self { root: root.into(), file_name: file_name.into() }
    }

    /// Path of the cache file for `project`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` for empty names and names that would
    /// escape the cache root.
    pub fn path_for(&self, project: &str) -> Result<PathBuf, Error> {
        if project.trim().is_empty() {
            return Err(Error::InvalidInput("project name must not be empty".into()));
        }
        if project.contains(['/', '\\']) || project == "." || project == ".." {
            return Err(Error::InvalidInput(format!("invalid project name: {project}")));
        }
        Ok(self.root.join(project).join(&self.file_name))
    }

    /// Read the cached table for `project`, or `None` if no file exists.
    pub fn load(&self, project: &str) -> Result<Option<RecordBatch>, Error> {
        let path = self.path_for(project)?;
        if !path.exists() {
            return Ok(None);
        }

        let file = File::open(&path).map_err(|e| Error::CacheRead(format!("{}: {e}", path.display())))?;
        let builder = ParquetRecordBatchReaderBuilder::try_new(file)
            .map_err(|e| Error::CacheRead(format!("{}: {e}", path.display())))?;
        let schema = builder.schema().clone();
        let reader = builder.build().map_err(|e| Error::CacheRead(e.to_string()))?;

        let mut batches = Vec::new();
        for batch in reader {
            batches.push(batch.map_err(|e| Error::CacheRead(e.to_string()))?);
        }

        Ok(Some(concat_batches(&schema, &batches)?))
    }

    /// Write `batch` as the cached table for `project`.
    ///
    /// The project directory is created if absent. Data is written to a
    /// sibling temp file first and renamed over the previous table.
    pub fn save(&self, project: &str, batch: &RecordBatch) -> Result<CacheHandle, Error> {
        let path = self.path_for(project)?;
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }

        let tmp_path = path.with_extension("tmp");
        let file = File::create(&tmp_path)?;
        let props = WriterProperties::builder().build();
        let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))
            .map_err(|e| Error::CacheWrite(e.to_string()))?;
        writer.write(batch).map_err(|e| Error::CacheWrite(e.to_string()))?;
        writer.close().map_err(|e| Error::CacheWrite(e.to_string()))?;
        std::fs::rename(&tmp_path, &path)?;

        tracing::debug!(project, rows = batch.num_rows(), path = %path.display(), "wrote asset cache");

        Ok(CacheHandle { project: project.to_string(), modified: modified_at(&path), path, rows: batch.num_rows() })
    }

    /// Handle for an existing cache entry with a known row count.
    pub(crate) fn handle(&self, project: &str, rows: usize) -> Result<CacheHandle, Error> {
        let path = self.path_for(project)?;
        Ok(CacheHandle { project: project.to_string(), modified: modified_at(&path), path, rows })
    }
}

fn modified_at(path: &Path) -> Option<DateTime<Utc>> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok().map(DateTime::<Utc>::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::batch_from_columns;
    use serde_json::json;

    fn sample() -> RecordBatch {
        batch_from_columns(vec![
            ("link".into(), vec![json!("https://a.example"), json!("https://b.example")]),
            ("is_alive".into(), vec![json!(true), json!(true)]),
        ])
        .unwrap()
    }

    #[test]
    fn test_path_layout() {
        let store = CacheStore::new("/tmp/assetq", "raw_assets.parquet");
        let path = store.path_for("p1").unwrap();
        assert_eq!(path, PathBuf::from("/tmp/assetq/p1/raw_assets.parquet"));
    }

    #[test]
    fn test_path_rejects_escapes() {
        let store = CacheStore::new("/tmp/assetq", "raw_assets.parquet");
        assert!(store.path_for("").is_err());
        assert!(store.path_for("..").is_err());
        assert!(store.path_for("a/b").is_err());
        assert!(store.path_for("a\\b").is_err());
    }

    #[test]
    fn test_load_missing_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path(), "raw_assets.parquet");
        assert!(store.load("nothing-here").unwrap().is_none());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path(), "raw_assets.parquet");
        let batch = sample();

        let handle = store.save("p1", &batch).unwrap();
        assert_eq!(handle.rows, 2);
        assert!(handle.path.exists());
        assert!(handle.modified.is_some());
        assert!(!handle.path.with_extension("tmp").exists());

        let loaded = store.load("p1").unwrap().unwrap();
        assert_eq!(crate::table::column_names(&loaded), vec!["link", "is_alive"]);
        assert_eq!(loaded.columns(), batch.columns());
    }

    #[test]
    fn test_save_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path(), "raw_assets.parquet");
        store.save("p1", &sample()).unwrap();

        let smaller = sample().slice(0, 1);
        store.save("p1", &smaller).unwrap();

        assert_eq!(store.load("p1").unwrap().unwrap().num_rows(), 1);
    }

    #[test]
    fn test_load_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path(), "raw_assets.parquet");
        let path = store.path_for("p1").unwrap();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"not parquet").unwrap();

        assert!(matches!(store.load("p1"), Err(Error::CacheRead(_))));
    }
}
