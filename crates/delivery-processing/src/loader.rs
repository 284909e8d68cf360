//! Dataset loading and the process-wide dataset cache.
//!
//! [`load_csv`] reads every column as a string; typing is left to
//! [`crate::preprocess::normalize`] so that a single bad cell cannot make
//! the reader pick the wrong dtype or fail outright.
//!
//! [`DatasetCache`] memoizes the last loaded file by path. It is an explicit
//! object owned by whoever drives the dashboard, not a global.

use crate::error::{ProcessingError, Result, ResultExt};
use parking_lot::RwLock;
use polars::prelude::*;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Read a header-first CSV file with all columns as strings.
///
/// Falls back to a pre-cleaned copy of the content (stray quotes removed)
/// when the strict read fails.
pub fn load_csv(path: impl AsRef<Path>) -> Result<DataFrame> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(ProcessingError::FileNotFound(path.display().to_string()));
    }

    match string_reader_options()
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .and_then(|reader| reader.finish())
    {
        Ok(df) => return Ok(df),
        Err(e) => debug!("Standard CSV read failed, retrying on cleaned content: {}", e),
    }

    let content = std::fs::read_to_string(path)?;
    let cleaned = clean_csv_content(&content);
    string_reader_options()
        .into_reader_with_file_handle(Cursor::new(cleaned))
        .finish()
        .context(format!("Parsing '{}'", path.display()))
}

fn string_reader_options() -> CsvReadOptions {
    // A schema inference length of zero reads every column as String.
    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .with_parse_options(CsvParseOptions::default().with_quote_char(Some(b'"')))
}

/// Remove unbalanced quote characters line by line.
fn clean_csv_content(content: &str) -> String {
    content
        .lines()
        .map(|line| {
            if line.matches('"').count() % 2 == 0 {
                line.to_string()
            } else {
                line.replace('"', "")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

struct CachedDataset {
    path: PathBuf,
    frame: Arc<DataFrame>,
}

/// Single-entry cache of the raw dataset, keyed by path.
///
/// Asking for the cached path returns the shared frame without touching
/// storage. Asking for a different path replaces the entry.
#[derive(Default)]
pub struct DatasetCache {
    entry: RwLock<Option<CachedDataset>>,
}

impl std::fmt::Debug for DatasetCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatasetCache")
            .field("cached_path", &self.cached_path())
            .finish()
    }
}

impl DatasetCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached frame for `path`, loading it on first use.
    pub fn get_or_load(&self, path: impl AsRef<Path>) -> Result<Arc<DataFrame>> {
        let path = path.as_ref();

        if let Some(cached) = self.entry.read().as_ref()
            && cached.path == path
        {
            debug!(path = %path.display(), "Dataset cache hit");
            return Ok(Arc::clone(&cached.frame));
        }

        let mut guard = self.entry.write();
        // Another caller may have loaded it while we waited for the lock.
        if let Some(cached) = guard.as_ref()
            && cached.path == path
        {
            return Ok(Arc::clone(&cached.frame));
        }

        let frame = Arc::new(load_csv(path)?);
        info!(
            path = %path.display(),
            rows = frame.height(),
            columns = frame.width(),
            "Loaded dataset"
        );
        *guard = Some(CachedDataset {
            path: path.to_path_buf(),
            frame: Arc::clone(&frame),
        });
        Ok(frame)
    }

    /// Drop the cached entry so the next request re-reads storage.
    pub fn invalidate(&self) {
        *self.entry.write() = None;
    }

    /// Path of the currently cached dataset, if any.
    pub fn cached_path(&self) -> Option<PathBuf> {
        self.entry.read().as_ref().map(|cached| cached.path.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(rows: &[&str]) -> tempfile::NamedTempFile {
        let mut tmp = tempfile::NamedTempFile::with_suffix(".csv").unwrap();
        for row in rows {
            writeln!(tmp, "{row}").unwrap();
        }
        tmp.flush().unwrap();
        tmp
    }

    #[test]
    fn test_load_csv_reads_everything_as_strings() {
        let tmp = write_csv(&["territory,ATD", "A,30", "B,oops"]);
        let df = load_csv(tmp.path()).unwrap();

        assert_eq!(df.shape(), (2, 2));
        assert_eq!(df.column("ATD").unwrap().dtype(), &DataType::String);
    }

    #[test]
    fn test_load_csv_missing_file() {
        let result = load_csv("/definitely/not/here.csv");
        assert!(matches!(result, Err(ProcessingError::FileNotFound(_))));
    }

    #[test]
    fn test_cache_returns_shared_frame_for_same_path() {
        let tmp = write_csv(&["territory,ATD", "A,30"]);
        let cache = DatasetCache::new();

        let first = cache.get_or_load(tmp.path()).unwrap();
        let second = cache.get_or_load(tmp.path()).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.cached_path().as_deref(), Some(tmp.path()));
    }

    #[test]
    fn test_cache_does_not_reread_storage() {
        let tmp = write_csv(&["territory,ATD", "A,30"]);
        let path = tmp.path().to_path_buf();
        let cache = DatasetCache::new();

        let first = cache.get_or_load(&path).unwrap();
        std::fs::write(&path, "territory,ATD\nA,30\nB,40\n").unwrap();
        let second = cache.get_or_load(&path).unwrap();

        assert_eq!(first.height(), 1);
        assert_eq!(second.height(), 1);

        cache.invalidate();
        assert_eq!(cache.get_or_load(&path).unwrap().height(), 2);
    }

    #[test]
    fn test_cache_reloads_on_path_change() {
        let a = write_csv(&["territory,ATD", "A,30"]);
        let b = write_csv(&["territory,ATD", "A,30", "B,40"]);
        let cache = DatasetCache::new();

        assert_eq!(cache.get_or_load(a.path()).unwrap().height(), 1);
        assert_eq!(cache.get_or_load(b.path()).unwrap().height(), 2);
        assert_eq!(cache.cached_path().as_deref(), Some(b.path()));
    }

    #[test]
    fn test_clean_csv_content_drops_unbalanced_quotes() {
        let cleaned = clean_csv_content("a,b\n\"x,1\nok,\"2\"");
        assert_eq!(cleaned, "a,b\nx,1\nok,\"2\"");
    }
}
