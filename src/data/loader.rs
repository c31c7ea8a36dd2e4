//! CSV Data Loader Module
//! Loads the volcano CSV with Polars and memoizes the result per canonical path.

use polars::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Cannot access {path}: {source}")]
    FileAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse CSV {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: PolarsError,
    },
}

/// Loads CSV files and keeps every parsed frame keyed by its canonical path.
///
/// Frames handed out are cheap clones of the cached one; callers never get
/// mutable access to the cached data.
pub struct DataLoader {
    cache: HashMap<PathBuf, DataFrame>,
    /// Requested spelling -> cache key, so a cached file stays reachable
    /// after it can no longer be canonicalized (deleted or moved).
    aliases: HashMap<PathBuf, PathBuf>,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    pub fn new() -> Self {
        Self {
            cache: HashMap::new(),
            aliases: HashMap::new(),
        }
    }

    fn cache_key(&self, file_path: &Path) -> PathBuf {
        match std::fs::canonicalize(file_path) {
            Ok(canonical) => canonical,
            Err(_) => self
                .aliases
                .get(file_path)
                .cloned()
                .unwrap_or_else(|| file_path.to_path_buf()),
        }
    }

    /// Load a CSV file, returning the cached frame if the same file was loaded before.
    pub fn load_csv(&mut self, file_path: &Path) -> Result<DataFrame, LoaderError> {
        let key = self.cache_key(file_path);
        if let Some(df) = self.cache.get(&key) {
            debug!(path = %file_path.display(), key = %key.display(), "CSV served from cache");
            let df = df.clone();
            self.aliases.insert(file_path.to_path_buf(), key);
            return Ok(df);
        }

        let df = Self::read_csv(file_path)?;
        info!(
            path = %file_path.display(),
            rows = df.height(),
            columns = df.width(),
            "CSV loaded"
        );
        self.aliases.insert(file_path.to_path_buf(), key.clone());
        self.cache.insert(key, df.clone());
        Ok(df)
    }

    fn read_csv(file_path: &Path) -> Result<DataFrame, LoaderError> {
        let access_error = |source| LoaderError::FileAccess {
            path: file_path.to_path_buf(),
            source,
        };

        let metadata = std::fs::metadata(file_path).map_err(access_error)?;
        if !metadata.is_file() {
            return Err(access_error(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "not a regular file",
            )));
        }
        // Surface permission problems as access errors rather than parse errors
        std::fs::File::open(file_path).map_err(access_error)?;

        let parse_error = |source| LoaderError::Parse {
            path: file_path.to_path_buf(),
            source,
        };

        CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(10000))
            .try_into_reader_with_file_path(Some(file_path.to_path_buf()))
            .map_err(parse_error)?
            .finish()
            .map_err(parse_error)
    }

    /// Drop the cached frame for a path so the next load re-reads the file.
    pub fn invalidate(&mut self, file_path: &Path) -> bool {
        let key = self.cache_key(file_path);
        self.aliases.retain(|_, cached| *cached != key);
        let removed = self.cache.remove(&key).is_some();
        if removed {
            debug!(path = %file_path.display(), "CSV cache entry invalidated");
        }
        removed
    }

    /// Whether a frame for this path is cached.
    #[allow(dead_code)]
    pub fn is_cached(&self, file_path: &Path) -> bool {
        self.cache.contains_key(&self.cache_key(file_path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = "\
,Number,Volcano Name,Country,Region,Latitude,Longitude,Elev,Type,Status,Last Known
0,1001,Mount St. Helens,United States,US-Washington,46.2,-122.18,2549,Stratovolcano,Historical,D1
1,1002,Kilimanjaro,Tanzania,Africa-E,-3.07,37.35,5895,Stratovolcano,Holocene,U
";

    fn write_csv(dir: &tempfile::TempDir, name: &str, content: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content).unwrap();
        path
    }

    #[test]
    fn loads_rows_and_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(&dir, "volcanoes.csv", SAMPLE.as_bytes());

        let mut loader = DataLoader::new();
        let df = loader.load_csv(&path).unwrap();

        assert_eq!(df.height(), 2);
        assert_eq!(df.width(), 11);
        assert!(df.column("Country").is_ok());
        assert!(loader.is_cached(&path));
    }

    #[test]
    fn second_load_is_served_from_cache() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(&dir, "volcanoes.csv", SAMPLE.as_bytes());

        let mut loader = DataLoader::new();
        let first = loader.load_csv(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        let second = loader.load_csv(&path).unwrap();
        assert!(first.equals_missing(&second));
    }

    #[test]
    fn different_spellings_share_one_entry() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(&dir, "volcanoes.csv", SAMPLE.as_bytes());
        let dotted = dir.path().join(".").join("volcanoes.csv");

        let mut loader = DataLoader::new();
        loader.load_csv(&path).unwrap();

        let mut extended = SAMPLE.to_string();
        extended.push_str("2,1003,Fuji,Japan,Honshu-Japan,35.35,138.73,3776,Stratovolcano,Historical,D3\n");
        std::fs::write(&path, extended).unwrap();

        assert!(loader.is_cached(&dotted));
        assert_eq!(loader.load_csv(&dotted).unwrap().height(), 2);

        assert!(loader.invalidate(&dotted));
        assert!(!loader.is_cached(&path));
        assert_eq!(loader.load_csv(&path).unwrap().height(), 3);
    }

    #[test]
    fn invalidate_forces_reread() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(&dir, "volcanoes.csv", SAMPLE.as_bytes());

        let mut loader = DataLoader::new();
        loader.load_csv(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert!(loader.invalidate(&path));
        assert!(!loader.is_cached(&path));
        assert!(matches!(
            loader.load_csv(&path),
            Err(LoaderError::FileAccess { .. })
        ));
    }

    #[test]
    fn missing_file_is_access_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut loader = DataLoader::new();
        let err = loader
            .load_csv(&dir.path().join("does_not_exist.csv"))
            .unwrap_err();
        assert!(matches!(err, LoaderError::FileAccess { .. }));
        assert!(!loader.is_cached(&dir.path().join("does_not_exist.csv")));
    }

    #[test]
    fn directory_is_access_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut loader = DataLoader::new();
        assert!(matches!(
            loader.load_csv(dir.path()),
            Err(LoaderError::FileAccess { .. })
        ));
    }

    #[test]
    fn ragged_rows_are_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(&dir, "broken.csv", b"a,b\n1,2\n3,4,5,6\n");

        let mut loader = DataLoader::new();
        assert!(matches!(
            loader.load_csv(&path),
            Err(LoaderError::Parse { .. })
        ));
    }
}
