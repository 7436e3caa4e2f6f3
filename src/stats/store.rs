use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::{Metric, StatsError};

// ---------------------------------------------------------------------------
// On-disk artifact store for one dataset configuration
// ---------------------------------------------------------------------------

/// One JSON file per metric inside the configuration's cache directory.
///
/// Writes go to a temporary sibling first and are renamed into place, so a
/// reader sharing the cache never sees a half-written artifact.
#[derive(Debug, Clone)]
pub struct CacheStore {
    dir: PathBuf,
}

impl CacheStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn exists(&self) -> bool {
        self.dir.is_dir()
    }

    pub fn create(&self) -> Result<(), StatsError> {
        fs::create_dir_all(&self.dir).map_err(|e| StatsError::io(&self.dir, e))
    }

    pub fn path(&self, metric: Metric) -> PathBuf {
        self.dir.join(metric.file_name())
    }

    pub fn contains(&self, metric: Metric) -> bool {
        self.path(metric).is_file()
    }

    /// Read a cached artifact; `Ok(None)` when it has not been written.
    pub fn read<T: DeserializeOwned>(&self, metric: Metric) -> Result<Option<T>, StatsError> {
        let path = self.path(metric);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StatsError::io(path, e)),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| StatsError::Json { path, source })
    }

    pub fn write<T: Serialize>(&self, metric: Metric, value: &T) -> Result<(), StatsError> {
        self.create()?;
        let path = self.path(metric);
        let tmp = self
            .dir
            .join(format!(".{}.{}.tmp", metric.file_name(), std::process::id()));

        let bytes = serde_json::to_vec(value).map_err(|source| StatsError::Json {
            path: path.clone(),
            source,
        })?;
        let mut file = fs::File::create(&tmp).map_err(|e| StatsError::io(&tmp, e))?;
        file.write_all(&bytes)
            .and_then(|_| file.sync_all())
            .map_err(|e| StatsError::io(&tmp, e))?;
        drop(file);

        fs::rename(&tmp, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            StatsError::io(&path, e)
        })?;
        log::debug!("Wrote {}", path.display());
        Ok(())
    }
}
