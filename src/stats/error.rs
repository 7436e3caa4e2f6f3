use std::path::PathBuf;

use thiserror::Error;

use super::Metric;

#[derive(Debug, Error)]
pub enum StatsError {
    /// Deployment mode found no cached artifact and may not compute one.
    #[error("missing a cache for {0}")]
    MissingCache(Metric),

    #[error("no data source is known for {0}")]
    NoSource(String),

    #[error("loading dataset source: {0:#}")]
    Source(anyhow::Error),

    #[error("{metric} cannot be computed: {reason}")]
    Degenerate { metric: Metric, reason: String },

    #[error("cache I/O on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cache artifact {path} is not valid: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl StatsError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StatsError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn is_missing_cache(&self) -> bool {
        matches!(self, StatsError::MissingCache(_))
    }
}
