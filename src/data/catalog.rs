use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use super::model::DatasetArgs;

// ---------------------------------------------------------------------------
// Catalog file schema
// ---------------------------------------------------------------------------

/// The local list of datasets the tool can measure.
///
/// ```json
/// {
///   "datasets": [{
///     "name": "sample_reviews",
///     "description": "...",
///     "configs": [{
///       "name": "default",
///       "splits": { "train": "sample_reviews/train.parquet" },
///       "text_fields": [["text"]],
///       "label_field": "label",
///       "label_names": ["negative", "positive"]
///     }]
///   }]
/// }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatasetCatalog {
    pub datasets: Vec<DatasetEntry>,
    /// Directory that split paths are relative to. Set on load.
    #[serde(skip)]
    pub root: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetEntry {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub configs: Vec<ConfigEntry>,
}

/// One configuration of a dataset, the "ds_configs" shown in the header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigEntry {
    pub name: String,
    pub splits: BTreeMap<String, PathBuf>,
    pub text_fields: Vec<Vec<String>>,
    #[serde(default)]
    pub label_field: Option<String>,
    #[serde(default)]
    pub label_names: Vec<String>,
}

impl DatasetCatalog {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading catalog {}", path.display()))?;
        let mut catalog: DatasetCatalog =
            serde_json::from_str(&text).context("parsing catalog JSON")?;
        catalog.root = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        catalog.validate()?;
        Ok(catalog)
    }

    fn validate(&self) -> Result<()> {
        for ds in &self.datasets {
            if ds.configs.is_empty() {
                bail!("Dataset '{}' has no configs", ds.name);
            }
            for cfg in &ds.configs {
                if cfg.splits.is_empty() {
                    bail!("Dataset '{}' config '{}' has no splits", ds.name, cfg.name);
                }
                if cfg.text_fields.is_empty() || cfg.text_fields.iter().any(|f| f.is_empty()) {
                    bail!(
                        "Dataset '{}' config '{}' needs at least one non-empty text field",
                        ds.name,
                        cfg.name
                    );
                }
            }
        }
        Ok(())
    }

    /// All dataset names, in catalog order.
    pub fn list_datasets(&self) -> Vec<String> {
        self.datasets.iter().map(|d| d.name.clone()).collect()
    }

    pub fn dataset(&self, name: &str) -> Option<&DatasetEntry> {
        self.datasets.iter().find(|d| d.name == name)
    }

    /// Absolute path of a split's data file.
    pub fn split_path(&self, args: &DatasetArgs) -> Option<PathBuf> {
        let cfg = self
            .dataset(&args.dset_name)?
            .configs
            .iter()
            .find(|c| c.name == args.dset_config)?;
        cfg.splits.get(&args.split_name).map(|p| self.root.join(p))
    }

    /// Every (dataset, config, split, text field) combination.
    pub fn all_args(&self) -> Vec<DatasetArgs> {
        let mut out = Vec::new();
        for ds in &self.datasets {
            for cfg in &ds.configs {
                for split in cfg.splits.keys() {
                    for text_field in &cfg.text_fields {
                        out.push(cfg.args(&ds.name, split, text_field));
                    }
                }
            }
        }
        out
    }
}

impl ConfigEntry {
    pub fn split_names(&self) -> Vec<String> {
        self.splits.keys().cloned().collect()
    }

    pub fn args(&self, dset_name: &str, split_name: &str, text_field: &[String]) -> DatasetArgs {
        DatasetArgs {
            dset_name: dset_name.to_string(),
            dset_config: self.name.clone(),
            split_name: split_name.to_string(),
            text_field: text_field.to_vec(),
            label_field: self.label_field.clone(),
            label_names: self.label_names.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Time-limited catalog cache
// ---------------------------------------------------------------------------

/// Keeps the loaded catalog for `ttl`, re-reading the file afterwards.
pub struct CatalogCache {
    path: PathBuf,
    ttl: Duration,
    loaded: Option<(Instant, DatasetCatalog)>,
}

impl CatalogCache {
    pub fn new(path: PathBuf, ttl: Duration) -> Self {
        Self {
            path,
            ttl,
            loaded: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Point at another catalog file; the next `get` reloads.
    pub fn set_path(&mut self, path: PathBuf) {
        self.path = path;
        self.loaded = None;
    }

    /// The cached catalog, reloading it if it is older than the TTL.
    /// A failed reload keeps serving the previous catalog.
    pub fn get(&mut self) -> Result<&DatasetCatalog> {
        self.get_at(Instant::now())
    }

    fn get_at(&mut self, now: Instant) -> Result<&DatasetCatalog> {
        let stale = match &self.loaded {
            Some((at, _)) => now.saturating_duration_since(*at) >= self.ttl,
            None => true,
        };
        if stale {
            match DatasetCatalog::load(&self.path) {
                Ok(catalog) => {
                    log::info!(
                        "Loaded catalog {} with {} datasets",
                        self.path.display(),
                        catalog.datasets.len()
                    );
                    self.loaded = Some((now, catalog));
                }
                Err(e) if self.loaded.is_some() => {
                    log::warn!("Keeping previous catalog, reload failed: {e:#}");
                }
                Err(e) => return Err(e),
            }
        }
        match &self.loaded {
            Some((_, catalog)) => Ok(catalog),
            None => bail!("Catalog {} is not loaded", self.path.display()),
        }
    }
}
