//! Statistics layer: per-configuration measurements backed by an on-disk cache.
//!
//! Architecture:
//! ```text
//!   DatasetArgs ──► DatasetStatisticsCache ──► CacheStore (<cache_dir>/<config>/*.json)
//!                        │
//!                        ├─ dataset / dset_peek
//!                        ├─ labels, text_lengths, text_duplicates
//!                        ├─ vocab ──► general_stats, npmi, zipf
//!                        └─ embeddings
//! ```
//!
//! Every `load_or_prepare_*` call either reads its artifact or, outside
//! deployment mode, computes and writes it. Calls are independent: one
//! failing leaves the others usable.
pub mod duplicates;
pub mod embeddings;
pub mod error;
pub mod general;
pub mod labels;
pub mod lengths;
pub mod npmi;
pub mod store;
pub mod tokenize;
pub mod zipf;

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::data::loader::{self, FieldSelection};
use crate::data::model::{DatasetArgs, TextDataset, TextRecord};
use crate::{MIN_VOCAB_COUNT, SHOW_TOP_N_WORDS};

pub use error::StatsError;
use store::CacheStore;

/// Records shown in the dataset header.
pub const PEEK_ROWS: usize = 100;

// ---------------------------------------------------------------------------
// Metric – one cached artifact
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Metric {
    Dataset,
    DsetPeek,
    Labels,
    TextLengths,
    TextDuplicates,
    Vocab,
    GeneralStats,
    Embeddings,
    Npmi,
    Zipf,
}

impl Metric {
    pub fn name(self) -> &'static str {
        match self {
            Metric::Dataset => "load or prepare dataset",
            Metric::DsetPeek => "dset peek",
            Metric::Labels => "prepare labels",
            Metric::TextLengths => "text lengths",
            Metric::TextDuplicates => "text duplicates",
            Metric::Vocab => "vocabulary",
            Metric::GeneralStats => "general stats",
            Metric::Embeddings => "embeddings",
            Metric::Npmi => "npmi",
            Metric::Zipf => "zipf",
        }
    }

    pub fn file_name(self) -> &'static str {
        match self {
            Metric::Dataset => "text_dset.json",
            Metric::DsetPeek => "dset_peek.json",
            Metric::Labels => "labels.json",
            Metric::TextLengths => "text_lengths.json",
            Metric::TextDuplicates => "text_duplicates.json",
            Metric::Vocab => "vocab.json",
            Metric::GeneralStats => "general_stats.json",
            Metric::Embeddings => "embeddings.json",
            Metric::Npmi => "npmi.json",
            Metric::Zipf => "zipf.json",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// DatasetStatisticsCache
// ---------------------------------------------------------------------------

/// Statistics handle for one dataset configuration.
#[derive(Debug)]
pub struct DatasetStatisticsCache {
    pub args: DatasetArgs,
    store: CacheStore,
    use_cache: bool,
    deployment: bool,
    source: Option<PathBuf>,
    embeddings_requested: bool,

    pub text_dset: Option<TextDataset>,
    pub dset_peek: Option<Vec<TextRecord>>,
    pub label_stats: Option<labels::LabelStats>,
    pub length_stats: Option<lengths::TextLengthStats>,
    pub dup_stats: Option<duplicates::DuplicateStats>,
    pub vocab: Option<general::VocabStats>,
    pub general_stats: Option<general::GeneralStats>,
    pub embeddings: Option<embeddings::EmbeddingStats>,
    pub npmi_stats: Option<npmi::NpmiStats>,
    pub zipf: Option<zipf::ZipfStats>,
}

impl DatasetStatisticsCache {
    pub fn new(cache_dir: &Path, args: DatasetArgs, use_cache: bool) -> Self {
        let store = CacheStore::new(cache_dir.join(args.cache_dir_name()));
        Self {
            args,
            store,
            use_cache,
            deployment: false,
            source: None,
            embeddings_requested: false,
            text_dset: None,
            dset_peek: None,
            label_stats: None,
            length_stats: None,
            dup_stats: None,
            vocab: None,
            general_stats: None,
            embeddings: None,
            npmi_stats: None,
            zipf: None,
        }
    }

    /// Data file the split is read from when the dataset is not cached.
    pub fn with_source(mut self, path: Option<PathBuf>) -> Self {
        self.source = path;
        self
    }

    /// In deployment mode nothing is ever computed, only read.
    pub fn set_deployment(&mut self, deployment: bool) {
        self.deployment = deployment;
    }

    pub fn cache_path(&self) -> &Path {
        self.store.dir()
    }

    /// Deployment: whether this configuration has a cache directory.
    /// Development: create it if needed.
    pub fn check_cache_dir(&self) -> bool {
        if self.deployment {
            return self.store.exists();
        }
        match self.store.create() {
            Ok(()) => true,
            Err(e) => {
                log::error!("Could not create cache directory: {e}");
                false
            }
        }
    }

    /// Whether enough is loaded to render the measurement widgets.
    pub fn complete(&self) -> bool {
        self.dset_peek.is_some()
            && self.general_stats.is_some()
            && self.length_stats.is_some()
            && self.dup_stats.is_some()
            && self.zipf.is_some()
            && (self.args.label_field.is_none() || self.label_stats.is_some())
            && (!self.embeddings_requested || self.embeddings.is_some())
    }

    // -- cache plumbing --

    /// The cached artifact, if this mode reads the cache and it is there.
    /// Deployment mode turns a missing artifact into an error.
    fn cached<T: DeserializeOwned>(&self, metric: Metric) -> Result<Option<T>, StatsError> {
        if !(self.use_cache || self.deployment) {
            return Ok(None);
        }
        match self.store.read(metric)? {
            Some(value) => {
                log::info!("Loaded {metric} from cache");
                Ok(Some(value))
            }
            None if self.deployment => Err(StatsError::MissingCache(metric)),
            None => Ok(None),
        }
    }

    fn save<T: Serialize>(&self, metric: Metric, value: &T) -> Result<(), StatsError> {
        self.store.write(metric, value)?;
        log::info!("Prepared {metric} and wrote it to {}", self.store.dir().display());
        Ok(())
    }

    fn dataset(&mut self) -> Result<&TextDataset, StatsError> {
        if self.text_dset.is_none() {
            self.load_or_prepare_dataset()?;
        }
        self.text_dset
            .as_ref()
            .ok_or_else(|| StatsError::NoSource(self.args.dset_name.clone()))
    }

    fn ensure_vocab(&mut self) -> Result<(), StatsError> {
        if self.vocab.is_none() {
            self.load_or_prepare_vocab()?;
        }
        Ok(())
    }

    // -- load_or_prepare family --

    pub fn load_or_prepare_dataset(&mut self) -> Result<(), StatsError> {
        if let Some(dataset) = self.cached(Metric::Dataset)? {
            self.text_dset = Some(dataset);
            return Ok(());
        }
        let path = self
            .source
            .clone()
            .ok_or_else(|| StatsError::NoSource(self.args.dset_name.clone()))?;
        let fields = FieldSelection {
            text_field: &self.args.text_field,
            label_field: self.args.label_field.as_deref(),
        };
        let dataset = loader::load_file(&path, fields).map_err(StatsError::Source)?;
        self.save(Metric::Dataset, &dataset)?;
        self.text_dset = Some(dataset);
        Ok(())
    }

    pub fn load_or_prepare_dset_peek(&mut self) -> Result<(), StatsError> {
        if let Some(peek) = self.cached(Metric::DsetPeek)? {
            self.dset_peek = Some(peek);
            return Ok(());
        }
        let peek: Vec<TextRecord> = self.dataset()?.records.iter().take(PEEK_ROWS).cloned().collect();
        self.save(Metric::DsetPeek, &peek)?;
        self.dset_peek = Some(peek);
        Ok(())
    }

    pub fn load_or_prepare_labels(&mut self) -> Result<(), StatsError> {
        if let Some(stats) = self.cached(Metric::Labels)? {
            self.label_stats = Some(stats);
            return Ok(());
        }
        self.dataset()?;
        let stats = match &self.text_dset {
            Some(ds) => labels::compute(ds, &self.args.label_names),
            None => labels::LabelStats::default(),
        };
        self.save(Metric::Labels, &stats)?;
        self.label_stats = Some(stats);
        Ok(())
    }

    pub fn load_or_prepare_text_lengths(&mut self) -> Result<(), StatsError> {
        if let Some(stats) = self.cached(Metric::TextLengths)? {
            self.length_stats = Some(stats);
            return Ok(());
        }
        let stats = lengths::compute(self.dataset()?);
        self.save(Metric::TextLengths, &stats)?;
        self.length_stats = Some(stats);
        Ok(())
    }

    pub fn load_or_prepare_text_duplicates(&mut self) -> Result<(), StatsError> {
        if let Some(stats) = self.cached(Metric::TextDuplicates)? {
            self.dup_stats = Some(stats);
            return Ok(());
        }
        let stats = duplicates::compute(self.dataset()?);
        self.save(Metric::TextDuplicates, &stats)?;
        self.dup_stats = Some(stats);
        Ok(())
    }

    pub fn load_or_prepare_vocab(&mut self) -> Result<(), StatsError> {
        if let Some(vocab) = self.cached(Metric::Vocab)? {
            self.vocab = Some(vocab);
            return Ok(());
        }
        let vocab = general::compute_vocab(self.dataset()?);
        self.save(Metric::Vocab, &vocab)?;
        self.vocab = Some(vocab);
        Ok(())
    }

    pub fn load_or_prepare_general_stats(&mut self) -> Result<(), StatsError> {
        if let Some(stats) = self.cached(Metric::GeneralStats)? {
            self.general_stats = Some(stats);
            return Ok(());
        }
        self.ensure_vocab()?;
        if self.dup_stats.is_none() {
            self.load_or_prepare_text_duplicates()?;
        }
        self.dataset()?;
        let (Some(ds), Some(vocab), Some(dups)) = (&self.text_dset, &self.vocab, &self.dup_stats)
        else {
            return Err(StatsError::NoSource(self.args.dset_name.clone()));
        };
        let stats = general::compute_general(ds, vocab, dups, SHOW_TOP_N_WORDS);
        self.save(Metric::GeneralStats, &stats)?;
        self.general_stats = Some(stats);
        Ok(())
    }

    pub fn load_or_prepare_embeddings(&mut self) -> Result<(), StatsError> {
        self.embeddings_requested = true;
        if let Some(stats) = self.cached(Metric::Embeddings)? {
            self.embeddings = Some(stats);
            return Ok(());
        }
        let stats = embeddings::compute(self.dataset()?);
        self.save(Metric::Embeddings, &stats)?;
        self.embeddings = Some(stats);
        Ok(())
    }

    pub fn load_or_prepare_npmi(&mut self) -> Result<(), StatsError> {
        if let Some(stats) = self.cached(Metric::Npmi)? {
            self.npmi_stats = Some(stats);
            return Ok(());
        }
        self.ensure_vocab()?;
        self.dataset()?;
        let (Some(ds), Some(vocab)) = (&self.text_dset, &self.vocab) else {
            return Err(StatsError::NoSource(self.args.dset_name.clone()));
        };
        let stats = npmi::compute(ds, vocab, MIN_VOCAB_COUNT);
        self.save(Metric::Npmi, &stats)?;
        self.npmi_stats = Some(stats);
        Ok(())
    }

    pub fn load_or_prepare_zipf(&mut self) -> Result<(), StatsError> {
        if let Some(stats) = self.cached(Metric::Zipf)? {
            self.zipf = Some(stats);
            return Ok(());
        }
        self.ensure_vocab()?;
        let counts: Vec<u64> = self.vocab.iter().flat_map(|v| v.counts()).collect();
        let stats = zipf::fit(&counts).map_err(|reason| StatsError::Degenerate {
            metric: Metric::Zipf,
            reason,
        })?;
        self.save(Metric::Zipf, &stats)?;
        self.zipf = Some(stats);
        Ok(())
    }

    /// Dispatch by metric, for callers that iterate over a metric list.
    pub fn load_or_prepare(&mut self, metric: Metric) -> Result<(), StatsError> {
        match metric {
            Metric::Dataset => self.load_or_prepare_dataset(),
            Metric::DsetPeek => self.load_or_prepare_dset_peek(),
            Metric::Labels => self.load_or_prepare_labels(),
            Metric::TextLengths => self.load_or_prepare_text_lengths(),
            Metric::TextDuplicates => self.load_or_prepare_text_duplicates(),
            Metric::Vocab => self.load_or_prepare_vocab(),
            Metric::GeneralStats => self.load_or_prepare_general_stats(),
            Metric::Embeddings => self.load_or_prepare_embeddings(),
            Metric::Npmi => self.load_or_prepare_npmi(),
            Metric::Zipf => self.load_or_prepare_zipf(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROWS: &str = r#"[
        {"text": "He said the movie was great", "label": 1},
        {"text": "She said the movie was awful", "label": 0},
        {"text": "He said the movie was great", "label": 1},
        {"text": "", "label": 0},
        {"text": "They loved the long and quiet movie", "label": 1}
    ]"#;

    fn args() -> DatasetArgs {
        DatasetArgs {
            dset_name: "reviews".into(),
            dset_config: "default".into(),
            split_name: "train".into(),
            text_field: vec!["text".into()],
            label_field: Some("label".into()),
            label_names: vec!["neg".into(), "pos".into()],
        }
    }

    fn setup() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("train.json");
        std::fs::write(&source, ROWS).unwrap();
        (dir, source)
    }

    #[test]
    fn development_mode_computes_and_caches_every_metric() {
        let (dir, source) = setup();
        let cache_dir = dir.path().join("cache");
        let mut dstats =
            DatasetStatisticsCache::new(&cache_dir, args(), true).with_source(Some(source));

        assert!(dstats.check_cache_dir());
        for metric in [
            Metric::Dataset,
            Metric::DsetPeek,
            Metric::Labels,
            Metric::TextLengths,
            Metric::TextDuplicates,
            Metric::Vocab,
            Metric::GeneralStats,
            Metric::Npmi,
            Metric::Zipf,
        ] {
            dstats.load_or_prepare(metric).unwrap();
            assert!(dstats.store.contains(metric), "{metric} not written");
        }
        assert!(dstats.complete());

        let general = dstats.general_stats.as_ref().unwrap();
        assert_eq!(general.num_rows, 5);
        assert_eq!(general.text_nan_count, 1);
        assert_eq!(general.dedup_total, 1);
        let labels = dstats.label_stats.as_ref().unwrap();
        assert_eq!(labels.counts[0].label, "neg");
        assert_eq!(labels.counts[1].count, 3);
        // The toy corpus is far below the nPMI frequency threshold.
        assert!(!dstats.npmi_stats.as_ref().unwrap().can_compare());
    }

    #[test]
    fn deployment_mode_only_reads_the_cache() {
        let (dir, source) = setup();
        let cache_dir = dir.path().join("cache");

        let mut live = DatasetStatisticsCache::new(&cache_dir, args(), true)
            .with_source(Some(source.clone()));
        live.set_deployment(true);
        assert!(!live.check_cache_dir());
        let err = live.load_or_prepare_text_lengths().unwrap_err();
        assert!(err.is_missing_cache());
        assert!(!cache_dir.exists());

        let mut dev = DatasetStatisticsCache::new(&cache_dir, args(), true)
            .with_source(Some(source));
        dev.load_or_prepare_text_lengths().unwrap();

        let mut live = DatasetStatisticsCache::new(&cache_dir, args(), true);
        live.set_deployment(true);
        assert!(live.check_cache_dir());
        live.load_or_prepare_text_lengths().unwrap();
        let histogram = |d: &DatasetStatisticsCache| d.length_stats.as_ref().map(|s| s.histogram.clone());
        assert_eq!(histogram(&live), histogram(&dev));
        assert!(live.load_or_prepare_zipf().unwrap_err().is_missing_cache());
        assert!(!live.complete());
    }

    #[test]
    fn use_cache_false_recomputes_from_source() {
        let (dir, source) = setup();
        let cache_dir = dir.path().join("cache");
        let mut first = DatasetStatisticsCache::new(&cache_dir, args(), true)
            .with_source(Some(source.clone()));
        first.load_or_prepare_dataset().unwrap();

        std::fs::write(&source, r#"[{"text": "only row", "label": 1}]"#).unwrap();

        let mut cached = DatasetStatisticsCache::new(&cache_dir, args(), true)
            .with_source(Some(source.clone()));
        cached.load_or_prepare_dataset().unwrap();
        assert_eq!(cached.text_dset.as_ref().unwrap().len(), 5);

        let mut fresh =
            DatasetStatisticsCache::new(&cache_dir, args(), false).with_source(Some(source));
        fresh.load_or_prepare_dataset().unwrap();
        assert_eq!(fresh.text_dset.as_ref().unwrap().len(), 1);
    }

    #[test]
    fn missing_source_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut dstats = DatasetStatisticsCache::new(dir.path(), args(), true);
        assert!(matches!(
            dstats.load_or_prepare_vocab(),
            Err(StatsError::NoSource(_))
        ));
    }

    #[test]
    fn requesting_embeddings_makes_them_part_of_completeness() {
        let (dir, source) = setup();
        let mut dstats = DatasetStatisticsCache::new(&dir.path().join("cache"), args(), true)
            .with_source(Some(source));
        for metric in [
            Metric::DsetPeek,
            Metric::Labels,
            Metric::TextLengths,
            Metric::TextDuplicates,
            Metric::GeneralStats,
            Metric::Zipf,
        ] {
            dstats.load_or_prepare(metric).unwrap();
        }
        assert!(dstats.complete());

        dstats.load_or_prepare_embeddings().unwrap();
        assert!(dstats.complete());
        assert_eq!(dstats.embeddings.as_ref().unwrap().text_ids.len(), 4);
    }
}
