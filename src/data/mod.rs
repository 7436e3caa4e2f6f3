/// Data layer: core types, the dataset catalog, and split loading.
///
/// Architecture:
/// ```text
///   catalog.json
///        │
///        ▼
///   ┌──────────┐
///   │ catalog   │  names, configs, splits, text fields → DatasetArgs
///   └──────────┘
///        │  split path
///        ▼
///   ┌──────────┐
///   │  loader   │  .parquet / .json / .csv → TextDataset
///   └──────────┘
///        │
///        ▼
///   ┌─────────────┐
///   │ TextDataset  │  Vec<TextRecord { text, label }>
///   └─────────────┘
/// ```

pub mod catalog;
pub mod loader;
pub mod model;
