//! Data measurements: explore text-dataset statistics backed by a per-configuration cache.

pub mod app;
pub mod color;
pub mod config;
pub mod data;
pub mod logging;
pub mod measure;
pub mod request;
pub mod state;
pub mod stats;
pub mod ui;

/// Words rarer than this are left out of the nPMI tables.
pub const MIN_VOCAB_COUNT: u64 = 10;
/// Rows shown in top-word and bias tables.
pub const SHOW_TOP_N_WORDS: usize = 10;
