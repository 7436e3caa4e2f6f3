use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::data::model::TextDataset;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DuplicateStats {
    /// Texts occurring more than once, most repeated first.
    pub duplicates: Vec<DuplicateEntry>,
    /// Number of rows that would be dropped by deduplication.
    pub dedup_total: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateEntry {
    pub text: String,
    pub count: u64,
}

pub fn compute(dataset: &TextDataset) -> DuplicateStats {
    let mut counts: HashMap<&str, u64> = HashMap::new();
    for text in dataset.texts() {
        *counts.entry(text).or_default() += 1;
    }

    let mut duplicates: Vec<DuplicateEntry> = counts
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(text, count)| DuplicateEntry {
            text: text.to_string(),
            count,
        })
        .collect();
    duplicates.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.text.cmp(&b.text)));

    let dedup_total = duplicates.iter().map(|d| d.count - 1).sum();
    DuplicateStats {
        duplicates,
        dedup_total,
    }
}
