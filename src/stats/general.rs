use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::duplicates::DuplicateStats;
use super::tokenize::{is_closed_class, tokenize};
use crate::data::model::TextDataset;

// ---------------------------------------------------------------------------
// Vocabulary
// ---------------------------------------------------------------------------

/// Word counts over the whole split, most frequent first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VocabStats {
    pub entries: Vec<VocabEntry>,
    pub total_words: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VocabEntry {
    pub word: String,
    pub count: u64,
    pub proportion: f64,
}

impl VocabStats {
    pub fn count_of(&self, word: &str) -> u64 {
        self.entries
            .iter()
            .find(|e| e.word == word)
            .map_or(0, |e| e.count)
    }

    pub fn counts(&self) -> impl Iterator<Item = u64> + '_ {
        self.entries.iter().map(|e| e.count)
    }
}

pub fn compute_vocab(dataset: &TextDataset) -> VocabStats {
    let mut counts: HashMap<String, u64> = HashMap::new();
    for text in dataset.texts() {
        for token in tokenize(text) {
            *counts.entry(token).or_default() += 1;
        }
    }
    let total_words: u64 = counts.values().sum();

    let mut entries: Vec<VocabEntry> = counts
        .into_iter()
        .map(|(word, count)| VocabEntry {
            proportion: count as f64 / total_words as f64,
            word,
            count,
        })
        .collect();
    entries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.word.cmp(&b.word)));

    VocabStats {
        entries,
        total_words,
    }
}

// ---------------------------------------------------------------------------
// General statistics widget
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralStats {
    pub num_rows: u64,
    pub total_words: u64,
    pub total_open_words: u64,
    /// Rows whose text is missing or empty.
    pub text_nan_count: u64,
    pub dedup_total: u64,
    pub sorted_top_vocab: Vec<VocabEntry>,
}

pub fn compute_general(
    dataset: &TextDataset,
    vocab: &VocabStats,
    duplicates: &DuplicateStats,
    top_n: usize,
) -> GeneralStats {
    let open: Vec<&VocabEntry> = vocab
        .entries
        .iter()
        .filter(|e| !is_closed_class(&e.word))
        .collect();
    let total_open_words: u64 = open.iter().map(|e| e.count).sum();

    let sorted_top_vocab = open
        .into_iter()
        .take(top_n)
        .map(|e| VocabEntry {
            word: e.word.clone(),
            count: e.count,
            proportion: e.count as f64 / total_open_words as f64,
        })
        .collect();

    GeneralStats {
        num_rows: dataset.len() as u64,
        total_words: vocab.total_words,
        total_open_words,
        text_nan_count: dataset.texts().filter(|t| t.trim().is_empty()).count() as u64,
        dedup_total: duplicates.dedup_total,
        sorted_top_vocab,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::TextRecord;
    use crate::stats::duplicates;

    fn dataset() -> TextDataset {
        TextDataset::from_records(
            ["The cat sat", "the cat ran", "", "The cat sat"]
                .into_iter()
                .map(TextRecord::new)
                .collect(),
        )
    }

    #[test]
    fn vocab_is_sorted_by_count_then_word() {
        let vocab = compute_vocab(&dataset());
        assert_eq!(vocab.total_words, 9);
        let words: Vec<_> = vocab.entries.iter().map(|e| e.word.as_str()).collect();
        assert_eq!(words, vec!["cat", "the", "sat", "ran"]);
        assert_eq!(vocab.count_of("sat"), 2);
        assert_eq!(vocab.count_of("dog"), 0);
    }

    #[test]
    fn general_stats_exclude_closed_class_words() {
        let ds = dataset();
        let vocab = compute_vocab(&ds);
        let dups = duplicates::compute(&ds);
        let stats = compute_general(&ds, &vocab, &dups, 2);

        assert_eq!(stats.num_rows, 4);
        assert_eq!(stats.total_words, 9);
        assert_eq!(stats.total_open_words, 6);
        assert_eq!(stats.text_nan_count, 1);
        assert_eq!(stats.dedup_total, 1);
        assert_eq!(stats.sorted_top_vocab.len(), 2);
        assert_eq!(stats.sorted_top_vocab[0].word, "cat");
        assert!((stats.sorted_top_vocab[0].proportion - 0.5).abs() < 1e-12);
    }
}
