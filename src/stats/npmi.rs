use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use super::general::VocabStats;
use super::tokenize::tokenize;
use crate::data::model::TextDataset;

/// Terms whose co-occurrence profiles are compared against each other.
/// Each must survive tokenization as a single token.
pub const IDENTITY_TERMS: &[&str] = &[
    "man", "woman", "gay", "lesbian", "queer", "trans", "straight", "cis", "she", "her", "hers",
    "he", "him", "his", "they", "them", "their", "theirs", "himself", "herself",
];

/// Normalized PMI of every frequent word with every available identity term,
/// measured at the document level.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NpmiStats {
    pub min_count: u64,
    /// Identity terms frequent enough to be selected, in `IDENTITY_TERMS` order.
    pub available_terms: Vec<String>,
    /// term → (word → npmi). Words never co-occurring with the term are absent.
    pub scores: BTreeMap<String, BTreeMap<String, f64>>,
}

/// One row of the bias table for a pair of terms.
#[derive(Debug, Clone, PartialEq)]
pub struct NpmiBias {
    pub word: String,
    pub first: f64,
    pub second: f64,
    /// `first - second`: positive leans towards the first term.
    pub bias: f64,
}

impl NpmiStats {
    pub fn can_compare(&self) -> bool {
        self.available_terms.len() >= 2
    }

    /// Words scored for both terms, sorted by bias towards `first`
    /// (most positive first).
    pub fn bias(&self, first: &str, second: &str) -> Vec<NpmiBias> {
        let (Some(a), Some(b)) = (self.scores.get(first), self.scores.get(second)) else {
            return Vec::new();
        };
        let mut rows: Vec<NpmiBias> = a
            .iter()
            .filter(|(word, _)| word.as_str() != first && word.as_str() != second)
            .filter_map(|(word, &fa)| {
                b.get(word).map(|&fb| NpmiBias {
                    word: word.clone(),
                    first: fa,
                    second: fb,
                    bias: fa - fb,
                })
            })
            .collect();
        rows.sort_by(|x, y| y.bias.total_cmp(&x.bias).then_with(|| x.word.cmp(&y.word)));
        rows
    }
}

/// `ln(p(x,y) / (p(x) p(y))) / -ln p(x,y)`; `None` when the pair never co-occurs.
pub fn npmi(p_x: f64, p_y: f64, p_xy: f64) -> Option<f64> {
    if p_xy <= 0.0 || p_x <= 0.0 || p_y <= 0.0 {
        return None;
    }
    if p_xy >= 1.0 {
        return Some(1.0);
    }
    Some((p_xy / (p_x * p_y)).ln() / -p_xy.ln())
}

pub fn compute(dataset: &TextDataset, vocab: &VocabStats, min_count: u64) -> NpmiStats {
    let frequent: HashSet<&str> = vocab
        .entries
        .iter()
        .filter(|e| e.count >= min_count)
        .map(|e| e.word.as_str())
        .collect();

    let docs: Vec<HashSet<String>> = dataset
        .texts()
        .map(|t| {
            tokenize(t)
                .into_iter()
                .filter(|w| frequent.contains(w.as_str()))
                .collect()
        })
        .collect();
    let n_docs = docs.len() as f64;

    let mut doc_freq: HashMap<&str, u64> = HashMap::new();
    for doc in &docs {
        for word in doc {
            *doc_freq.entry(word.as_str()).or_default() += 1;
        }
    }

    let available_terms: Vec<String> = IDENTITY_TERMS
        .iter()
        .filter(|t| frequent.contains(**t) && doc_freq.get(**t).copied().unwrap_or(0) >= min_count)
        .map(|t| t.to_string())
        .collect();

    let mut scores = BTreeMap::new();
    for term in &available_terms {
        let mut co: HashMap<&str, u64> = HashMap::new();
        for doc in docs.iter().filter(|d| d.contains(term)) {
            for word in doc {
                *co.entry(word.as_str()).or_default() += 1;
            }
        }
        let p_term = doc_freq[term.as_str()] as f64 / n_docs;
        let row: BTreeMap<String, f64> = co
            .into_iter()
            .filter(|(word, _)| *word != term.as_str())
            .filter_map(|(word, joint)| {
                let p_word = doc_freq[word] as f64 / n_docs;
                npmi(p_term, p_word, joint as f64 / n_docs).map(|v| (word.to_string(), v))
            })
            .collect();
        scores.insert(term.clone(), row);
    }

    NpmiStats {
        min_count,
        available_terms,
        scores,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::TextRecord;
    use crate::stats::general::compute_vocab;

    #[test]
    fn identity_terms_are_single_tokens() {
        for term in IDENTITY_TERMS {
            assert_eq!(tokenize(term), vec![term.to_string()], "{term}");
        }
    }

    #[test]
    fn npmi_bounds() {
        // Independent events score 0.
        assert!(npmi(0.5, 0.5, 0.25).unwrap().abs() < 1e-12);
        // Always together scores 1.
        assert!((npmi(0.5, 0.5, 0.5).unwrap() - 1.0).abs() < 1e-12);
        assert_eq!(npmi(1.0, 1.0, 1.0), Some(1.0));
        assert_eq!(npmi(0.5, 0.5, 0.0), None);
    }

    fn dataset() -> TextDataset {
        let mut texts = Vec::new();
        for _ in 0..3 {
            texts.push("he plays football");
            texts.push("she reads books");
            texts.push("he reads books");
            texts.push("she plays chess");
        }
        TextDataset::from_records(texts.into_iter().map(TextRecord::new).collect())
    }

    #[test]
    fn only_frequent_identity_terms_are_available() {
        let ds = dataset();
        let vocab = compute_vocab(&ds);
        let stats = compute(&ds, &vocab, 6);
        assert_eq!(stats.available_terms, vec!["she", "he"]);
        assert!(stats.can_compare());

        let strict = compute(&ds, &vocab, 7);
        assert!(strict.available_terms.is_empty());
        assert!(!strict.can_compare());
    }

    #[test]
    fn bias_table_orders_words_towards_first_term() {
        let ds = dataset();
        let vocab = compute_vocab(&ds);
        let stats = compute(&ds, &vocab, 6);

        // Every frequent word occurs with both terms equally often.
        let rows = stats.bias("he", "she");
        let words: Vec<_> = rows.iter().map(|r| r.word.as_str()).collect();
        assert_eq!(words, vec!["books", "plays", "reads"]);
        assert!(rows.iter().all(|r| r.bias.abs() < 1e-12));

        assert!(stats.bias("he", "queer").is_empty());
    }

    #[test]
    fn skewed_cooccurrence_gives_signed_bias() {
        let mut texts = Vec::new();
        texts.extend(std::iter::repeat("he plays").take(4));
        texts.extend(std::iter::repeat("she plays").take(2));
        texts.extend(std::iter::repeat("she reads").take(4));
        texts.extend(std::iter::repeat("he reads").take(2));
        let ds = TextDataset::from_records(texts.into_iter().map(TextRecord::new).collect());
        let stats = compute(&ds, &compute_vocab(&ds), 6);

        let rows = stats.bias("he", "she");
        assert_eq!(rows[0].word, "plays");
        assert!(rows[0].bias > 0.0);
        assert_eq!(rows[1].word, "reads");
        assert!(rows[1].bias < 0.0);
    }
}
