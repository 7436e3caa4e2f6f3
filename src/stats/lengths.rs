use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::tokenize::tokenize;
use crate::data::model::TextDataset;

/// How many of the shortest / longest texts are kept for display.
pub const EXTREMES_SHOWN: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextLengthStats {
    pub avg_length: f64,
    pub std_length: f64,
    /// Token count → number of texts with that length.
    pub histogram: BTreeMap<usize, u64>,
    pub shortest: Vec<LengthExample>,
    pub longest: Vec<LengthExample>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LengthExample {
    pub length: usize,
    pub text: String,
}

impl TextLengthStats {
    pub fn num_uniq_lengths(&self) -> usize {
        self.histogram.len()
    }
}

pub fn compute(dataset: &TextDataset) -> TextLengthStats {
    let mut by_length: Vec<(usize, &str)> = dataset
        .texts()
        .map(|text| (tokenize(text).len(), text))
        .collect();

    let mut histogram = BTreeMap::new();
    for (len, _) in &by_length {
        *histogram.entry(*len).or_insert(0u64) += 1;
    }

    let n = by_length.len() as f64;
    let (avg_length, std_length) = if by_length.is_empty() {
        (0.0, 0.0)
    } else {
        let mean = by_length.iter().map(|(l, _)| *l as f64).sum::<f64>() / n;
        let var = by_length
            .iter()
            .map(|(l, _)| (*l as f64 - mean).powi(2))
            .sum::<f64>()
            / n;
        (mean, var.sqrt())
    };

    // Stable sort keeps dataset order among equal lengths.
    by_length.sort_by_key(|(len, _)| *len);
    let example = |&(length, text): &(usize, &str)| LengthExample {
        length,
        text: text.to_string(),
    };
    let shortest = by_length.iter().take(EXTREMES_SHOWN).map(example).collect();
    let longest = by_length.iter().rev().take(EXTREMES_SHOWN).map(example).collect();

    TextLengthStats {
        avg_length,
        std_length,
        histogram,
        shortest,
        longest,
    }
}
