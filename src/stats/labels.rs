use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::data::model::{FieldValue, TextDataset};

/// Label distribution, in label order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LabelStats {
    pub counts: Vec<LabelCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelCount {
    pub label: String,
    pub count: u64,
}

impl LabelStats {
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().map(|c| c.count).sum()
    }
}

/// Records without a label (no label field, or a null cell) are not counted.
pub fn compute(dataset: &TextDataset, label_names: &[String]) -> LabelStats {
    let mut by_value: BTreeMap<&FieldValue, u64> = BTreeMap::new();
    for label in dataset.records.iter().filter_map(|r| r.label.as_ref()) {
        if *label != FieldValue::Null {
            *by_value.entry(label).or_default() += 1;
        }
    }

    LabelStats {
        counts: by_value
            .into_iter()
            .map(|(value, count)| LabelCount {
                label: value.label_name(label_names),
                count,
            })
            .collect(),
    }
}
