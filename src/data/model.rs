use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// FieldValue – a single scalar cell read from a dataset
// ---------------------------------------------------------------------------

/// A dynamically-typed scalar mirroring the common column dtypes of
/// Parquet / JSON / CSV sources. Labels are stored as `FieldValue`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Integer(i64),
    Float(f64),
    Bool(bool),
    String(String),
    Null,
}

// -- Manual Eq/Ord so labels can key a BTreeMap --

impl Eq for FieldValue {}

impl PartialOrd for FieldValue {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FieldValue {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use FieldValue::*;
        fn discriminant(v: &FieldValue) -> u8 {
            match v {
                Null => 0,
                Bool(_) => 1,
                Integer(_) => 2,
                Float(_) => 3,
                String(_) => 4,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Bool(a), Bool(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (String(a), String(b)) => a.cmp(b),
            _ => std::cmp::Ordering::Equal,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::String(s) => write!(f, "{s}"),
            FieldValue::Integer(i) => write!(f, "{i}"),
            FieldValue::Float(v) => write!(f, "{v:.4}"),
            FieldValue::Bool(b) => write!(f, "{b}"),
            FieldValue::Null => write!(f, "<null>"),
        }
    }
}

impl FieldValue {
    /// Display name of a label, resolving integer class indices through
    /// `label_names` when they are in range.
    pub fn label_name(&self, label_names: &[String]) -> String {
        match self {
            FieldValue::Integer(i) => usize::try_from(*i)
                .ok()
                .and_then(|idx| label_names.get(idx))
                .cloned()
                .unwrap_or_else(|| i.to_string()),
            other => other.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// TextRecord – one row of a text dataset
// ---------------------------------------------------------------------------

/// A single row: the (flattened) text field and the optional label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRecord {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<FieldValue>,
}

impl TextRecord {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            label: None,
        }
    }

    pub fn with_label(mut self, label: FieldValue) -> Self {
        self.label = Some(label);
        self
    }
}

// ---------------------------------------------------------------------------
// TextDataset – the complete loaded split
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextDataset {
    pub records: Vec<TextRecord>,
}

impl TextDataset {
    pub fn from_records(records: Vec<TextRecord>) -> Self {
        Self { records }
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|r| r.text.as_str())
    }
}

// ---------------------------------------------------------------------------
// DatasetArgs – the user's selection for one column of the UI
// ---------------------------------------------------------------------------

/// Identifies one dataset configuration: which dataset, config, split and
/// text field to measure.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatasetArgs {
    pub dset_name: String,
    pub dset_config: String,
    pub split_name: String,
    /// Path into nested records, e.g. `["meta", "title"]`.
    pub text_field: Vec<String>,
    #[serde(default)]
    pub label_field: Option<String>,
    #[serde(default)]
    pub label_names: Vec<String>,
}

impl DatasetArgs {
    /// `meta-title`, as used in titles and cache directory names.
    pub fn text_field_label(&self) -> String {
        self.text_field.join("-")
    }

    /// Name of this configuration's directory under the cache root.
    pub fn cache_dir_name(&self) -> String {
        format!(
            "{}_{}_{}_{}",
            self.dset_name,
            self.dset_config,
            self.split_name,
            self.text_field_label()
        )
        .replace(['/', '\\'], "__")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> DatasetArgs {
        DatasetArgs {
            dset_name: "org/reviews".into(),
            dset_config: "default".into(),
            split_name: "train".into(),
            text_field: vec!["meta".into(), "title".into()],
            label_field: None,
            label_names: Vec::new(),
        }
    }

    #[test]
    fn cache_dir_name_flattens_path_separators() {
        assert_eq!(args().cache_dir_name(), "org__reviews_default_train_meta-title");
    }

    #[test]
    fn integer_labels_resolve_through_names() {
        let names = vec!["neg".to_string(), "pos".to_string()];
        assert_eq!(FieldValue::Integer(1).label_name(&names), "pos");
        assert_eq!(FieldValue::Integer(7).label_name(&names), "7");
        assert_eq!(FieldValue::Integer(-1).label_name(&names), "-1");
        assert_eq!(FieldValue::String("spam".into()).label_name(&names), "spam");
    }

    #[test]
    fn field_values_order_by_kind_then_value() {
        let mut values = vec![
            FieldValue::String("b".into()),
            FieldValue::Integer(3),
            FieldValue::Null,
            FieldValue::Integer(1),
        ];
        values.sort();
        assert_eq!(
            values,
            vec![
                FieldValue::Null,
                FieldValue::Integer(1),
                FieldValue::Integer(3),
                FieldValue::String("b".into()),
            ]
        );
    }
}
