use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use arrow::array::{
    Array, ArrayRef, AsArray, BooleanArray, Float64Array, Int64Array, LargeListArray, ListArray,
};
use arrow::compute::cast;
use arrow::datatypes::DataType;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{FieldValue, TextDataset, TextRecord};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Which fields of a source file make up a [`TextRecord`].
#[derive(Debug, Clone, Copy)]
pub struct FieldSelection<'a> {
    /// Path into nested records; flattened with `.` for tabular formats.
    pub text_field: &'a [String],
    pub label_field: Option<&'a str>,
}

impl FieldSelection<'_> {
    /// `meta.title`, the flattened column name for CSV / Parquet sources.
    pub fn text_column(&self) -> String {
        self.text_field.join(".")
    }
}

/// Load one split of a text dataset from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.parquet` – text column (string or list of strings), optional label column
/// * `.json`    – `[{ "text": "...", "label": 0, ... }, ...]`, nested text paths allowed
/// * `.csv`     – header row; the text column is named by the flattened path
pub fn load_file(path: &Path, fields: FieldSelection<'_>) -> Result<TextDataset> {
    if fields.text_field.is_empty() {
        bail!("No text field selected");
    }
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let dataset = match ext.as_str() {
        "parquet" | "pq" => load_parquet(path, fields),
        "json" => load_json(path, fields),
        "csv" => load_csv(path, fields),
        other => bail!("Unsupported file extension: .{other}"),
    }
    .with_context(|| format!("loading {}", path.display()))?;

    log::info!("Loaded {} records from {}", dataset.len(), path.display());
    Ok(dataset)
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented):
///
/// ```json
/// [
///   { "text": "a review", "label": 1, "meta": { "title": "..." } },
///   ...
/// ]
/// ```
fn load_json(path: &Path, fields: FieldSelection<'_>) -> Result<TextDataset> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;
    records_from_json(&root, fields)
}

pub(crate) fn records_from_json(root: &JsonValue, fields: FieldSelection<'_>) -> Result<TextDataset> {
    let rows = root.as_array().context("Expected top-level JSON array")?;

    let mut records = Vec::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        if !row.is_object() {
            bail!("Row {i} is not a JSON object");
        }
        let text = fields
            .text_field
            .iter()
            .try_fold(row, |node, key| node.get(key))
            .map(json_to_text)
            .unwrap_or_default();
        let label = fields
            .label_field
            .map(|key| row.get(key).map(json_to_value).unwrap_or(FieldValue::Null));
        records.push(TextRecord { text, label });
    }

    Ok(TextDataset::from_records(records))
}

/// Strings are taken as-is, lists of strings are joined with a space.
fn json_to_text(val: &JsonValue) -> String {
    match val {
        JsonValue::String(s) => s.clone(),
        JsonValue::Array(items) => items
            .iter()
            .filter_map(|v| v.as_str())
            .collect::<Vec<_>>()
            .join(" "),
        JsonValue::Null => String::new(),
        other => other.to_string(),
    }
}

fn json_to_value(val: &JsonValue) -> FieldValue {
    match val {
        JsonValue::String(s) => FieldValue::String(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                FieldValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                FieldValue::Float(f)
            } else {
                FieldValue::String(n.to_string())
            }
        }
        JsonValue::Bool(b) => FieldValue::Bool(*b),
        JsonValue::Null => FieldValue::Null,
        other => FieldValue::String(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with column names. The text column is the
/// flattened text path (`meta.title`); the label column is optional.
fn load_csv(path: &Path, fields: FieldSelection<'_>) -> Result<TextDataset> {
    let reader = csv::Reader::from_path(path).context("opening CSV")?;
    records_from_csv(reader, fields)
}

fn records_from_csv<R: std::io::Read>(
    mut reader: csv::Reader<R>,
    fields: FieldSelection<'_>,
) -> Result<TextDataset> {
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let text_column = fields.text_column();
    let text_idx = headers
        .iter()
        .position(|h| *h == text_column)
        .with_context(|| format!("CSV missing '{text_column}' column"))?;
    let label_idx = match fields.label_field {
        Some(label) => Some(
            headers
                .iter()
                .position(|h| h == label)
                .with_context(|| format!("CSV missing '{label}' column"))?,
        ),
        None => None,
    };

    let mut records = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        let text = record.get(text_idx).unwrap_or("").to_string();
        let label = label_idx.map(|idx| guess_value_type(record.get(idx).unwrap_or("")));
        records.push(TextRecord { text, label });
    }

    Ok(TextDataset::from_records(records))
}

fn guess_value_type(s: &str) -> FieldValue {
    if s.is_empty() {
        return FieldValue::Null;
    }
    if let Ok(i) = s.parse::<i64>() {
        return FieldValue::Integer(i);
    }
    if let Ok(f) = s.parse::<f64>() {
        return FieldValue::Float(f);
    }
    if s == "true" || s == "false" {
        return FieldValue::Bool(s == "true");
    }
    FieldValue::String(s.to_string())
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file containing a text split.
///
/// Expected schema:
/// - text column: Utf8 / LargeUtf8, or a list of either (joined with a space)
/// - label column (optional): any integer or float width, boolean, string
///   or dictionary of strings
///
/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`).
fn load_parquet(path: &Path, fields: FieldSelection<'_>) -> Result<TextDataset> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let text_column = fields.text_column();
    let mut records = Vec::new();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let schema = batch.schema();

        let text_idx = schema
            .index_of(&text_column)
            .map_err(|_| anyhow::anyhow!("Parquet file missing '{text_column}' column"))?;
        let label_idx = match fields.label_field {
            Some(label) => Some(
                schema
                    .index_of(label)
                    .map_err(|_| anyhow::anyhow!("Parquet file missing '{label}' column"))?,
            ),
            None => None,
        };

        let text_col = normalize_text_column(batch.column(text_idx))?;
        let labels = match label_idx {
            Some(idx) => Some(
                label_values(batch.column(idx))
                    .with_context(|| format!("reading label column '{}'", schema.field(idx).name()))?,
            ),
            None => None,
        };
        for row in 0..batch.num_rows() {
            let text = extract_text(&text_col, row)
                .with_context(|| format!("Row {row}: failed to read '{text_column}'"))?;
            let label = labels.as_ref().map(|values| values[row].clone());
            records.push(TextRecord { text, label });
        }
    }

    Ok(TextDataset::from_records(records))
}

// -- Parquet / Arrow helpers --

/// String views and dictionary-encoded strings are read as plain Utf8.
fn normalize_text_column(col: &ArrayRef) -> Result<ArrayRef> {
    match col.data_type() {
        DataType::Utf8View | DataType::Dictionary(_, _) => {
            cast(col, &DataType::Utf8).context("casting text column to Utf8")
        }
        _ => Ok(Arc::clone(col)),
    }
}

/// Extract the text of a string or list-of-strings column at the given row.
/// Null cells are empty texts.
fn extract_text(col: &ArrayRef, row: usize) -> Result<String> {
    if col.is_null(row) {
        return Ok(String::new());
    }

    let items = match col.data_type() {
        DataType::Utf8 => return Ok(col.as_string::<i32>().value(row).to_string()),
        DataType::LargeUtf8 => return Ok(col.as_string::<i64>().value(row).to_string()),
        DataType::List(_) => col
            .as_any()
            .downcast_ref::<ListArray>()
            .context("expected ListArray")?
            .value(row),
        DataType::LargeList(_) => col
            .as_any()
            .downcast_ref::<LargeListArray>()
            .context("expected LargeListArray")?
            .value(row),
        other => bail!("Expected a string or list column, got {other:?}"),
    };

    let words: Vec<&str> = match items.data_type() {
        DataType::Utf8 => items.as_string::<i32>().iter().flatten().collect(),
        DataType::LargeUtf8 => items.as_string::<i64>().iter().flatten().collect(),
        other => bail!("List inner type is {other:?}, expected Utf8"),
    };
    Ok(words.join(" "))
}

/// Every label of one batch. Integer widths are widened to Int64 and
/// dictionaries decoded to strings first; unsupported types are an error.
fn label_values(col: &ArrayRef) -> Result<Vec<FieldValue>> {
    let col = match col.data_type() {
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32
        | DataType::UInt64 => cast(col, &DataType::Int64)?,
        DataType::Float16 | DataType::Float32 => cast(col, &DataType::Float64)?,
        DataType::Utf8View | DataType::Dictionary(_, _) => cast(col, &DataType::Utf8)?,
        _ => Arc::clone(col),
    };
    (0..col.len()).map(|row| extract_value(&col, row)).collect()
}

/// Extract a single scalar from an Arrow column at a given row.
fn extract_value(col: &ArrayRef, row: usize) -> Result<FieldValue> {
    if col.is_null(row) {
        return Ok(FieldValue::Null);
    }
    fn downcast<'a, T: 'static>(col: &'a ArrayRef) -> Result<&'a T> {
        col.as_any()
            .downcast_ref::<T>()
            .with_context(|| format!("unexpected array for {:?}", col.data_type()))
    }
    let value = match col.data_type() {
        DataType::Utf8 => FieldValue::String(col.as_string::<i32>().value(row).to_string()),
        DataType::LargeUtf8 => FieldValue::String(col.as_string::<i64>().value(row).to_string()),
        DataType::Int64 => FieldValue::Integer(downcast::<Int64Array>(col)?.value(row)),
        DataType::Float64 => FieldValue::Float(downcast::<Float64Array>(col)?.value(row)),
        DataType::Boolean => FieldValue::Bool(downcast::<BooleanArray>(col)?.value(row)),
        other => bail!("Unsupported label type {other:?}"),
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{
        BinaryArray, DictionaryArray, Int8Array, LargeStringBuilder, ListBuilder, StringArray,
        StringBuilder, UInt16Array,
    };
    use arrow::datatypes::Int32Type;
    use arrow::record_batch::RecordBatch;
    use parquet::arrow::ArrowWriter;
    use serde_json::json;

    fn path(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn json_walks_nested_text_paths() {
        let root = json!([
            { "meta": { "title": "first title" }, "label": 1 },
            { "meta": { "title": ["two", "parts"] }, "label": "x" },
            { "meta": {} }
        ]);
        let text_field = path(&["meta", "title"]);
        let ds = records_from_json(
            &root,
            FieldSelection { text_field: &text_field, label_field: Some("label") },
        )
        .unwrap();

        assert_eq!(ds.len(), 3);
        assert_eq!(ds.records[0].text, "first title");
        assert_eq!(ds.records[0].label, Some(FieldValue::Integer(1)));
        assert_eq!(ds.records[1].text, "two parts");
        assert_eq!(ds.records[2].text, "");
        assert_eq!(ds.records[2].label, Some(FieldValue::Null));
    }

    #[test]
    fn json_rejects_non_object_rows() {
        let text_field = path(&["text"]);
        let err = records_from_json(
            &json!(["bare string"]),
            FieldSelection { text_field: &text_field, label_field: None },
        )
        .unwrap_err();
        assert!(err.to_string().contains("Row 0"));
    }

    #[test]
    fn csv_reads_flattened_text_column_and_labels() {
        let data = "id,meta.title,label\n1,hello there,0\n2,,1\n";
        let reader = csv::Reader::from_reader(data.as_bytes());
        let text_field = path(&["meta", "title"]);
        let ds = records_from_csv(
            reader,
            FieldSelection { text_field: &text_field, label_field: Some("label") },
        )
        .unwrap();

        assert_eq!(ds.len(), 2);
        assert_eq!(ds.records[0].text, "hello there");
        assert_eq!(ds.records[1].text, "");
        assert_eq!(ds.records[1].label, Some(FieldValue::Integer(1)));
    }

    #[test]
    fn csv_missing_text_column_is_an_error() {
        let reader = csv::Reader::from_reader("a,b\n1,2\n".as_bytes());
        let text_field = path(&["text"]);
        assert!(records_from_csv(
            reader,
            FieldSelection { text_field: &text_field, label_field: None },
        )
        .is_err());
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let text_field = path(&["text"]);
        let err = load_file(
            Path::new("data.xlsx"),
            FieldSelection { text_field: &text_field, label_field: None },
        )
        .unwrap_err();
        assert!(err.to_string().contains(".xlsx"));
    }

    // -- Parquet --

    fn write_parquet(dir: &Path, columns: Vec<(&str, ArrayRef)>) -> std::path::PathBuf {
        let batch = RecordBatch::try_from_iter(columns).unwrap();
        let path = dir.join("split.parquet");
        let file = std::fs::File::create(&path).unwrap();
        let mut writer = ArrowWriter::try_new(file, batch.schema(), None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();
        path
    }

    fn load_parquet_file(path: &Path, text: &str, label: Option<&str>) -> Result<TextDataset> {
        let text_field = path_of(text);
        load_file(path, FieldSelection { text_field: &text_field, label_field: label })
    }

    fn path_of(text: &str) -> Vec<String> {
        text.split('.').map(str::to_string).collect()
    }

    #[test]
    fn parquet_reads_text_and_integer_labels() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_parquet(
            dir.path(),
            vec![
                ("text", Arc::new(StringArray::from(vec![Some("good book"), None, Some("bad")])) as ArrayRef),
                ("label", Arc::new(Int64Array::from(vec![1, 0, 1])) as ArrayRef),
            ],
        );
        let ds = load_parquet_file(&file, "text", Some("label")).unwrap();

        assert_eq!(ds.texts().collect::<Vec<_>>(), vec!["good book", "", "bad"]);
        assert_eq!(ds.records[1].label, Some(FieldValue::Integer(0)));
        assert_eq!(ds.records[2].label, Some(FieldValue::Integer(1)));
    }

    #[test]
    fn parquet_joins_list_text_columns() {
        let mut small = ListBuilder::new(StringBuilder::new());
        let mut large = ListBuilder::new(LargeStringBuilder::new());
        for words in [["two", "parts"], ["three", "more"]] {
            for w in words {
                small.values().append_value(w);
                large.values().append_value(w);
            }
            small.append(true);
            large.append(true);
        }
        let dir = tempfile::tempdir().unwrap();
        let file = write_parquet(
            dir.path(),
            vec![
                ("tokens", Arc::new(small.finish()) as ArrayRef),
                ("large_tokens", Arc::new(large.finish()) as ArrayRef),
            ],
        );

        for column in ["tokens", "large_tokens"] {
            let ds = load_parquet_file(&file, column, None).unwrap();
            assert_eq!(ds.texts().collect::<Vec<_>>(), vec!["two parts", "three more"]);
        }
    }

    #[test]
    fn parquet_widens_narrow_and_dictionary_labels() {
        let dict: DictionaryArray<Int32Type> = vec!["pos", "neg", "pos"].into_iter().collect();
        let dir = tempfile::tempdir().unwrap();
        let file = write_parquet(
            dir.path(),
            vec![
                ("text", Arc::new(StringArray::from(vec!["a", "b", "c"])) as ArrayRef),
                ("small", Arc::new(Int8Array::from(vec![0, 1, 1])) as ArrayRef),
                ("unsigned", Arc::new(UInt16Array::from(vec![7, 8, 9])) as ArrayRef),
                ("named", Arc::new(dict) as ArrayRef),
            ],
        );

        let labels = |column: &str| -> Vec<Option<FieldValue>> {
            load_parquet_file(&file, "text", Some(column))
                .unwrap()
                .records
                .into_iter()
                .map(|r| r.label)
                .collect()
        };
        assert_eq!(
            labels("small"),
            vec![
                Some(FieldValue::Integer(0)),
                Some(FieldValue::Integer(1)),
                Some(FieldValue::Integer(1)),
            ]
        );
        assert_eq!(labels("unsigned")[2], Some(FieldValue::Integer(9)));
        assert_eq!(labels("named")[1], Some(FieldValue::String("neg".into())));
    }

    #[test]
    fn parquet_rejects_missing_columns_and_unsupported_labels() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_parquet(
            dir.path(),
            vec![
                ("body", Arc::new(StringArray::from(vec!["a"])) as ArrayRef),
                ("blob", Arc::new(BinaryArray::from(vec![b"xy".as_ref()])) as ArrayRef),
            ],
        );

        let err = load_parquet_file(&file, "text", None).unwrap_err();
        assert!(format!("{err:#}").contains("missing 'text'"), "{err:#}");
        assert!(load_parquet_file(&file, "body", Some("blob")).is_err());
    }
}
