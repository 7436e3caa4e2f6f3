use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use serde_json::json;

use data_measurements::data::catalog::{ConfigEntry, DatasetCatalog, DatasetEntry};

const SUBJECTS: &[&str] = &[
    "she", "he", "they", "the woman", "the man", "my friend", "her sister", "his brother",
];
const POSITIVE: &[&str] = &[
    "loved the story", "enjoyed every chapter", "found the plot gripping",
    "thought the characters were wonderful", "would read it again",
];
const NEGATIVE: &[&str] = &[
    "hated the ending", "found it boring", "thought the plot was thin",
    "could not finish the book", "wanted a refund",
];
const EXTRAS: &[&str] = &[
    "", " and recommended it", " after a long week", " despite the slow start",
    " on the train", " with friends",
];

struct Review {
    text: String,
    title: String,
    label: i64,
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn pick<'a>(&mut self, items: &[&'a str]) -> &'a str {
        items[(self.next_u64() % items.len() as u64) as usize]
    }
}

fn generate_reviews(rng: &mut SimpleRng, n: usize) -> Vec<Review> {
    (0..n)
        .map(|_| {
            let label = (rng.next_u64() % 2) as i64;
            let verb = rng.pick(if label == 1 { POSITIVE } else { NEGATIVE });
            let text = format!("{} {}{}.", rng.pick(SUBJECTS), verb, rng.pick(EXTRAS));
            let title = if label == 1 { "A great read" } else { "Disappointing" };
            Review {
                text,
                title: title.to_string(),
                label,
            }
        })
        .collect()
}

fn write_parquet(path: &Path, reviews: &[Review]) -> Result<()> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("text", DataType::Utf8, false),
        Field::new("title", DataType::Utf8, false),
        Field::new("label", DataType::Int64, false),
    ]));
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(StringArray::from_iter_values(reviews.iter().map(|r| r.text.as_str()))),
            Arc::new(StringArray::from_iter_values(reviews.iter().map(|r| r.title.as_str()))),
            Arc::new(Int64Array::from_iter_values(reviews.iter().map(|r| r.label))),
        ],
    )
    .context("Failed to create RecordBatch")?;

    let file = std::fs::File::create(path).context("Failed to create output file")?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("Failed to create writer")?;
    writer.write(&batch).context("Failed to write batch")?;
    writer.close().context("Failed to close writer")?;
    Ok(())
}

fn write_json(path: &Path, reviews: &[Review]) -> Result<()> {
    let rows: Vec<_> = reviews
        .iter()
        .map(|r| json!({ "text": r.text, "meta": { "title": r.title }, "label": r.label }))
        .collect();
    std::fs::write(path, serde_json::to_string_pretty(&rows)?).context("Failed to write JSON")?;
    Ok(())
}

fn sample_catalog() -> DatasetCatalog {
    let config = |name: &str, split: &str, file: &str, title: Vec<String>| ConfigEntry {
        name: name.to_string(),
        splits: BTreeMap::from([(split.to_string(), PathBuf::from(file))]),
        text_fields: vec![vec!["text".to_string()], title],
        label_field: Some("label".to_string()),
        label_names: vec!["negative".to_string(), "positive".to_string()],
    };
    DatasetCatalog {
        datasets: vec![DatasetEntry {
            name: "sample_reviews".to_string(),
            description: "Synthetic one-sentence book reviews with a sentiment label.".to_string(),
            configs: vec![
                config("parquet", "train", "sample_reviews/train.parquet", vec!["title".to_string()]),
                config(
                    "json",
                    "test",
                    "sample_reviews/test.json",
                    vec!["meta".to_string(), "title".to_string()],
                ),
            ],
        }],
        root: PathBuf::new(),
    }
}

fn main() -> Result<()> {
    let out = PathBuf::from(std::env::args().nth(1).unwrap_or_else(|| "datasets".to_string()));
    let dset_dir = out.join("sample_reviews");
    std::fs::create_dir_all(&dset_dir)
        .with_context(|| format!("creating {}", dset_dir.display()))?;

    let mut rng = SimpleRng::new(42);
    let mut train = generate_reviews(&mut rng, 2000);
    // A few exact repeats so the duplicates widget has something to show.
    for i in 0..25 {
        let r = &train[i * 7];
        let copy = Review {
            text: r.text.clone(),
            title: r.title.clone(),
            label: r.label,
        };
        train.push(copy);
    }
    let test = generate_reviews(&mut rng, 400);

    write_parquet(&dset_dir.join("train.parquet"), &train)?;
    write_json(&dset_dir.join("test.json"), &test)?;

    let catalog_path = out.join("catalog.json");
    std::fs::write(&catalog_path, serde_json::to_string_pretty(&sample_catalog())?)
        .context("Failed to write catalog")?;

    println!(
        "Wrote {} train and {} test reviews plus {}",
        train.len(),
        test.len(),
        catalog_path.display()
    );
    Ok(())
}
