//! Text clusters: hashed bag-of-words vectors grouped by average-linkage
//! agglomerative clustering.

use serde::{Deserialize, Serialize};

use super::tokenize::tokenize;
use crate::data::model::TextDataset;

pub const EMBEDDING_DIM: usize = 64;
/// Texts taken (in dataset order) for clustering.
pub const MAX_EMBEDDED_TEXTS: usize = 200;
const EXAMPLES_PER_NODE: usize = 5;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingStats {
    /// Row indices (into the text dataset) of the embedded texts.
    pub text_ids: Vec<usize>,
    pub embeddings: Vec<Vec<f32>>,
    /// Leaves first (one per embedded text), then merges; the root is last.
    pub node_list: Vec<ClusterNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterNode {
    pub id: usize,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    pub depth: usize,
    /// Number of texts below this node.
    pub size: usize,
    /// Cosine similarity at which the children merged (1 for leaves).
    pub merge_similarity: f32,
    pub examples: Vec<String>,
}

impl EmbeddingStats {
    pub fn root(&self) -> Option<&ClusterNode> {
        self.node_list.last()
    }

    pub fn node(&self, id: usize) -> Option<&ClusterNode> {
        self.node_list.get(id)
    }
}

/// Signed feature hashing of the text's tokens, L2-normalized.
pub fn embed(text: &str) -> Vec<f32> {
    let mut v = vec![0.0f32; EMBEDDING_DIM];
    for token in tokenize(text) {
        let h = fnv1a(token.as_bytes());
        let slot = (h % EMBEDDING_DIM as u64) as usize;
        let sign = if (h >> 63) == 0 { 1.0 } else { -1.0 };
        v[slot] += sign;
    }
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter_mut().for_each(|x| *x /= norm);
    }
    v
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0xcbf29ce484222325u64, |h, &b| {
        (h ^ b as u64).wrapping_mul(0x100000001b3)
    })
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

pub fn compute(dataset: &TextDataset) -> EmbeddingStats {
    let (text_ids, texts): (Vec<usize>, Vec<&str>) = dataset
        .texts()
        .enumerate()
        .filter(|(_, t)| !t.trim().is_empty())
        .take(MAX_EMBEDDED_TEXTS)
        .unzip();
    let embeddings: Vec<Vec<f32>> = texts.iter().map(|t| embed(t)).collect();
    let n = embeddings.len();

    let mut nodes: Vec<ClusterNode> = texts
        .iter()
        .enumerate()
        .map(|(id, text)| ClusterNode {
            id,
            parent: None,
            children: Vec::new(),
            depth: 0,
            size: 1,
            merge_similarity: 1.0,
            examples: vec![text.to_string()],
        })
        .collect();
    if n == 0 {
        return EmbeddingStats::default();
    }

    // Pairwise average-linkage similarity between active clusters, updated
    // with the Lance–Williams rule after every merge.
    let mut sim: Vec<Vec<f32>> = (0..n)
        .map(|i| (0..n).map(|j| cosine(&embeddings[i], &embeddings[j])).collect())
        .collect();
    // active[slot] = node id currently represented by matrix slot.
    let mut active: Vec<Option<usize>> = (0..n).map(Some).collect();

    for _ in 1..n {
        let mut best: Option<(usize, usize, f32)> = None;
        for i in 0..n {
            if active[i].is_none() {
                continue;
            }
            for j in (i + 1)..n {
                if active[j].is_none() {
                    continue;
                }
                if best.map_or(true, |(_, _, s)| sim[i][j] > s) {
                    best = Some((i, j, sim[i][j]));
                }
            }
        }
        let Some((i, j, similarity)) = best else {
            break;
        };
        let (Some(a), Some(b)) = (active[i], active[j]) else {
            break;
        };

        let id = nodes.len();
        let (size_a, size_b) = (nodes[a].size, nodes[b].size);
        let examples = nodes[a]
            .examples
            .iter()
            .chain(&nodes[b].examples)
            .take(EXAMPLES_PER_NODE)
            .cloned()
            .collect();
        nodes[a].parent = Some(id);
        nodes[b].parent = Some(id);
        nodes.push(ClusterNode {
            id,
            parent: None,
            children: vec![a, b],
            depth: 0,
            size: size_a + size_b,
            merge_similarity: similarity,
            examples,
        });

        // Slot i now holds the merged cluster, slot j is retired.
        let (wa, wb) = (size_a as f32, size_b as f32);
        for k in 0..n {
            if active[k].is_none() || k == i || k == j {
                continue;
            }
            let merged = (wa * sim[i][k] + wb * sim[j][k]) / (wa + wb);
            sim[i][k] = merged;
            sim[k][i] = merged;
        }
        active[i] = Some(id);
        active[j] = None;
    }

    // Depths from the root down; children always have smaller ids.
    for id in (0..nodes.len()).rev() {
        if let Some(parent) = nodes[id].parent {
            nodes[id].depth = nodes[parent].depth + 1;
        }
    }

    EmbeddingStats {
        text_ids,
        embeddings,
        node_list: nodes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::TextRecord;

    #[test]
    fn embeddings_are_unit_length_and_deterministic() {
        let a = embed("the quick brown fox");
        let b = embed("the quick brown fox");
        assert_eq!(a, b);
        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
        assert!(embed("...").iter().all(|x| *x == 0.0));
    }

    #[test]
    fn similar_texts_merge_first_and_tree_is_complete() {
        let ds = TextDataset::from_records(
            [
                "red apples and green apples",
                "",
                "the stock market fell sharply",
                "green apples and red apples",
                "the stock market rose sharply",
            ]
            .into_iter()
            .map(TextRecord::new)
            .collect(),
        );
        let stats = compute(&ds);

        assert_eq!(stats.text_ids, vec![0, 2, 3, 4]);
        // 4 leaves + 3 merges.
        assert_eq!(stats.node_list.len(), 7);
        let root = stats.root().unwrap();
        assert_eq!(root.size, 4);
        assert_eq!(root.depth, 0);
        assert!(root.parent.is_none());

        // The two apple texts are identical bags of words.
        let first_merge = &stats.node_list[4];
        assert_eq!(first_merge.children, vec![0, 2]);
        assert!((first_merge.merge_similarity - 1.0).abs() < 1e-5);
        assert!(stats.node_list[..4].iter().all(|leaf| leaf.depth >= 1));
    }

    #[test]
    fn empty_dataset_has_no_tree() {
        let stats = compute(&TextDataset::default());
        assert!(stats.root().is_none());
    }
}
