use serde::{Deserialize, Serialize};

/// Ranks kept for the observed-versus-predicted plot.
pub const MAX_PLOTTED_RANKS: usize = 1000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZipfStats {
    /// Exponent of the fitted frequency distribution `p(x) ∝ x^-alpha`.
    pub alpha: f64,
    pub xmin: u64,
    pub ks_distance: f64,
    pub unique_words: usize,
    /// Word counts by rank (rank 1 first).
    pub observed: Vec<u64>,
    pub predicted: Vec<f64>,
}

impl ZipfStats {
    /// Exponent of the equivalent rank-frequency law `count ∝ rank^-s`.
    pub fn rank_exponent(&self) -> f64 {
        1.0 / (self.alpha - 1.0)
    }
}

/// Fit a discrete power law to word counts, choosing `xmin` by minimum
/// Kolmogorov–Smirnov distance. Counts need not be sorted.
pub fn fit(counts: &[u64]) -> Result<ZipfStats, String> {
    let mut sorted: Vec<u64> = counts.iter().copied().filter(|&c| c > 0).collect();
    sorted.sort_unstable();

    let mut candidates = sorted.clone();
    candidates.dedup();
    if candidates.len() < 2 {
        return Err(format!(
            "needs at least two distinct word counts, found {}",
            candidates.len()
        ));
    }

    let mut best: Option<(f64, u64, f64)> = None;
    for &xmin in &candidates {
        let start = sorted.partition_point(|&c| c < xmin);
        let tail = &sorted[start..];
        if tail.len() < 2 {
            break;
        }
        let alpha = mle_alpha(tail, xmin);
        let ks = ks_distance(tail, xmin, alpha);
        if best.map_or(true, |(best_ks, _, _)| ks < best_ks) {
            best = Some((ks, xmin, alpha));
        }
    }
    let Some((ks_distance, xmin, alpha)) = best else {
        return Err("no tail with at least two words".to_string());
    };

    let observed: Vec<u64> = sorted.iter().rev().take(MAX_PLOTTED_RANKS).copied().collect();
    let s = 1.0 / (alpha - 1.0);
    let top = observed.first().copied().unwrap_or(0) as f64;
    let predicted = (1..=observed.len())
        .map(|rank| top * (rank as f64).powf(-s))
        .collect();

    Ok(ZipfStats {
        alpha,
        xmin,
        ks_distance,
        unique_words: sorted.len(),
        observed,
        predicted,
    })
}

/// Discrete approximation of the maximum-likelihood exponent.
fn mle_alpha(tail: &[u64], xmin: u64) -> f64 {
    let shift = xmin as f64 - 0.5;
    let log_sum: f64 = tail.iter().map(|&x| (x as f64 / shift).ln()).sum();
    1.0 + tail.len() as f64 / log_sum
}

/// Maximum gap between the empirical CDF of `tail` (sorted ascending) and
/// the fitted `1 - (x / xmin)^(1 - alpha)`.
fn ks_distance(tail: &[u64], xmin: u64, alpha: f64) -> f64 {
    let n = tail.len() as f64;
    let mut max_gap: f64 = 0.0;
    let mut i = 0;
    while i < tail.len() {
        let x = tail[i];
        let j = i + tail[i..].partition_point(|&c| c == x);
        let empirical = j as f64 / n;
        let fitted = 1.0 - (x as f64 / xmin as f64).powf(1.0 - alpha);
        max_gap = max_gap.max((empirical - fitted).abs());
        i = j;
    }
    max_gap
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_count_value_cannot_be_fit() {
        assert!(fit(&[3, 3, 3]).is_err());
        assert!(fit(&[]).is_err());
    }

    #[test]
    fn zipfian_counts_fit_a_steep_exponent() {
        // count(rank) = 1000 / rank
        let counts: Vec<u64> = (1..=500).map(|r| 1000 / r).collect();
        let z = fit(&counts).unwrap();

        assert!(z.alpha > 1.5 && z.alpha < 2.6, "alpha = {}", z.alpha);
        assert!(z.ks_distance < 0.2);
        assert_eq!(z.unique_words, 500);
        assert_eq!(z.observed[0], 1000);
        assert_eq!(z.observed.len(), z.predicted.len());
        assert!((z.predicted[0] - 1000.0).abs() < 1e-9);
        assert!(z.predicted.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn observed_ranks_are_capped() {
        let counts: Vec<u64> = (1..=1500).map(|r| 3000 / r + 1).collect();
        let z = fit(&counts).unwrap();
        assert_eq!(z.observed.len(), MAX_PLOTTED_RANKS);
    }

    #[test]
    fn ks_distance_at_xmin_is_the_empirical_jump() {
        // All mass at xmin: the empirical CDF jumps to 1 at xmin.
        let gap = ks_distance(&[4, 4], 4, 2.0);
        assert!((gap - 1.0).abs() < 1e-12);
    }
}
