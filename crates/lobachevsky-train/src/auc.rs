//! Link-prediction AUC via the Mann–Whitney U statistic.

use std::cmp::Ordering;

/// Scores within this distance share a rank.
const TIE_TOLERANCE: f64 = 1e-15;

/// Probability that a random positive outscores a random negative, ties
/// counting half. Higher score means "more likely an edge".
///
/// Returns 0.5 when either side is empty.
pub fn link_auc(positive: &[f64], negative: &[f64]) -> f64 {
    if positive.is_empty() || negative.is_empty() {
        return 0.5;
    }

    let mut scored: Vec<(f64, bool)> = positive
        .iter()
        .map(|&s| (s, true))
        .chain(negative.iter().map(|&s| (s, false)))
        .collect();
    scored.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));

    // 1-based ranks, averaged over tie groups.
    let mut positive_rank_sum = 0.0;
    let mut start = 0;
    while start < scored.len() {
        let mut end = start + 1;
        while end < scored.len() && (scored[end].0 - scored[start].0).abs() < TIE_TOLERANCE {
            end += 1;
        }
        let rank = (start + 1 + end) as f64 / 2.0;
        let positives = scored[start..end].iter().filter(|(_, pos)| *pos).count();
        positive_rank_sum += rank * positives as f64;
        start = end;
    }

    let p = positive.len() as f64;
    let n = negative.len() as f64;
    let u = positive_rank_sum - p * (p + 1.0) / 2.0;
    (u / (p * n)).clamp(0.0, 1.0)
}
