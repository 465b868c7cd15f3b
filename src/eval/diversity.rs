//! Output diversity across repeated runs of the same prompt.
//!
//! Pairwise Jaccard similarity over normalized token/item sets, computed per
//! field across all C(N,2) pairs of parsed outputs, summarized as mean and
//! population standard deviation.

use std::collections::BTreeSet;

use serde_json::Value;

use super::document::PlanDocument;

/// Lowercased alphanumeric tokens of a string.
pub fn norm_tokens(s: &str) -> BTreeSet<String> {
    let mut out = BTreeSet::new();
    let mut cur = String::new();
    for c in s.chars() {
        let c = c.to_ascii_lowercase();
        if c.is_ascii_alphanumeric() {
            cur.push(c);
        } else if !cur.is_empty() {
            out.insert(std::mem::take(&mut cur));
        }
    }
    if !cur.is_empty() {
        out.insert(cur);
    }
    out
}

/// Normalize a field into a comparable item set: list items become
/// token-normalized strings, anything else becomes one item.
pub fn norm_items(v: &Value) -> BTreeSet<String> {
    let normalize_one = |item: &Value| -> String {
        match item {
            Value::String(s) => norm_tokens(s).into_iter().collect::<Vec<_>>().join(" "),
            other => other.to_string(),
        }
    };
    match v {
        Value::Null => BTreeSet::new(),
        Value::Array(items) => items.iter().map(normalize_one).collect(),
        other => std::iter::once(normalize_one(other)).collect(),
    }
}

/// Jaccard similarity of two sets. Two empty sets are identical (1.0).
pub fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    intersection as f64 / union as f64
}

/// Mean / population std / min / max of a sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairwiseStats {
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

/// Summarize a list of similarity values. None for an empty list.
pub fn pairwise_stats(values: &[f64]) -> Option<PairwiseStats> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let std = if values.len() > 1 {
        (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt()
    } else {
        0.0
    };
    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    Some(PairwiseStats { mean, std, min, max })
}

/// Per-field pairwise similarity across one batch of parsed outputs.
#[derive(Debug, Clone)]
pub struct BatchSimilarity {
    pub vision: Option<PairwiseStats>,
    pub outcomes: Option<PairwiseStats>,
    pub benefits: Option<PairwiseStats>,
    pub deliverables: Option<PairwiseStats>,
    pub tasks: Option<PairwiseStats>,
    /// Number of comparable pairs (invalid outputs are skipped).
    pub pairs: usize,
}

/// Compare all pairs of parsed outputs from identical prompt runs.
///
/// `None` entries (unparseable responses) are skipped pairwise, so one bad
/// run reduces the pair count instead of poisoning the statistics.
pub fn compare_batch(docs: &[Option<PlanDocument>]) -> BatchSimilarity {
    let mut vision = Vec::new();
    let mut outcomes = Vec::new();
    let mut benefits = Vec::new();
    let mut deliverables = Vec::new();
    let mut tasks = Vec::new();

    for (i, a) in docs.iter().enumerate() {
        for b in docs.iter().skip(i + 1) {
            let (Some(a), Some(b)) = (a, b) else {
                continue;
            };
            vision.push(jaccard(
                &norm_tokens(&super::textsim::textify(&a.vision)),
                &norm_tokens(&super::textsim::textify(&b.vision)),
            ));
            outcomes.push(jaccard(&norm_items(&a.outcomes), &norm_items(&b.outcomes)));
            benefits.push(jaccard(&norm_items(&a.benefits), &norm_items(&b.benefits)));
            deliverables.push(jaccard(
                &norm_items(&a.deliverables),
                &norm_items(&b.deliverables),
            ));
            tasks.push(jaccard(&norm_items(&a.tasks), &norm_items(&b.tasks)));
        }
    }

    BatchSimilarity {
        pairs: vision.len(),
        vision: pairwise_stats(&vision),
        outcomes: pairwise_stats(&outcomes),
        benefits: pairwise_stats(&benefits),
        deliverables: pairwise_stats(&deliverables),
        tasks: pairwise_stats(&tasks),
    }
}
