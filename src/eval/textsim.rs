//! Text similarity for propagation checks.
//!
//! [`similarity`] is the classic matching-blocks ratio: find the longest
//! common contiguous run, recurse on both sides, and score
//! `2 * matched / (len_a + len_b)` in [0, 1]. [`textify`] flattens arbitrary
//! JSON values into comparable strings so whole document fields can be
//! scored regardless of shape.

use std::collections::HashMap;

use serde_json::Value;

/// Flatten any JSON value to a comparable string: lists joined with " | ",
/// maps sorted by key and joined with " ; " as "key:value".
pub fn textify(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items
            .iter()
            .map(textify)
            .collect::<Vec<_>>()
            .join(" | "),
        Value::Object(map) => {
            // serde_json::Map preserves insertion order; sort for stability.
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            keys.iter()
                .map(|k| format!("{k}:{}", textify(&map[k.as_str()])))
                .collect::<Vec<_>>()
                .join(" ; ")
        }
    }
}

/// Similarity ratio between two strings, bounded in [0, 1].
///
/// Two empty strings are identical (1.0).
pub fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    let matches = total_matches(&a, &b);
    2.0 * matches as f64 / total as f64
}

/// Total length of all matching blocks between `a` and `b`.
fn total_matches(a: &[char], b: &[char]) -> usize {
    // Index positions of each character in b once.
    let mut b2j: HashMap<char, Vec<usize>> = HashMap::new();
    for (j, &c) in b.iter().enumerate() {
        b2j.entry(c).or_default().push(j);
    }

    let mut total = 0;
    let mut queue = vec![(0usize, a.len(), 0usize, b.len())];
    while let Some((alo, ahi, blo, bhi)) = queue.pop() {
        let (i, j, k) = longest_match(a, &b2j, alo, ahi, blo, bhi);
        if k > 0 {
            total += k;
            queue.push((alo, i, blo, j));
            queue.push((i + k, ahi, j + k, bhi));
        }
    }
    total
}

/// Longest contiguous matching run within `a[alo..ahi]` and `b[blo..bhi]`,
/// returned as (start in a, start in b, length).
fn longest_match(
    a: &[char],
    b2j: &HashMap<char, Vec<usize>>,
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let (mut besti, mut bestj, mut bestsize) = (alo, blo, 0usize);
    // j2len[j] = length of the run ending at a[i], b[j].
    let mut j2len: HashMap<usize, usize> = HashMap::new();

    for (i, &c) in a.iter().enumerate().take(ahi).skip(alo) {
        let mut newj2len: HashMap<usize, usize> = HashMap::new();
        if let Some(js) = b2j.get(&c) {
            for &j in js {
                if j < blo {
                    continue;
                }
                if j >= bhi {
                    break;
                }
                let k = if j > 0 {
                    j2len.get(&(j - 1)).copied().unwrap_or(0) + 1
                } else {
                    1
                };
                newj2len.insert(j, k);
                if k > bestsize {
                    besti = i + 1 - k;
                    bestj = j + 1 - k;
                    bestsize = k;
                }
            }
        }
        j2len = newj2len;
    }
    (besti, bestj, bestsize)
}
