//! Word-set similarity.

use std::collections::HashSet;

/// Jaccard similarity of the lowercase whitespace-separated word sets of
/// `a` and `b`, in `0.0..=1.0`. Two texts with no words score `0.0`.
pub fn jaccard_similarity(a: &str, b: &str) -> f64 {
    let a = word_set(a);
    let b = word_set(b);

    let union = a.union(&b).count();
    if union == 0 {
        return 0.0;
    }
    let intersection = a.intersection(&b).count();
    intersection as f64 / union as f64
}

fn word_set(text: &str) -> HashSet<String> {
    text.split_whitespace().map(str::to_lowercase).collect()
}
