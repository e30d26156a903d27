//! Cosine similarity

/// Cosine similarity `dot(a, b) / (|a| * |b|)`
///
/// Returns NaN when either vector has zero norm. Callers must ensure equal
/// lengths; extra trailing components of the longer slice are ignored.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b.iter()) {
        let x = f64::from(x);
        let y = f64::from(y);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Similarity used for ranking: NaN ranks as negative infinity
#[inline]
#[must_use]
pub fn match_score(a: &[f32], b: &[f32]) -> f64 {
    let score = cosine_similarity(a, b);
    if score.is_nan() {
        f64::NEG_INFINITY
    } else {
        score
    }
}
