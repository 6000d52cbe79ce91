/// Cosine similarity between two embeddings.
///
/// Degenerate input (mismatched lengths, empty vectors, zero magnitude, or a
/// non-finite result) yields `0.0` so it can never trigger a merge.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0;
    let mut na = 0.0;
    let mut nb = 0.0;

    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        na += x * x;
        nb += y * y;
    }

    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }

    let sim = dot / (na.sqrt() * nb.sqrt());
    if sim.is_finite() {
        sim.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

/// Same as [`cosine_similarity`], but treats a missing embedding as unrelated.
pub fn cosine_similarity_opt(a: Option<&[f32]>, b: Option<&[f32]>) -> f32 {
    match (a, b) {
        (Some(a), Some(b)) => cosine_similarity(a, b),
        _ => 0.0,
    }
}
