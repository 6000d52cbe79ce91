/// Element-wise mean of the member embeddings.
///
/// The dimension is taken from the first vector; members of any other length
/// are left out of the mean. Returns an empty vector when there is nothing to
/// average.
pub fn compute_centroid(vectors: &[&[f32]]) -> Vec<f32> {
    let Some(first) = vectors.first() else {
        return Vec::new();
    };
    let dim = first.len();
    let mut out = vec![0.0; dim];
    let mut counted = 0usize;

    for v in vectors.iter().filter(|v| v.len() == dim) {
        for (acc, x) in out.iter_mut().zip(v.iter()) {
            *acc += x;
        }
        counted += 1;
    }

    let n = counted as f32;
    for x in out.iter_mut() {
        *x /= n;
    }

    out
}
