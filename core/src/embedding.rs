use sha2::{Digest, Sha256};

const NGRAM: usize = 3;

/// Hash character trigrams of `text` into a unit-length vector.
///
/// Strings sharing most trigrams (a name and its one-letter typo) land close
/// together, so this stands in for a sentence encoder offline and in tests.
pub fn deterministic_embedding(text: &str, model_id: &str, dims: usize) -> Vec<f32> {
    let dims = dims.max(1);
    let mut out = vec![0.0_f32; dims];

    let normalized: Vec<char> = format!(" {} ", text.trim().to_lowercase())
        .chars()
        .collect();

    for window in normalized.windows(NGRAM) {
        let gram: String = window.iter().collect();

        let mut hasher = Sha256::new();
        hasher.update(model_id.as_bytes());
        hasher.update([0u8]);
        hasher.update(gram.as_bytes());
        let digest = hasher.finalize();

        let mut bucket = [0u8; 8];
        bucket.copy_from_slice(&digest[..8]);
        let slot = (u64::from_le_bytes(bucket) % dims as u64) as usize;
        let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
        out[slot] += sign;
    }

    let norm = out.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in &mut out {
            *value /= norm;
        }
    }

    out
}

/// Cosine similarity; `None` when the vectors are not comparable.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f32> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return Some(0.0);
    }

    Some(dot / (norm_a * norm_b))
}
