//! Embedding similarity math for the style checker.
//!
//! The checker scores two images by the cosine similarity of their
//! pooled vision-transformer embeddings. Only the math lives here; the
//! embeddings themselves come from the external embedding sidecar.

use crate::error::CoreError;

/// Width of the pooled embedding produced by the embedding sidecar.
pub const EMBEDDING_DIMENSION: usize = 768;

/// Validate that an embedding has the sidecar's dimensionality.
pub fn validate_embedding_dimension(embedding: &[f32]) -> Result<(), CoreError> {
    if embedding.len() != EMBEDDING_DIMENSION {
        return Err(CoreError::Validation(format!(
            "Embedding must be {EMBEDDING_DIMENSION}-dimensional, got {}",
            embedding.len()
        )));
    }
    Ok(())
}

/// Euclidean norm of an embedding.
fn norm(v: &[f32]) -> f64 {
    v.iter().map(|x| (*x as f64) * (*x as f64)).sum::<f64>().sqrt()
}

/// Cosine similarity of two embeddings, in `[-1.0, 1.0]`.
///
/// The vectors must have equal length and non-zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f64, CoreError> {
    if a.len() != b.len() {
        return Err(CoreError::Validation(format!(
            "Embedding dimensions differ: {} vs {}",
            a.len(),
            b.len()
        )));
    }
    let (norm_a, norm_b) = (norm(a), norm(b));
    if norm_a == 0.0 || norm_b == 0.0 {
        return Err(CoreError::Validation(
            "Cannot compare a zero-norm embedding".to_string(),
        ));
    }
    let dot: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| (*x as f64) * (*y as f64))
        .sum();
    Ok((dot / (norm_a * norm_b)).clamp(-1.0, 1.0))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_vectors_score_one() {
        let v = vec![0.5f32, -1.0, 2.0];
        let score = cosine_similarity(&v, &v).unwrap();
        assert!((score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn opposite_vectors_score_minus_one() {
        let a = vec![1.0f32, 2.0, -3.0];
        let b: Vec<f32> = a.iter().map(|x| -x).collect();
        let score = cosine_similarity(&a, &b).unwrap();
        assert!((score + 1.0).abs() < 1e-9);
    }

    #[test]
    fn orthogonal_vectors_score_zero() {
        let score = cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).unwrap();
        assert!(score.abs() < 1e-9);
    }

    #[test]
    fn dimension_mismatch_rejected() {
        assert!(cosine_similarity(&[1.0, 2.0], &[1.0]).is_err());
    }

    #[test]
    fn zero_norm_rejected() {
        assert!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]).is_err());
    }

    #[test]
    fn validate_dimension_accepts_sidecar_width() {
        let embedding = vec![0.1f32; EMBEDDING_DIMENSION];
        assert!(validate_embedding_dimension(&embedding).is_ok());
    }

    #[test]
    fn validate_dimension_rejects_other_widths() {
        let embedding = vec![0.1f32; 512];
        assert!(validate_embedding_dimension(&embedding).is_err());
    }
}
