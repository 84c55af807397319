//! Vector Similarity Functions
//!
//! Loop-unrolled primitives shared by every scoring backend.
//!
//! Sums are accumulated in f64 so squared norms of very large or very small
//! f32 components neither overflow nor flush to zero.

/// Compute dot product of two vectors
///
/// Uses unrolled loop for better CPU performance.
#[inline]
pub fn dot_product(a: &[f32], b: &[f32]) -> f64 {
    debug_assert_eq!(a.len(), b.len(), "Vector dimensions must match");

    let len = a.len().min(b.len());
    let mut sum = 0.0f64;

    // Process 4 elements at a time (manual unrolling)
    let chunks = len / 4;
    let remainder = len % 4;

    for i in 0..chunks {
        let idx = i * 4;
        sum += a[idx] as f64 * b[idx] as f64;
        sum += a[idx + 1] as f64 * b[idx + 1] as f64;
        sum += a[idx + 2] as f64 * b[idx + 2] as f64;
        sum += a[idx + 3] as f64 * b[idx + 3] as f64;
    }

    // Handle remainder
    for i in (len - remainder)..len {
        sum += a[i] as f64 * b[i] as f64;
    }

    sum
}

/// Euclidean norm, computed with the same accumulation order as `dot_product`
#[inline]
pub fn magnitude(v: &[f32]) -> f64 {
    dot_product(v, v).sqrt()
}

/// Cosine similarity from a precomputed dot product and norms.
///
/// Zero norms and non-finite ratios score 0.0; the result is clamped to
/// [-1.0, 1.0]. Every backend scores rows through this function.
#[inline]
pub fn bounded_cosine(dot: f64, norm_a: f64, norm_b: f64) -> f32 {
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    let sim = dot / (norm_a * norm_b);
    if sim.is_finite() {
        sim.clamp(-1.0, 1.0) as f32
    } else {
        0.0
    }
}

/// Compute cosine similarity between two vectors
///
/// Returns value in range [-1, 1] where 1 means identical direction.
#[inline]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "Vector dimensions must match");
    bounded_cosine(dot_product(a, b), magnitude(a), magnitude(b))
}

/// Normalize a vector in place
pub fn normalize_vector(v: &mut [f32]) {
    let mag = magnitude(v);
    if mag > 0.0 {
        for x in v.iter_mut() {
            *x = (*x as f64 / mag) as f32;
        }
    }
}
