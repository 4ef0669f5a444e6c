//! Primitive type definitions for the spatial pooling algorithm.
//!
//! Type aliases keep the numeric width decisions in one place while leaving
//! the algorithm code readable.

/// 32-bit unsigned integer.
pub type UInt32 = u32;

/// 64-bit unsigned integer.
pub type UInt64 = u64;

/// Default unsigned integer type for counts and indices.
pub type UInt = UInt32;

/// Default floating point type for duty cycles, boost factors and densities.
pub type Real = f64;

/// Synapse permanence value (0.0 to 1.0).
pub type Permanence = f64;

/// Minimum permanence value.
pub const MIN_PERMANENCE: Permanence = 0.0;

/// Maximum permanence value.
pub const MAX_PERMANENCE: Permanence = 1.0;

/// Epsilon for floating point comparisons.
pub const EPSILON: Real = 1e-9;

/// Element type for dense binary vectors (0 or 1 per bit).
pub type ElemDense = u8;

/// Element type for sparse binary vectors (indices of set bits).
pub type ElemSparse = UInt32;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permanence_bounds() {
        assert!(MIN_PERMANENCE < MAX_PERMANENCE);
        assert!(EPSILON > 0.0);
        assert!(EPSILON < 0.001);
    }

    #[test]
    fn test_index_widths() {
        assert_eq!(core::mem::size_of::<ElemSparse>(), 4);
        assert_eq!(core::mem::size_of::<UInt>(), 4);
    }
}
