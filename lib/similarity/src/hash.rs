//! String hashing and the seeded generator behind opaque query vectors.
//!
//! The hash is a 31-multiplier rolling hash over UTF-16 code units with
//! 32-bit two's-complement wraparound. Stored catalog vectors depend on it
//! bit for bit, so it must not change.

/// Rolling hash: `h = h * 31 + unit`, wrapping at 32 bits
#[inline]
pub fn rolling_hash(text: &str) -> i32 {
    text.encode_utf16().fold(0i32, |h, unit| {
        (h << 5).wrapping_sub(h).wrapping_add(i32::from(unit))
    })
}

/// Map a hash onto `0..buckets` using its magnitude
#[inline]
pub fn hash_bucket(hash: i32, buckets: usize) -> usize {
    hash.unsigned_abs() as usize % buckets
}

/// Fractional part of `sin(seed) * 10000`, in `[0, 1)`
#[inline]
pub fn seeded_fraction(seed: i64) -> f64 {
    let x = (seed as f64).sin() * 10000.0;
    x - x.floor()
}
