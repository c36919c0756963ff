//! # ModPow — Square-and-Multiply with Memoized Squarings
//!
//! Computes `a^b mod n` for `u32` operands. The exponent is walked bit by bit;
//! every set bit `i` contributes the factor `a^(2^i) mod n`, taken from the
//! squaring chain
//!
//! ```text
//! a^(2^0) = a mod n
//! a^(2^k) = (a^(2^(k-1)))^2 mod n
//! ```
//!
//! Each link of the chain is looked up in the [`ModExpCache`] before it is
//! computed and stored after. The chain is built iteratively from the deepest
//! cached link upward, so there is no recursion.
//!
//! ## Width
//!
//! Operands and results are `u32`. Every product is formed in a `u64` and
//! reduced immediately, so results are exact for every `u32` input. Exponents
//! are accepted as `u64` but must fit in 32 bits.

use crate::cache::{fingerprint, ModExpCache};
use crate::error::ArithError;

/// Largest number of exponent bits the square-and-multiply loop consults.
pub const EXPONENT_BITS: u32 = 32;

/// `a * b mod n` with a widened intermediate.
#[inline]
pub fn mul_mod(a: u32, b: u32, n: u32) -> u32 {
    (a as u64 * b as u64 % n as u64) as u32
}

/// `a^b mod n` by square-and-multiply, memoizing `a^(2^i) mod n` in `cache`.
///
/// Fails with `ZeroModulus` for `n == 0` and `ExponentTooWide` when `b`
/// does not fit in 32 bits. `b == 0` yields `1 mod n`.
pub fn mod_pow(a: u32, b: u64, n: u32, cache: &mut ModExpCache) -> Result<u32, ArithError> {
    if n == 0 {
        return Err(ArithError::ZeroModulus);
    }
    let mut exp = u32::try_from(b).map_err(|_| ArithError::ExponentTooWide { exponent: b })?;

    cache.bind_modulus(n);
    let base = a % n;
    let mut result = 1 % n;
    let mut bit = 0;
    while exp != 0 && bit < EXPONENT_BITS {
        if exp & 1 == 1 {
            let factor = power_of_two_power(base, bit, n, cache);
            result = mul_mod(result, factor, n);
        }
        exp >>= 1;
        bit += 1;
    }
    Ok(result)
}

/// `base^(2^bit) mod n`, reusing the deepest cached link of the squaring chain.
fn power_of_two_power(base: u32, bit: u32, n: u32, cache: &mut ModExpCache) -> u32 {
    let mut k = bit;
    let mut value = loop {
        let key = fingerprint(base, 1 << k, n);
        if let Some(v) = cache.get(key) {
            break v;
        }
        if k == 0 {
            let v = base % n;
            cache.put(key, v);
            break v;
        }
        k -= 1;
    };

    while k < bit {
        k += 1;
        value = mul_mod(value, value, n);
        cache.put(fingerprint(base, 1 << k, n), value);
    }
    value
}

#[cfg(test)]
mod tests {
    //! Tests for the memoized square-and-multiply loop.
    //!
    //! Reference values come from the RSA demo parameters (e = 11, n = 3763)
    //! and from textbook cases. The width tests pin down the widened
    //! accumulator: products near 2^64 must reduce exactly instead of wrapping
    //! at 32 bits.

    use super::*;
    use crate::cache::CacheScope;

    /// Naive repeated multiplication, used as an independent reference.
    fn slow_pow(a: u32, b: u32, n: u32) -> u32 {
        let mut r = 1 % n as u64;
        for _ in 0..b {
            r = r * (a as u64 % n as u64) % n as u64;
        }
        r as u32
    }

    // ── Known Values ────────────────────────────────────────────────

    #[test]
    fn textbook_values() {
        let mut cache = ModExpCache::new();
        assert_eq!(mod_pow(2, 10, 1000, &mut cache), Ok(24));
        assert_eq!(mod_pow(3, 4, 100, &mut cache), Ok(81));
        assert_eq!(mod_pow(5, 0, 7, &mut cache), Ok(1));
        // Fermat: 7^560 = 1 mod 561 (561 is a Carmichael number)
        assert_eq!(mod_pow(7, 560, 561, &mut cache), Ok(1));
    }

    /// The first letters of the RSA demo table, e = 11, n = 3763 = 53 * 71.
    #[test]
    fn rsa_demo_letters() {
        let mut cache = ModExpCache::new();
        assert_eq!(mod_pow('A' as u32, 11, 3763, &mut cache), Ok(3288));
        assert_eq!(mod_pow('B' as u32, 11, 3763, &mut cache), Ok(705));
        assert_eq!(mod_pow('E' as u32, 11, 3763, &mut cache), Ok(153));
        assert_eq!(mod_pow('Z' as u32, 11, 3763, &mut cache), Ok(2762));
    }

    #[test]
    fn matches_repeated_multiplication() {
        let mut cache = ModExpCache::new();
        for n in [1u32, 2, 3, 10, 97, 3763] {
            for a in 0..40u32 {
                for b in 0..70u32 {
                    assert_eq!(
                        mod_pow(a, b as u64, n, &mut cache),
                        Ok(slow_pow(a, b, n)),
                        "a={}, b={}, n={}",
                        a,
                        b,
                        n
                    );
                }
            }
        }
    }

    // ── Edge Cases ──────────────────────────────────────────────────

    /// Zero exponent gives 1 mod n, which is 0 when n = 1.
    #[test]
    fn zero_exponent() {
        let mut cache = ModExpCache::new();
        assert_eq!(mod_pow(12345, 0, 1, &mut cache), Ok(0));
        assert_eq!(mod_pow(12345, 0, 2, &mut cache), Ok(1));
        assert_eq!(mod_pow(0, 0, 9, &mut cache), Ok(1));
    }

    #[test]
    fn zero_modulus_is_rejected() {
        let mut cache = ModExpCache::new();
        assert_eq!(mod_pow(3, 5, 0, &mut cache), Err(ArithError::ZeroModulus));
    }

    /// The largest 32-bit exponent is accepted; one more bit is not.
    #[test]
    fn exponent_width_limit() {
        let mut cache = ModExpCache::new();
        assert!(mod_pow(3, u32::MAX as u64, 1_000_003, &mut cache).is_ok());
        assert_eq!(
            mod_pow(3, 1 << 32, 1_000_003, &mut cache),
            Err(ArithError::ExponentTooWide { exponent: 1 << 32 })
        );
    }

    /// Moduli above 2^16 square to values above 2^32. With a 32-bit
    /// accumulator these would wrap; the widened accumulator keeps them exact.
    #[test]
    fn wide_modulus_is_exact() {
        let mut cache = ModExpCache::new();
        // 4294967291 is the largest prime below 2^32.
        assert_eq!(
            mod_pow(123_456_789, 987_654_321, 4_294_967_291, &mut cache),
            Ok(4_114_726_592)
        );
        // Fermat's little theorem at the width limit.
        assert_eq!(
            mod_pow(u32::MAX, 4_294_967_290, 4_294_967_291, &mut cache),
            Ok(1)
        );
    }

    #[test]
    fn base_is_reduced_first() {
        let mut cache = ModExpCache::new();
        for (a, b, n) in [(1000u32, 7u64, 13u32), (u32::MAX, 3, 97), (26, 9, 5)] {
            assert_eq!(
                mod_pow(a, b, n, &mut cache),
                mod_pow(a % n, b, n, &mut cache)
            );
        }
    }

    // ── Cache Interaction ───────────────────────────────────────────

    /// Results do not depend on what an earlier call left in the cache.
    #[test]
    fn idempotent_across_cache_states() {
        let mut warm = ModExpCache::new();
        let first = mod_pow(65, 11, 3763, &mut warm).unwrap();
        for n in [3763u32, 17, 29, 3763] {
            mod_pow(2, 1000, n, &mut warm).unwrap();
        }
        let second = mod_pow(65, 11, 3763, &mut warm).unwrap();
        let cold = mod_pow(65, 11, 3763, &mut ModExpCache::new()).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, cold);
    }

    /// The second call with the same operands is served from the cache.
    #[test]
    fn repeated_call_hits_cache() {
        let mut cache = ModExpCache::new();
        mod_pow(65, 11, 3763, &mut cache).unwrap();
        let after_first = cache.stats();
        mod_pow(65, 11, 3763, &mut cache).unwrap();
        let after_second = cache.stats();
        assert_eq!(after_second.insertions, after_first.insertions);
        assert!(after_second.hits > after_first.hits);
    }

    /// Bits 0..=k of the squaring chain are all stored: e = 11 = 0b1011
    /// needs 2^0, 2^1, 2^2 (on the way) and 2^3.
    #[test]
    fn squaring_chain_is_memoized() {
        let mut cache = ModExpCache::new();
        mod_pow(65, 11, 3763, &mut cache).unwrap();
        assert_eq!(cache.len(), 4);
        for bit in 0..4 {
            let expected = slow_pow(65, 1 << bit, 3763);
            assert_eq!(cache.get(fingerprint(65, 1 << bit, 3763)), Some(expected));
        }
    }

    /// A tiny cache is cleared mid-computation and still gives correct results.
    #[test]
    fn tiny_cache_still_correct() {
        let mut cache = ModExpCache::with_capacity(3);
        assert_eq!(mod_pow(7, 560, 561, &mut cache), Ok(1));
        assert_eq!(mod_pow(65, 11, 3763, &mut cache), Ok(3288));
        assert!(cache.stats().clears > 0);
        assert!(cache.len() <= 3);
    }

    /// Under the shared scope the fingerprint collision between
    /// (2, 2^0, 17) and (3, 2^0, 29) leaks a wrong factor. The per-modulus
    /// scope clears between moduli and returns the exact result.
    #[test]
    fn shared_scope_exposes_fingerprint_collision() {
        let mut shared = ModExpCache::new().with_scope(CacheScope::Shared);
        assert_eq!(mod_pow(2, 1, 17, &mut shared), Ok(2));
        assert_eq!(mod_pow(3, 1, 29, &mut shared), Ok(2));

        let mut scoped = ModExpCache::new();
        assert_eq!(mod_pow(2, 1, 17, &mut scoped), Ok(2));
        assert_eq!(mod_pow(3, 1, 29, &mut scoped), Ok(3));
    }
}
