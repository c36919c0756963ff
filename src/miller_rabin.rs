//! # Miller-Rabin — Strong Probable-Prime Test over Explicit Witnesses
//!
//! `is_probable_prime(n, witnesses)` runs the strong-pseudoprime test once per
//! caller-supplied witness and stops at the first witness that proves `n`
//! composite. The same routine serves both modes used by the error analysis:
//!
//! - **Reference mode**: the fixed set {2, 3}, which has no strong
//!   pseudoprimes below 1,373,653 and is therefore exact for small `n`.
//! - **Single-witness mode**: `[a]` for one base, whose false "probably
//!   prime" answers are what the error analysis counts.
//!
//! ## Algorithm
//!
//! Write `n - 1 = 2^r * d` with `d` odd. For a witness `a`, compute
//! `x = a^d mod n` and keep squaring while the running exponent `e` has not
//! reached `n - 1` and `x` is neither 1 nor `n - 1`. If the loop ends with
//! `x != n - 1` after at least one squaring step left `e` even, `a` is a
//! strong witness and `n` is composite.
//!
//! ## References
//!
//! - Gary L. Miller, "Riemann's Hypothesis and Tests for Primality", 1976.
//! - Michael O. Rabin, "Probabilistic Algorithm for Testing Primality", 1980.
//! - Pomerance, Selfridge, Wagstaff, "The pseudoprimes to 25·10^9", 1980
//!   (smallest strong pseudoprime to bases 2 and 3 is 1,373,653).

use crate::cache::ModExpCache;
use crate::error::ArithError;
use crate::modpow::{mod_pow, mul_mod};

/// Witness set that decides primality exactly for every n < 1,373,653.
pub const REFERENCE_WITNESSES: [u32; 2] = [2, 3];

/// Strong probable-prime test of `n` against each witness in order.
///
/// `n < 2` and even `n > 2` are rejected before any witness is examined.
/// Otherwise every witness must satisfy `a % n != 0`.
pub fn is_probable_prime(
    n: u32,
    witnesses: &[u32],
    cache: &mut ModExpCache,
) -> Result<bool, ArithError> {
    if witnesses.is_empty() {
        return Err(ArithError::EmptyWitnessSet);
    }
    if n < 2 {
        return Ok(false);
    }
    if n == 2 {
        return Ok(true);
    }
    if n & 1 == 0 {
        return Ok(false);
    }
    if let Some(&witness) = witnesses.iter().find(|&&a| a % n == 0) {
        return Err(ArithError::InvalidWitness {
            witness,
            modulus: n,
        });
    }

    let n_minus_1 = n - 1;
    let d = n_minus_1 >> n_minus_1.trailing_zeros();

    for &a in witnesses {
        let mut x = mod_pow(a, d as u64, n, cache)?;
        let mut e = d;
        while e != n_minus_1 && x != 1 && x != n_minus_1 {
            x = mul_mod(x, x, n);
            e <<= 1;
        }
        if x != n_minus_1 && e & 1 == 0 {
            return Ok(false);
        }
    }
    Ok(true)
}

/// The subset of `witnesses` usable for `n` (those not divisible by `n`).
///
/// Lets a fixed set such as {2, 3} be applied to n = 3.
pub fn witnesses_for(n: u32, witnesses: &[u32]) -> Vec<u32> {
    if n == 0 {
        return witnesses.to_vec();
    }
    witnesses.iter().copied().filter(|&a| a % n != 0).collect()
}

/// Trial division by 2, 3 and 6k ± 1 up to sqrt(n).
pub fn is_prime_trial(n: u32) -> bool {
    if n < 2 {
        return false;
    }
    if n < 4 {
        return true;
    }
    if n % 2 == 0 || n % 3 == 0 {
        return false;
    }
    let n = n as u64;
    let mut p = 5u64;
    while p * p <= n {
        if n % p == 0 || n % (p + 2) == 0 {
            return false;
        }
        p += 6;
    }
    true
}

#[cfg(test)]
mod tests {
    //! Tests for the Miller-Rabin loop and its trial-division oracle.
    //!
    //! Strong pseudoprimes from OEIS A001262 (base 2: 2047, 3277, 4033, ...)
    //! and A020229 (base 3: 121, 703, 1891, ...) must pass their own base and
    //! be caught by the other. The {2, 3} reference set must agree with trial
    //! division over [2, 10000].

    use super::*;

    const SPSP_BASE_2: [u32; 6] = [2047, 3277, 4033, 4681, 8321, 15841];
    const SPSP_BASE_3: [u32; 6] = [121, 703, 1891, 3281, 8401, 8911];

    fn check(n: u32, witnesses: &[u32]) -> bool {
        is_probable_prime(n, witnesses, &mut ModExpCache::new()).unwrap()
    }

    // ── Trivial Cases ───────────────────────────────────────────────

    #[test]
    fn below_two_is_not_prime() {
        assert!(!check(0, &[2]));
        assert!(!check(1, &[2]));
    }

    #[test]
    fn two_is_prime_for_any_witness() {
        assert!(check(2, &[2, 3]));
        assert!(check(2, &[1]));
    }

    #[test]
    fn even_numbers_are_composite() {
        for n in (4..200).step_by(2) {
            assert!(!check(n, &[3]), "{} reported prime", n);
        }
    }

    // ── Reference Witnesses ─────────────────────────────────────────

    /// {2, 3} is exact over [2, 10000] once witnesses divisible by n are dropped.
    #[test]
    fn reference_set_matches_trial_division() {
        let mut cache = ModExpCache::new();
        for n in 2..=10_000u32 {
            let witnesses = witnesses_for(n, &REFERENCE_WITNESSES);
            let verdict = is_probable_prime(n, &witnesses, &mut cache).unwrap();
            assert_eq!(verdict, is_prime_trial(n), "n = {}", n);
        }
    }

    #[test]
    fn carmichael_numbers_are_caught() {
        for n in [561u32, 1105, 1729, 2465, 2821, 6601, 8911] {
            assert!(!check(n, &REFERENCE_WITNESSES), "Carmichael {} passed", n);
        }
    }

    // ── Single Witnesses ────────────────────────────────────────────

    #[test]
    fn strong_pseudoprimes_fool_their_base_only() {
        for n in SPSP_BASE_2 {
            assert!(check(n, &[2]), "{} should pass base 2", n);
            assert!(!check(n, &[3]), "{} should fail base 3", n);
        }
        for n in SPSP_BASE_3 {
            assert!(check(n, &[3]), "{} should pass base 3", n);
            assert!(!check(n, &[2]), "{} should fail base 2", n);
        }
    }

    /// Bases 1 and n-1 are liars for every odd n.
    #[test]
    fn trivial_bases_always_pass() {
        for n in [9u32, 15, 21, 25, 91, 561] {
            assert!(check(n, &[1]));
            assert!(check(n, &[n - 1]));
        }
    }

    #[test]
    fn short_circuits_on_first_strong_witness() {
        // 2047 passes base 2, fails base 3; order must not matter for the verdict.
        assert!(!check(2047, &[2, 3]));
        assert!(!check(2047, &[3, 2]));
    }

    #[test]
    fn primes_pass_every_witness() {
        for p in [5u32, 101, 7919, 104_729] {
            let mut cache = ModExpCache::new();
            for a in 1..p.min(500) {
                assert!(
                    is_probable_prime(p, &[a], &mut cache).unwrap(),
                    "prime {} failed witness {}",
                    p,
                    a
                );
            }
        }
    }

    // ── Preconditions ───────────────────────────────────────────────

    #[test]
    fn empty_witness_set_is_rejected() {
        let err = is_probable_prime(7, &[], &mut ModExpCache::new());
        assert_eq!(err, Err(ArithError::EmptyWitnessSet));
    }

    #[test]
    fn witness_divisible_by_n_is_rejected() {
        let err = is_probable_prime(3, &[2, 3], &mut ModExpCache::new());
        assert_eq!(
            err,
            Err(ArithError::InvalidWitness {
                witness: 3,
                modulus: 3
            })
        );
        let err = is_probable_prime(7, &[14], &mut ModExpCache::new());
        assert!(matches!(err, Err(ArithError::InvalidWitness { .. })));
    }

    #[test]
    fn witnesses_for_drops_multiples_of_n() {
        assert_eq!(witnesses_for(3, &[2, 3]), vec![2]);
        assert_eq!(witnesses_for(2, &[2, 3]), vec![3]);
        assert_eq!(witnesses_for(5, &[2, 3]), vec![2, 3]);
        assert_eq!(witnesses_for(0, &[2, 3]), vec![2, 3]);
    }

    // ── Trial Division Oracle ───────────────────────────────────────

    #[test]
    fn trial_division_counts_primes_below_10000() {
        // pi(10000) = 1229 (OEIS A000720)
        assert_eq!((0..10_000u32).filter(|&n| is_prime_trial(n)).count(), 1229);
    }

    #[test]
    fn trial_division_at_width_limit() {
        assert!(is_prime_trial(4_294_967_291));
        assert!(!is_prime_trial(u32::MAX)); // 3 * 5 * 17 * 257 * 65537
    }
}
