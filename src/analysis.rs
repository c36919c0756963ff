//! # Analysis — Single-Witness Error Rates of Miller-Rabin
//!
//! Measures how often a single Miller-Rabin witness gives the wrong answer.
//! For a candidate `n` the reference verdict comes from the witnesses {2, 3}
//! (exact below 1,373,653). Every base `a` in `[1, n-1)` is then tried alone
//! and each disagreement with the reference counts as an error:
//!
//! ```text
//! error(n) = #{ a in [1, n-1) : MR(n, [a]) != MR(n, {2,3}) } / (n - 1)
//! ```
//!
//! Errors are kept as exact rationals ([`ErrorRate`]) so that equal rates
//! compare equal regardless of their denominators.
//!
//! ## Scan
//!
//! [`scan`] walks the odd integers of `[low, high)`, tracks the running
//! maximum (a candidate becomes the new maximum only when it strictly exceeds
//! the previous one, starting from 0) and keeps the K highest rates in an
//! [`ErrorBucket`]. The bucket does not keep a stable top-K: once full, any
//! rate at least as large as the current minimum evicts the first entry
//! holding that minimum.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::{debug, info};

use crate::cache::ModExpCache;
use crate::error::ArithError;
use crate::miller_rabin::{is_probable_prime, witnesses_for, REFERENCE_WITNESSES};

/// Default number of highest-error candidates kept by a scan.
pub const DEFAULT_TOP_K: usize = 10;

/// Exact fraction `disagreements / total` in `[0, 1]`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ErrorRate {
    pub disagreements: u64,
    pub total: u64,
}

impl ErrorRate {
    pub const ZERO: ErrorRate = ErrorRate {
        disagreements: 0,
        total: 1,
    };

    pub fn as_f64(&self) -> f64 {
        self.disagreements as f64 / self.total as f64
    }
}

impl PartialEq for ErrorRate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ErrorRate {}

impl PartialOrd for ErrorRate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ErrorRate {
    fn cmp(&self, other: &Self) -> Ordering {
        let lhs = self.disagreements as u128 * other.total as u128;
        let rhs = other.disagreements as u128 * self.total as u128;
        lhs.cmp(&rhs)
    }
}

impl std::fmt::Display for ErrorRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:.10} ({}/{})",
            self.as_f64(),
            self.disagreements,
            self.total
        )
    }
}

/// Error measurement for one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateError {
    pub n: u32,
    /// Verdict of the reference witnesses.
    pub reference_prime: bool,
    pub error: ErrorRate,
}

/// Fraction of single witnesses in `[1, n-1)` whose verdict on `n` differs
/// from the verdict of `reference` (normally {2, 3}).
pub fn error_rate(
    n: u32,
    reference: &[u32],
    cache: &mut ModExpCache,
) -> Result<CandidateError, ArithError> {
    if n < 2 {
        return Err(ArithError::ModulusTooSmall { modulus: n });
    }
    let reference = witnesses_for(n, reference);
    let reference_prime = is_probable_prime(n, &reference, cache)?;

    let mut disagreements = 0u64;
    for a in 1..n - 1 {
        if is_probable_prime(n, &[a], cache)? != reference_prime {
            disagreements += 1;
        }
    }

    Ok(CandidateError {
        n,
        reference_prime,
        error: ErrorRate {
            disagreements,
            total: (n - 1) as u64,
        },
    })
}

/// Bounded collection of the highest error rates seen so far.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBucket {
    capacity: usize,
    entries: Vec<CandidateError>,
}

impl ErrorBucket {
    pub fn new(capacity: usize) -> Self {
        ErrorBucket {
            capacity,
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Offer a candidate; returns whether it was retained.
    pub fn offer(&mut self, candidate: CandidateError) -> bool {
        if self.entries.len() < self.capacity {
            self.entries.push(candidate);
            return true;
        }
        match self.min_index() {
            Some(idx) if candidate.error >= self.entries[idx].error => {
                self.entries.remove(idx);
                self.entries.push(candidate);
                true
            }
            _ => false,
        }
    }

    /// First entry holding the smallest error.
    fn min_index(&self) -> Option<usize> {
        self.entries
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.error.cmp(&b.1.error))
            .map(|(idx, _)| idx)
    }

    pub fn min(&self) -> Option<ErrorRate> {
        self.min_index().map(|idx| self.entries[idx].error)
    }

    /// Entries in insertion order.
    pub fn entries(&self) -> &[CandidateError] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Highest error first, ties by ascending `n`.
    pub fn into_sorted(mut self) -> Vec<CandidateError> {
        self.entries
            .sort_by(|a, b| b.error.cmp(&a.error).then(a.n.cmp(&b.n)));
        self.entries
    }
}

/// Parameters of an error scan over the odd integers of `[low, high)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanConfig {
    pub low: u32,
    pub high: u32,
    pub top_k: usize,
    pub reference_witnesses: Vec<u32>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        ScanConfig {
            low: 105_000,
            high: 115_000,
            top_k: DEFAULT_TOP_K,
            reference_witnesses: REFERENCE_WITNESSES.to_vec(),
        }
    }
}

impl ScanConfig {
    pub fn validate(&self) -> Result<(), ArithError> {
        if self.low < 2 || self.low >= self.high {
            return Err(ArithError::InvalidRange {
                low: self.low,
                high: self.high,
            });
        }
        if self.reference_witnesses.is_empty() {
            return Err(ArithError::EmptyWitnessSet);
        }
        // A candidate divides a nonzero witness only if it is not larger than it.
        let largest = self
            .reference_witnesses
            .iter()
            .copied()
            .filter(|&w| w != 0)
            .max()
            .unwrap_or(self.high);
        let end = self.high.min(largest.saturating_add(1));
        if let Some(n) = odd_candidates(self.low, end)
            .find(|&n| witnesses_for(n, &self.reference_witnesses).is_empty())
        {
            return Err(ArithError::NoUsableWitness { modulus: n });
        }
        Ok(())
    }

    /// Number of odd candidates in the range.
    pub fn candidate_count(&self) -> u64 {
        odd_candidates(self.low, self.high).len() as u64
    }
}

/// Odd integers from the first odd value `>= low` up to (excluding) `high`.
pub fn odd_candidates(low: u32, high: u32) -> std::iter::StepBy<std::ops::Range<u32>> {
    ((low | 1)..high).step_by(2)
}

/// Running state of a scan; serializable so a scan can be resumed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanState {
    /// Next candidate to evaluate.
    pub next: u32,
    pub candidates: u64,
    pub max_error: Option<CandidateError>,
    pub bucket: ErrorBucket,
}

impl ScanState {
    pub fn new(config: &ScanConfig) -> Self {
        ScanState {
            next: config.low | 1,
            candidates: 0,
            max_error: None,
            bucket: ErrorBucket::new(config.top_k),
        }
    }

    /// Record one result. Returns the candidate if it is a new running maximum.
    ///
    /// Results must be absorbed in ascending candidate order.
    pub fn absorb(&mut self, result: CandidateError) -> Option<&CandidateError> {
        self.candidates += 1;
        self.next = result.n.saturating_add(2);
        self.bucket.offer(result);

        let current = self.max_error.map_or(ErrorRate::ZERO, |m| m.error);
        if result.error > current {
            debug!(n = result.n, error = %result.error, "new maximum error");
            self.max_error = Some(result);
            self.max_error.as_ref()
        } else {
            None
        }
    }

    pub fn into_report(self) -> ScanReport {
        ScanReport {
            candidates: self.candidates,
            max_error: self.max_error,
            top: self.bucket.into_sorted(),
        }
    }
}

/// Outcome of a completed scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanReport {
    pub candidates: u64,
    pub max_error: Option<CandidateError>,
    /// Highest errors, largest first.
    pub top: Vec<CandidateError>,
}

impl ScanReport {
    /// Maximum error, or 0 when no candidate had a nonzero error.
    pub fn max_rate(&self) -> ErrorRate {
        self.max_error.map_or(ErrorRate::ZERO, |m| m.error)
    }
}

/// Sequential scan of the odd candidates in `config`'s range.
///
/// `on_new_max` is called each time the running maximum increases.
pub fn scan<F>(
    config: &ScanConfig,
    cache: &mut ModExpCache,
    mut on_new_max: F,
) -> Result<ScanReport, ArithError>
where
    F: FnMut(&CandidateError),
{
    config.validate()?;
    info!(
        low = config.low,
        high = config.high,
        candidates = config.candidate_count(),
        "error scan starting"
    );

    let mut state = ScanState::new(config);
    for n in odd_candidates(config.low, config.high) {
        let result = error_rate(n, &config.reference_witnesses, cache)?;
        if let Some(max) = state.absorb(result) {
            on_new_max(max);
        }
    }

    let report = state.into_report();
    info!(
        candidates = report.candidates,
        max_error = %report.max_rate(),
        "error scan complete"
    );
    Ok(report)
}
