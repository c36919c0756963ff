//! Error type shared by the arithmetic core.
//!
//! Every public operation works on `u32` values. Inputs that fall outside what
//! the fixed-width design can answer are rejected here instead of being
//! truncated or wrapped.

/// Precondition failures raised by `mod_pow`, `is_probable_prime`, and the
/// error analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithError {
    /// Modulus was zero; `a^b mod 0` is undefined.
    ZeroModulus,
    /// Exponent needs more than 32 significant bits.
    ExponentTooWide { exponent: u64 },
    /// Witness is congruent to 0 modulo the candidate.
    InvalidWitness { witness: u32, modulus: u32 },
    /// Miller-Rabin was called without any witness.
    EmptyWitnessSet,
    /// Every reference witness is a multiple of this scan candidate.
    NoUsableWitness { modulus: u32 },
    /// Error rate is only defined for n >= 2.
    ModulusTooSmall { modulus: u32 },
    /// Scan range is empty or starts below 2.
    InvalidRange { low: u32, high: u32 },
}

impl std::fmt::Display for ArithError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArithError::ZeroModulus => write!(f, "modulus must be at least 1"),
            ArithError::ExponentTooWide { exponent } => {
                write!(f, "exponent {} needs more than 32 bits", exponent)
            }
            ArithError::InvalidWitness { witness, modulus } => write!(
                f,
                "witness {} is congruent to 0 mod {} and cannot be used",
                witness, modulus
            ),
            ArithError::EmptyWitnessSet => write!(f, "at least one witness is required"),
            ArithError::NoUsableWitness { modulus } => write!(
                f,
                "every reference witness is a multiple of n = {}; add a witness that is not",
                modulus
            ),
            ArithError::ModulusTooSmall { modulus } => {
                write!(f, "error rate is undefined for n = {} (need n >= 2)", modulus)
            }
            ArithError::InvalidRange { low, high } => {
                write!(f, "invalid scan range [{}, {}): need 2 <= low < high", low, high)
            }
        }
    }
}

impl std::error::Error for ArithError {}
