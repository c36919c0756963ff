pub mod analysis;
pub mod cache;
pub mod checkpoint;
pub mod config;
pub mod error;
pub mod miller_rabin;
pub mod modpow;
pub mod progress;
pub mod rsa;
pub mod sweep;

pub use analysis::{error_rate, scan, CandidateError, ErrorBucket, ErrorRate, ScanConfig, ScanReport};
pub use cache::{CacheScope, ModExpCache};
pub use error::ArithError;
pub use miller_rabin::{is_prime_trial, is_probable_prime, witnesses_for, REFERENCE_WITNESSES};
pub use modpow::mod_pow;
