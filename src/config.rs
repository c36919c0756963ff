//! TOML configuration structs, parsing, and validation.
//!
//! Every constant of the two demos can be overridden from a TOML file; any
//! section or key left out falls back to the built-in defaults. Command-line
//! flags take precedence over the file.
//!
//! ```toml
//! [cache]
//! capacity = 65536
//! scope = "per-modulus"
//!
//! [rsa]
//! exponent = 11
//! modulus = 3763
//! first = "A"
//! last = "Z"
//!
//! [scan]
//! low = 105000
//! high = 115000
//! top_k = 10
//! reference_witnesses = [2, 3]
//! checkpoint_interval_secs = 60
//! block_size = 64
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::analysis::ScanConfig;
use crate::cache::{CacheScope, DEFAULT_CAPACITY};

/// Top-level configuration parsed from a TOML file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SqmrConfig {
    pub cache: CacheConfig,
    pub rsa: RsaConfig,
    pub scan: ScanSettings,
}

/// The `[cache]` section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub capacity: usize,
    pub scope: CacheScope,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            capacity: DEFAULT_CAPACITY,
            scope: CacheScope::PerModulus,
        }
    }
}

/// The `[rsa]` section: parameters of the letter substitution table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RsaConfig {
    pub exponent: u32,
    pub modulus: u32,
    pub first: char,
    pub last: char,
}

impl Default for RsaConfig {
    fn default() -> Self {
        RsaConfig {
            exponent: 11,
            modulus: 3763,
            first: 'A',
            last: 'Z',
        }
    }
}

/// The `[scan]` section: error-analysis sweep parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanSettings {
    pub low: u32,
    pub high: u32,
    pub top_k: usize,
    pub reference_witnesses: Vec<u32>,
    pub checkpoint_interval_secs: u64,
    /// Candidates evaluated between progress updates and checkpoint checks.
    pub block_size: usize,
}

impl Default for ScanSettings {
    fn default() -> Self {
        let scan = ScanConfig::default();
        ScanSettings {
            low: scan.low,
            high: scan.high,
            top_k: scan.top_k,
            reference_witnesses: scan.reference_witnesses,
            checkpoint_interval_secs: 60,
            block_size: 64,
        }
    }
}

impl ScanSettings {
    pub fn scan_config(&self) -> ScanConfig {
        ScanConfig {
            low: self.low,
            high: self.high,
            top_k: self.top_k,
            reference_witnesses: self.reference_witnesses.clone(),
        }
    }
}

/// Parse a TOML string into a validated config.
pub fn parse_toml(content: &str) -> Result<SqmrConfig> {
    let config: SqmrConfig = toml::from_str(content).context("Failed to parse config TOML")?;
    validate_config(&config)?;
    Ok(config)
}

/// Read and parse a TOML config file.
pub fn parse_toml_file(path: &Path) -> Result<SqmrConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_toml(&content)
}

/// Load `path` if given, otherwise the defaults.
pub fn load(path: Option<&Path>) -> Result<SqmrConfig> {
    match path {
        Some(p) => parse_toml_file(p),
        None => Ok(SqmrConfig::default()),
    }
}

pub fn validate_config(config: &SqmrConfig) -> Result<()> {
    if config.cache.capacity == 0 {
        anyhow::bail!("cache.capacity must be at least 1");
    }
    if config.rsa.modulus == 0 {
        anyhow::bail!("rsa.modulus must be at least 1");
    }
    if config.rsa.first > config.rsa.last {
        anyhow::bail!(
            "rsa.first ({:?}) must not come after rsa.last ({:?})",
            config.rsa.first,
            config.rsa.last
        );
    }
    let scan = &config.scan;
    if scan.low < 2 || scan.low >= scan.high {
        anyhow::bail!(
            "scan range [{}, {}) is invalid: need 2 <= low < high",
            scan.low,
            scan.high
        );
    }
    if scan.top_k == 0 {
        anyhow::bail!("scan.top_k must be at least 1");
    }
    if scan.reference_witnesses.is_empty() {
        anyhow::bail!("scan.reference_witnesses must not be empty");
    }
    if scan.reference_witnesses.contains(&0) {
        anyhow::bail!("scan.reference_witnesses must not contain 0");
    }
    if scan.block_size == 0 {
        anyhow::bail!("scan.block_size must be at least 1");
    }
    scan.scan_config().validate()?;
    Ok(())
}
