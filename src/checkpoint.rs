//! # Checkpoint — Resumable Scan State Persistence
//!
//! Saves and loads error-scan progress as JSON with SHA-256 integrity
//! verification and generational backups.
//!
//! ## Atomic Writes
//!
//! Each save shifts `scan.json` -> `scan.json.1` -> `scan.json.2`, writes the
//! new state to `scan.json.tmp` and renames it into place, so a crash mid-write
//! leaves the previous generations intact.
//!
//! ## Integrity
//!
//! The file stores the checkpoint next to the SHA-256 of its compact JSON
//! encoding. A file that does not parse or whose digest disagrees is skipped
//! and the next older generation is tried.
//!
//! ## Compatibility
//!
//! A checkpoint records the range, reference witnesses and bucket size it was
//! taken for. [`ScanCheckpoint::matches`] refuses to resume a scan whose
//! parameters differ.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::analysis::{ScanConfig, ScanState};

/// Number of backup generations to keep.
const GENERATIONS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanCheckpoint {
    pub low: u32,
    pub high: u32,
    pub top_k: usize,
    pub reference_witnesses: Vec<u32>,
    pub state: ScanState,
}

impl ScanCheckpoint {
    pub fn new(config: &ScanConfig, state: &ScanState) -> Self {
        ScanCheckpoint {
            low: config.low,
            high: config.high,
            top_k: config.top_k,
            reference_witnesses: config.reference_witnesses.clone(),
            state: state.clone(),
        }
    }

    /// Whether this checkpoint was taken for the same scan parameters.
    pub fn matches(&self, config: &ScanConfig) -> bool {
        self.low == config.low
            && self.high == config.high
            && self.top_k == config.top_k
            && self.reference_witnesses == config.reference_witnesses
            && self.state.next >= (config.low | 1)
    }

    /// Hex SHA-256 of the compact JSON encoding. Field order is fixed by the
    /// struct definition, so the encoding is stable across save and load.
    fn digest(&self) -> Result<String> {
        let bytes = serde_json::to_vec(self)?;
        Ok(format!("{:x}", Sha256::digest(&bytes)))
    }
}

/// On-disk form: the scan checkpoint together with its digest.
#[derive(Serialize, Deserialize)]
struct Sealed {
    sha256: String,
    checkpoint: ScanCheckpoint,
}

/// `path` with `suffix` appended to the file name (`scan.json` -> `scan.json.1`).
fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

/// Generation 0 is `path` itself; older ones carry `.1`, `.2`, ...
fn backup_path(path: &Path, generation: usize) -> PathBuf {
    match generation {
        0 => path.to_path_buf(),
        g => with_suffix(path, &format!(".{}", g)),
    }
}

/// Shift every existing generation one slot older; the oldest is overwritten.
fn rotate(path: &Path) -> Result<()> {
    for generation in (1..GENERATIONS).rev() {
        let newer = backup_path(path, generation - 1);
        if newer.exists() {
            let older = backup_path(path, generation);
            fs::rename(&newer, &older).with_context(|| {
                format!("rotating {} to {}", newer.display(), older.display())
            })?;
        }
    }
    Ok(())
}

/// Write `checkpoint` to `path`, keeping the previous writes as backups.
pub fn save(path: &Path, checkpoint: &ScanCheckpoint) -> Result<()> {
    let sealed = Sealed {
        sha256: checkpoint.digest()?,
        checkpoint: checkpoint.clone(),
    };
    let json = serde_json::to_string_pretty(&sealed)?;

    rotate(path)?;
    let tmp = with_suffix(path, ".tmp");
    fs::write(&tmp, json).with_context(|| format!("writing {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("replacing {}", path.display()))?;
    Ok(())
}

/// Newest generation that parses and matches its digest.
pub fn load(path: &Path) -> Option<ScanCheckpoint> {
    (0..GENERATIONS).find_map(|generation| {
        let file = backup_path(path, generation);
        let checkpoint = read_generation(&file)?;
        if generation > 0 {
            warn!(
                generation,
                path = %file.display(),
                "newer checkpoints unreadable, resuming from backup"
            );
        }
        Some(checkpoint)
    })
}

fn read_generation(file: &Path) -> Option<ScanCheckpoint> {
    let raw = fs::read_to_string(file).ok()?;
    let sealed: Sealed = match serde_json::from_str(&raw) {
        Ok(sealed) => sealed,
        Err(e) => {
            warn!(path = %file.display(), error = %e, "checkpoint is not valid JSON");
            return None;
        }
    };
    let actual = sealed.checkpoint.digest().ok()?;
    if actual != sealed.sha256 {
        warn!(
            path = %file.display(),
            stored = %sealed.sha256,
            actual = %actual,
            "checkpoint digest mismatch"
        );
        return None;
    }
    Some(sealed.checkpoint)
}

/// Remove every generation and any half-written temp file.
pub fn clear(path: &Path) {
    for generation in 0..GENERATIONS {
        let _ = fs::remove_file(backup_path(path, generation));
    }
    let _ = fs::remove_file(with_suffix(path, ".tmp"));
}
