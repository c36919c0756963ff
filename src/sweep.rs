//! # Sweep — Block-Driven Error Scan with Checkpoints and Rayon
//!
//! Drives [`analysis`](crate::analysis) over a long range. The candidates are
//! processed in blocks; after each block the progress counters are updated and,
//! if enough time has passed, a checkpoint is written.
//!
//! ## Parallelism
//!
//! With `parallel` set, each block is evaluated on the rayon pool. Every rayon
//! job gets its own [`ModExpCache`] through `map_init`, so no cache is ever
//! shared between threads. Block results are collected in candidate order and
//! absorbed sequentially, which makes the report identical to a sequential
//! scan (including the bucket's tie-breaking).

use anyhow::Result;
use rayon::prelude::*;
use std::path::Path;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

use crate::analysis::{error_rate, odd_candidates, CandidateError, ScanConfig, ScanReport, ScanState};
use crate::cache::ModExpCache;
use crate::checkpoint::{self, ScanCheckpoint};
use crate::config::CacheConfig;
use crate::progress::Progress;

/// Execution options that do not affect the scan's result.
#[derive(Debug, Clone)]
pub struct SweepOptions<'a> {
    pub cache: CacheConfig,
    pub parallel: bool,
    pub block_size: usize,
    pub checkpoint: Option<&'a Path>,
    pub checkpoint_interval: Duration,
}

impl Default for SweepOptions<'_> {
    fn default() -> Self {
        SweepOptions {
            cache: CacheConfig::default(),
            parallel: false,
            block_size: 64,
            checkpoint: None,
            checkpoint_interval: Duration::from_secs(60),
        }
    }
}

/// Run an error scan, resuming from `options.checkpoint` when it matches `config`.
pub fn run<F>(
    config: &ScanConfig,
    options: &SweepOptions<'_>,
    progress: &Arc<Progress>,
    mut on_new_max: F,
) -> Result<ScanReport>
where
    F: FnMut(&CandidateError),
{
    config.validate()?;

    let mut state = match options.checkpoint.and_then(checkpoint::load) {
        Some(cp) if cp.matches(config) => {
            info!(
                next = cp.state.next,
                candidates = cp.state.candidates,
                "resuming error scan from checkpoint"
            );
            cp.state
        }
        _ => ScanState::new(config),
    };
    progress
        .tested
        .store(state.candidates, Ordering::Relaxed);

    let candidates: Vec<u32> = odd_candidates(state.next, config.high).collect();
    info!(
        low = config.low,
        high = config.high,
        remaining = candidates.len(),
        parallel = options.parallel,
        threads = rayon::current_num_threads(),
        "error scan starting"
    );

    let mut cache = ModExpCache::from_config(&options.cache);
    let mut last_checkpoint = Instant::now();

    for block in candidates.chunks(options.block_size.max(1)) {
        let (first, last) = (block[0], block[block.len() - 1]);
        progress.set_current(format!("n=[{}..{}]", first, last));

        let results: Vec<CandidateError> = if options.parallel {
            block
                .par_iter()
                .map_init(
                    || ModExpCache::from_config(&options.cache),
                    |cache, &n| error_rate(n, &config.reference_witnesses, cache),
                )
                .collect::<Result<_, _>>()?
        } else {
            block
                .iter()
                .map(|&n| error_rate(n, &config.reference_witnesses, &mut cache))
                .collect::<Result<_, _>>()?
        };

        for result in results {
            if let Some(max) = state.absorb(result) {
                progress.maxima.fetch_add(1, Ordering::Relaxed);
                on_new_max(max);
            }
        }
        progress
            .tested
            .fetch_add(block.len() as u64, Ordering::Relaxed);

        if let Some(path) = options.checkpoint {
            if last_checkpoint.elapsed() >= options.checkpoint_interval {
                checkpoint::save(path, &ScanCheckpoint::new(config, &state))?;
                info!(next = state.next, "checkpoint saved");
                last_checkpoint = Instant::now();
            }
        }
    }

    if let Some(path) = options.checkpoint {
        checkpoint::clear(path);
    }

    let report = state.into_report();
    info!(
        candidates = report.candidates,
        max_error = %report.max_rate(),
        "error scan complete"
    );
    Ok(report)
}
