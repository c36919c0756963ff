//! # CLI Execution Functions
//!
//! Extracted from `main.rs` to keep the entry point slim. Each `run_*`
//! function applies command-line overrides on top of the loaded config, calls
//! into the library, and prints the result table to stdout. Logs go to stderr.

use anyhow::{Context, Result};
use sqmr::analysis::CandidateError;
use sqmr::config::{self, SqmrConfig};
use sqmr::progress::Progress;
use sqmr::sweep::{self, SweepOptions};
use sqmr::{
    error_rate, is_prime_trial, is_probable_prime, mod_pow, rsa, witnesses_for, ModExpCache,
};
use std::io::{BufRead, Write};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::Cli;

/// Interval between background progress log lines during a scan.
const PROGRESS_INTERVAL: Duration = Duration::from_secs(30);

// ── Configuration ───────────────────────────────────────────────

/// Load the TOML config (if any) and apply global cache overrides.
pub fn load_config(cli: &Cli) -> Result<SqmrConfig> {
    let mut config = config::load(cli.config.as_deref())?;
    if let Some(capacity) = cli.cache_capacity {
        config.cache.capacity = capacity;
    }
    if let Some(scope) = cli.cache_scope {
        config.cache.scope = scope;
    }
    config::validate_config(&config)?;
    debug!(
        capacity = config.cache.capacity,
        scope = %config.cache.scope,
        "configuration loaded"
    );
    Ok(config)
}

/// Size the global rayon pool. `None` or 0 keeps rayon's default (all cores).
pub fn configure_rayon(threads: Option<usize>) {
    let num_threads = threads.unwrap_or(0);
    if num_threads > 0 {
        if let Err(e) = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build_global()
        {
            warn!(error = %e, "Could not configure rayon thread pool");
        }
    }
}

pub fn wait_for_enter() -> Result<()> {
    print!("Press Enter to exit.");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(())
}

// ── RSA Table ───────────────────────────────────────────────────

pub fn run_rsa_table(
    config: &SqmrConfig,
    exponent: Option<u32>,
    modulus: Option<u32>,
) -> Result<()> {
    let mut rsa_config = config.rsa;
    if let Some(e) = exponent {
        rsa_config.exponent = e;
    }
    if let Some(n) = modulus {
        rsa_config.modulus = n;
    }

    let mut cache = ModExpCache::from_config(&config.cache);
    let rows = rsa::letter_table(&rsa_config, &mut cache)?;

    let mut out = std::io::stdout().lock();
    writeln!(out, "x | e(x)")?;
    for row in rows {
        writeln!(out, "{} | {}", row.letter, row.encrypted)?;
    }
    Ok(())
}

// ── Error Scan ──────────────────────────────────────────────────

/// Scan parameters given on the command line.
pub struct ScanOverrides {
    pub low: Option<u32>,
    pub high: Option<u32>,
    pub top_k: Option<usize>,
    pub witnesses: Option<Vec<u32>>,
}

pub fn run_error_scan(
    config: &SqmrConfig,
    overrides: ScanOverrides,
    parallel: bool,
    checkpoint: Option<&Path>,
) -> Result<()> {
    let mut config = config.clone();
    let settings = &mut config.scan;
    if let Some(low) = overrides.low {
        settings.low = low;
    }
    if let Some(high) = overrides.high {
        settings.high = high;
    }
    if let Some(top_k) = overrides.top_k {
        settings.top_k = top_k;
    }
    if let Some(witnesses) = overrides.witnesses {
        settings.reference_witnesses = witnesses;
    }
    config::validate_config(&config)?;

    let scan_config = config.scan.scan_config();
    let options = SweepOptions {
        cache: config.cache,
        parallel,
        block_size: config.scan.block_size,
        checkpoint,
        checkpoint_interval: Duration::from_secs(config.scan.checkpoint_interval_secs),
    };

    let progress = Progress::new(scan_config.candidate_count());
    let reporter = progress.start_reporter(PROGRESS_INTERVAL);

    let result = sweep::run(&scan_config, &options, &progress, |max: &CandidateError| {
        println!("New greatest error found: {} (n = {})", max.error, max.n);
    });

    progress.stop();
    let _ = reporter.join();
    let report = result?;
    progress.print_status();

    let mut out = std::io::stdout().lock();
    writeln!(out, "Max error: {}", report.max_rate())?;
    let entries: Vec<String> = report
        .top
        .iter()
        .map(|c| format!("  {}: {}", c.n, c.error))
        .collect();
    writeln!(out, "Maximized error values:\n{{\n{}\n}}", entries.join(",\n"))?;
    Ok(())
}

// ── Single Candidate ────────────────────────────────────────────

pub fn run_error_rate(config: &SqmrConfig, n: u32, witnesses: Option<&[u32]>) -> Result<()> {
    let reference = witnesses.unwrap_or(&config.scan.reference_witnesses);
    let mut cache = ModExpCache::from_config(&config.cache);
    let result = error_rate(n, reference, &mut cache)
        .with_context(|| format!("error rate of {} failed", n))?;
    let stats = cache.stats();
    info!(
        hits = stats.hits,
        misses = stats.misses,
        clears = stats.clears,
        hit_rate = format_args!("{:.3}", stats.hit_rate()),
        "modexp cache"
    );

    let mut out = std::io::stdout().lock();
    writeln!(out, "n = {}", n)?;
    writeln!(
        out,
        "reference verdict {:?}: {}",
        witnesses_for(n, reference),
        verdict(result.reference_prime)
    )?;
    writeln!(out, "trial division: {}", verdict(is_prime_trial(n)))?;
    writeln!(
        out,
        "disagreeing witnesses: {} of {}",
        result.error.disagreements,
        n.saturating_sub(2)
    )?;
    writeln!(out, "error: {}", result.error)?;
    Ok(())
}

/// Explicit witnesses are used as given, so one divisible by `n` is an error.
/// Without them the configured reference set is applied through
/// `witnesses_for`, which lets {2, 3} decide n = 2 and n = 3.
pub fn run_is_prime(config: &SqmrConfig, n: u32, witnesses: Option<&[u32]>) -> Result<()> {
    let witnesses = match witnesses {
        Some(explicit) => explicit.to_vec(),
        None => {
            let reference = &config.scan.reference_witnesses;
            let usable = witnesses_for(n, reference);
            // n < 2 drops every witness but is rejected before they are examined
            if usable.is_empty() {
                reference.clone()
            } else {
                usable
            }
        }
    };
    let mut cache = ModExpCache::from_config(&config.cache);
    let probable = is_probable_prime(n, &witnesses, &mut cache)?;
    let status = if probable { "probably prime" } else { "composite" };
    println!(
        "{} is {} (witnesses {:?}; trial division: {})",
        n,
        status,
        witnesses,
        verdict(is_prime_trial(n))
    );
    Ok(())
}

pub fn run_pow(config: &SqmrConfig, base: u32, exponent: u64, modulus: u32) -> Result<()> {
    let mut cache = ModExpCache::from_config(&config.cache);
    let result = mod_pow(base, exponent, modulus, &mut cache)?;
    println!("{}^{} mod {} = {}", base, exponent, modulus, result);
    Ok(())
}

fn verdict(prime: bool) -> &'static str {
    if prime {
        "prime"
    } else {
        "composite"
    }
}
