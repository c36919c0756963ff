//! # Main — CLI Entry Point
//!
//! Routes subcommands to the arithmetic core. Handles the shared concerns:
//! `.env` loading, structured logging, config file loading, rayon pool size,
//! and the optional "press Enter to exit" pause.
//!
//! ## Subcommands
//!
//! - `rsa-table`: letter substitution table `x | e(x)` for 'A'..='Z'.
//! - `error-scan`: single-witness Miller-Rabin error sweep over odd integers.
//! - `error-rate`: error breakdown for one candidate.
//! - `is-prime`: Miller-Rabin verdict for explicit witnesses.
//! - `pow`: one modular exponentiation.
//!
//! ## Global Options
//!
//! - `--config` / `SQMR_CONFIG`: TOML file overriding built-in constants.
//! - `--cache-capacity`, `--cache-scope`: memo cache sizing and scope.
//! - `--threads` / `SQMR_THREADS`: rayon pool size for `error-scan --parallel`.
//! - `--pause`: wait for Enter before exiting.
//! - `LOG_FORMAT=json`: JSON logs; `RUST_LOG` sets the level (default `info`).

mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use sqmr::cache::CacheScope;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(
    name = "sqmr",
    about = "Memoized modular exponentiation, Miller-Rabin, and witness error analysis"
)]
struct Cli {
    /// TOML config file with [cache], [rsa] and [scan] sections
    #[arg(long, env = "SQMR_CONFIG")]
    config: Option<PathBuf>,

    /// Memo cache entries before a full clear (default 65536)
    #[arg(long)]
    cache_capacity: Option<usize>,

    /// Memo cache scope: per-modulus (default) or shared
    #[arg(long)]
    cache_scope: Option<CacheScope>,

    /// Number of rayon worker threads (defaults to all logical cores)
    #[arg(long, env = "SQMR_THREADS")]
    threads: Option<usize>,

    /// Wait for Enter before exiting
    #[arg(long)]
    pause: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the RSA substitution table x | e(x) for a range of letters
    RsaTable {
        /// Public exponent e (default 11)
        #[arg(long)]
        exponent: Option<u32>,
        /// Modulus n (default 3763)
        #[arg(long)]
        modulus: Option<u32>,
    },
    /// Scan odd integers for the highest single-witness Miller-Rabin error
    ErrorScan {
        /// Lower bound; the scan starts at the first odd value >= low (default 105000)
        #[arg(long)]
        low: Option<u32>,
        /// Exclusive upper bound (default 115000)
        #[arg(long)]
        high: Option<u32>,
        /// Number of highest-error candidates to keep (default 10)
        #[arg(long)]
        top_k: Option<usize>,
        /// Reference witnesses, comma separated (default 2,3)
        #[arg(long, value_delimiter = ',')]
        witnesses: Option<Vec<u32>>,
        /// Evaluate candidates on the rayon pool
        #[arg(long)]
        parallel: bool,
        /// Checkpoint file for resuming an interrupted scan
        #[arg(long)]
        checkpoint: Option<PathBuf>,
    },
    /// Show the single-witness error rate of one candidate
    ErrorRate {
        /// Candidate n (>= 2)
        #[arg(long)]
        n: u32,
        /// Reference witnesses, comma separated (default 2,3)
        #[arg(long, value_delimiter = ',')]
        witnesses: Option<Vec<u32>>,
    },
    /// Run Miller-Rabin on n with explicit witnesses
    IsPrime {
        /// Candidate n
        #[arg(long)]
        n: u32,
        /// Witnesses, comma separated (default: the configured reference set)
        #[arg(long, value_delimiter = ',')]
        witnesses: Option<Vec<u32>>,
    },
    /// Compute base^exponent mod modulus
    Pow {
        #[arg(long)]
        base: u32,
        /// Exponent (at most 32 significant bits)
        #[arg(long)]
        exponent: u64,
        #[arg(long)]
        modulus: u32,
    },
}

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    // Structured logging: LOG_FORMAT=json for log shippers, human-readable otherwise
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    if log_format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    }

    let cli = Cli::parse();
    let config = cli::load_config(&cli)?;
    cli::configure_rayon(cli.threads);

    let result = match &cli.command {
        Commands::RsaTable { exponent, modulus } => {
            cli::run_rsa_table(&config, *exponent, *modulus)
        }
        Commands::ErrorScan {
            low,
            high,
            top_k,
            witnesses,
            parallel,
            checkpoint,
        } => cli::run_error_scan(
            &config,
            cli::ScanOverrides {
                low: *low,
                high: *high,
                top_k: *top_k,
                witnesses: witnesses.clone(),
            },
            *parallel,
            checkpoint.as_deref(),
        ),
        Commands::ErrorRate { n, witnesses } => {
            cli::run_error_rate(&config, *n, witnesses.as_deref())
        }
        Commands::IsPrime { n, witnesses } => {
            cli::run_is_prime(&config, *n, witnesses.as_deref())
        }
        Commands::Pow {
            base,
            exponent,
            modulus,
        } => cli::run_pow(&config, *base, *exponent, *modulus),
    };

    if cli.pause {
        cli::wait_for_enter()?;
    }
    result
}
