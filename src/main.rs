//! FusionCache CLI
//!
//! Operate a fusion cache directory from the shell.
//!
//! ```text
//! fusioncache --cache-dir ./cache put greeting hello
//! fusioncache --cache-dir ./cache get greeting
//! fusioncache --cache-dir ./cache stats --json
//! ```
//!
//! Every invocation opens the cache, runs one command and saves the memory
//! tier to disk before exiting.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::{error, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use fusioncache::cache::{DEFAULT_DISK_BUDGET, DEFAULT_MEMORY_BUDGET};
use fusioncache::{CacheValue, FusionCache, FusionConfig, Result, ValueKind};

// =============================================================================
// CLI Arguments
// =============================================================================

/// FusionCache - two-tier memory/disk key-value cache
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Root cache directory
    #[arg(long, env = "FUSIONCACHE_DIR", default_value = ".cache")]
    cache_dir: PathBuf,

    /// Subdirectory for disk tier files
    #[arg(long, env = "FUSIONCACHE_DISK_DIR_NAME")]
    disk_dir_name: Option<String>,

    /// Memory budget in bytes (0 disables the memory tier)
    #[arg(long, env = "FUSIONCACHE_MEMORY_BUDGET", default_value_t = DEFAULT_MEMORY_BUDGET)]
    memory_budget: u64,

    /// Disk budget in bytes (0 disables the disk tier)
    #[arg(long, env = "FUSIONCACHE_DISK_BUDGET", default_value_t = DEFAULT_DISK_BUDGET)]
    disk_budget: u64,

    /// Log every promotion and demotion at info level
    #[arg(long, env = "FUSIONCACHE_LOG_TIER_MOVES")]
    log_tier_moves: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "warn")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Store a value
    Put {
        key: String,
        value: String,
        /// How to interpret the value
        #[arg(long, default_value = "text")]
        kind: ValueKind,
    },
    /// Print a value
    Get {
        key: String,
        #[arg(long, default_value = "text")]
        kind: ValueKind,
    },
    /// Remove a key from both tiers
    Remove { key: String },
    /// Delete everything in both tiers
    Clear,
    /// Print tier sizes and counters
    Stats {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

// =============================================================================
// Main
// =============================================================================

fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize logging
    init_logging(&args);

    match run(args) {
        Ok(code) => code,
        Err(e) => {
            error!("{}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<ExitCode> {
    let config = FusionConfig {
        disk_dir_name: args.disk_dir_name,
        log_tier_moves: args.log_tier_moves,
        ..FusionConfig::new(args.memory_budget, args.disk_budget, args.cache_dir)
    };
    let cache = FusionCache::new(config)?;

    let code = match args.command {
        Command::Put { key, value, kind } => {
            let value = CacheValue::decode(kind, value.into_bytes().into())?;
            let placement = cache.put(&key, value)?;
            info!(key = %key, %placement, "Stored");
            println!("{}", placement);
            ExitCode::SUCCESS
        }
        Command::Get { key, kind } => match cache.get(&key, kind)? {
            Some(value) => {
                println!("{}", render(&value));
                ExitCode::SUCCESS
            }
            None => ExitCode::FAILURE,
        },
        Command::Remove { key } => {
            cache.remove(&key);
            ExitCode::SUCCESS
        }
        Command::Clear => {
            cache.clear();
            ExitCode::SUCCESS
        }
        Command::Stats { json } => {
            let stats = cache.stats();
            if json {
                let out = serde_json::to_string_pretty(&stats)
                    .map_err(|e| fusioncache::Error::Config(e.to_string()))?;
                println!("{}", out);
            } else {
                println!(
                    "memory: {} / {} ({} entries)",
                    stats.memory_size, stats.memory_max_size, stats.memory_entries
                );
                println!(
                    "disk:   {} / {} ({} entries)",
                    stats.disk_size, stats.disk_max_size, stats.disk_entries
                );
            }
            ExitCode::SUCCESS
        }
    };

    cache.save_all_to_disk();
    Ok(code)
}

fn render(value: &CacheValue) -> String {
    match value {
        CacheValue::Text(text) => text.clone(),
        CacheValue::Json(doc) => doc.to_string(),
        CacheValue::Bytes(data) => String::from_utf8_lossy(data).into_owned(),
    }
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}
