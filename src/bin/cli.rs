//! walkv CLI
//!
//! Command-line interface operating directly on a walkv log file.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};
use walkv::wal::{StopReason, WalRecovery};
use walkv::{Store, SyncPolicy};

/// walkv CLI
#[derive(Parser, Debug)]
#[command(name = "walkv")]
#[command(about = "Durable key-value store backed by a write-ahead log")]
#[command(version)]
struct Args {
    /// Log file path
    #[arg(short, long, default_value = "./walkv.log")]
    path: PathBuf,

    /// Durability level: 0 = never fsync, 1 = fsync every write
    #[arg(short, long, default_value_t = 0)]
    sync: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Set a key-value pair
    Set {
        /// The key to set
        key: String,

        /// The value to set
        value: String,
    },

    /// Delete a key
    Del {
        /// The key to delete
        key: String,
    },

    /// Print every key-value pair, sorted by key
    Dump,

    /// Scan the log and report what recovery would find
    Verify,
}

fn main() {
    // Logs go to stderr so command output stays clean
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,walkv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> walkv::Result<()> {
    if let Commands::Verify = args.command {
        let result = WalRecovery::verify(&args.path)?;
        println!(
            "records:   {} ({} set, {} del)",
            result.records_applied, result.sets, result.deletes
        );
        println!("valid:     {} of {} bytes", result.valid_len, result.file_len);
        match result.stop {
            StopReason::EndOfLog if !result.has_torn_tail() => println!("status:    clean"),
            StopReason::EndOfLog => {
                println!("status:    torn tail ({} bytes)", result.torn_bytes())
            }
            StopReason::Corrupt { offset, cause } => {
                println!("status:    corrupt record at offset {}: {}", offset, cause)
            }
        }
        return Ok(());
    }

    let policy = SyncPolicy::try_from(args.sync)?;
    let store = Store::open(&args.path, policy)?;

    match args.command {
        Commands::Get { key } => match store.get(&key) {
            Some(value) => println!("{}", String::from_utf8_lossy(&value)),
            None => println!("(nil)"),
        },
        Commands::Set { key, value } => {
            store.set(&key, value.as_bytes())?;
            println!("OK");
        }
        Commands::Del { key } => {
            store.del(&key)?;
            println!("OK");
        }
        Commands::Dump => {
            for (key, value) in store.snapshot() {
                println!(
                    "{} = {}",
                    String::from_utf8_lossy(&key),
                    String::from_utf8_lossy(&value)
                );
            }
        }
        Commands::Verify => {}
    }

    store.close()
}
