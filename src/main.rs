//! Wallet Firewall - transaction safety checks from the command line
//!
//! # WARNING
//! - A Low verdict is a heuristic, not a proof that a transaction is safe.
//! - Only the drainer shapes the engine knows about can be blocked.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::error;
use tracing_subscriber::EnvFilter;

use wallet_firewall::cli::commands;
use wallet_firewall::config::FirewallConfig;

/// Wallet Firewall - decode and risk-score transactions before signing
#[derive(Parser)]
#[command(name = "walletfw")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "walletfw.toml", env = "FIREWALL_CONFIG")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode and classify one base64 Solana transaction
    Decode {
        /// Base64 wire-format transaction
        tx: String,

        /// Wallet address (defaults to the fee payer)
        #[arg(long)]
        user: Option<String>,

        /// Declared intent: swap, dapp or unknown
        #[arg(long, default_value = "unknown")]
        intent: String,
    },

    /// Classify transactions that are signed together
    Batch {
        /// Base64 transactions in signing order
        #[arg(required = true)]
        txs: Vec<String>,

        /// Wallet address (defaults to each fee payer)
        #[arg(long)]
        user: Option<String>,

        /// Declared intent: swap, dapp or unknown
        #[arg(long, default_value = "unknown")]
        intent: String,
    },

    /// Check EVM call data for an ERC-20 approval
    Approval {
        /// Token contract address
        #[arg(long)]
        to: String,

        /// 0x-prefixed call data
        #[arg(long)]
        data: String,
    },

    /// Aggregate token-safety findings from a JSON file
    Verdict {
        /// JSON array of findings
        findings: PathBuf,
    },

    /// Show effective configuration
    Config,
}

fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let config = match FirewallConfig::load(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    init_tracing(config.logging.json);

    let firewall = match config.build_firewall() {
        Ok(firewall) => firewall,
        Err(e) => {
            error!("Failed to build firewall: {:#}", e);
            std::process::exit(1);
        }
    };

    // Execute command
    let result = match cli.command {
        Commands::Decode { tx, user, intent } => {
            commands::decode(&firewall, &tx, user.as_deref(), &intent)
        }
        Commands::Batch { txs, user, intent } => {
            commands::batch(&firewall, &txs, user.as_deref(), &intent)
        }
        Commands::Approval { to, data } => commands::approval(&firewall, &to, &data),
        Commands::Verdict { findings } => commands::verdict(&firewall, &findings),
        Commands::Config => commands::show_config(&config, &firewall),
    };

    if let Err(e) = result {
        error!("Command failed: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Logs go to stderr so stdout stays machine-readable
fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("wallet_firewall=info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
