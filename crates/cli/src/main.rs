// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use clap::{Parser, Subcommand};
use ledgerpost_cli::commands::send::SendOptions;
use ledgerpost_cli::commands::{inspect, root, send, verify};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "ledgerpost")]
#[command(about = "LedgerPost - log every message in a verifiable log before it is delivered", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log each message, then forward it to the delivery service.
    Send {
        #[arg(long, default_value = "127.0.0.1:50052")]
        log_addr: String,

        #[arg(long, default_value = "127.0.0.1:50051")]
        delivery_addr: String,

        #[arg(long, default_value_t = 1000)]
        connect_timeout_ms: u64,

        /// Budget for log + verify + forward of one message
        #[arg(long, default_value_t = 5000)]
        send_timeout_ms: u64,

        /// Only forward once the inclusion proof checks out
        #[arg(long)]
        verify_proof: bool,

        /// Defaults to $USER
        #[arg(long, env = "USER", default_value = "anonymous")]
        author: String,

        /// Append a JSON receipt per delivered message to this file
        #[arg(long)]
        receipts: Option<PathBuf>,

        /// Keep going after a failed message instead of stopping
        #[arg(long)]
        continue_on_error: bool,

        #[arg(long, env = "LEDGERPOST_AUTH_TOKEN")]
        auth_token: Option<String>,

        #[arg(required = true)]
        messages: Vec<String>,
    },
    /// Show the log's current root
    Root {
        #[arg(long, default_value = "127.0.0.1:50052")]
        log_addr: String,

        #[arg(long, default_value_t = 5000)]
        timeout_ms: u64,

        #[arg(long, env = "LEDGERPOST_AUTH_TOKEN")]
        auth_token: Option<String>,
    },
    /// Verify stored receipts offline
    Verify {
        receipts_path: PathBuf,
    },
    /// Rebuild a log file offline and list its entries
    Inspect {
        log_path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    ledgerpost_node::telemetry::init_logging();

    let cli = Cli::parse();

    match cli.command {
        Commands::Send {
            log_addr,
            delivery_addr,
            connect_timeout_ms,
            send_timeout_ms,
            verify_proof,
            author,
            receipts,
            continue_on_error,
            auth_token,
            messages,
        } => {
            let opts = SendOptions {
                log_addr,
                delivery_addr,
                connect_timeout_ms,
                send_timeout_ms,
                verify_proof,
                author,
                receipts,
                continue_on_error,
                auth_token,
            };
            send::run(&opts, messages).await?;
        }
        Commands::Root {
            log_addr,
            timeout_ms,
            auth_token,
        } => {
            root::run(&log_addr, Duration::from_millis(timeout_ms), auth_token.as_deref()).await?;
        }
        Commands::Verify { receipts_path } => verify::run(&receipts_path)?,
        Commands::Inspect { log_path } => {
            inspect::run(&log_path)?;
        }
    }
    Ok(())
}
