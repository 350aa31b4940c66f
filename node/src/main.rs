// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::sync::Arc;

use anyhow::Context;
use ledgerpost_kernel::{LogStorage, MemoryStorage, VerifiableLog};
use ledgerpost_node::config::{NodeConfig, NodeMode};
use ledgerpost_node::server::{build_delivery_router, build_log_router, DeliveryInbox, SharedLog};
use ledgerpost_persistence::FileLogStorage;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    ledgerpost_node::telemetry::init_telemetry();

    let cfg = NodeConfig::from_env()?;
    tracing::info!("Initializing LedgerPost node with config: {:?}", cfg);

    let app = match cfg.mode {
        NodeMode::Log => {
            let storage: Box<dyn LogStorage> = match &cfg.log_path {
                Some(path) => {
                    tracing::info!("Opening log file at {:?}", path);
                    Box::new(
                        FileLogStorage::open(path)
                            .with_context(|| format!("failed to open log file {:?}", path))?,
                    )
                }
                None => {
                    tracing::warn!("No LEDGERPOST_LOG_PATH set, log is kept in memory");
                    Box::new(MemoryStorage::new())
                }
            };
            let log: SharedLog = Arc::new(VerifiableLog::open(storage).context("failed to rebuild log")?);
            let root = log.current_root();
            tracing::info!("Log ready: size {} root {}", root.size, root.root_hash_hex());
            build_log_router(log, cfg.auth_token.clone())
        }
        NodeMode::Delivery => build_delivery_router(Arc::new(DeliveryInbox::new()), cfg.auth_token.clone()),
    };

    let listener = TcpListener::bind(cfg.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", cfg.bind_addr))?;
    tracing::info!("Listening on {} ({:?} service)", cfg.bind_addr, cfg.mode);

    axum::serve(listener, app).await?;
    Ok(())
}
