// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use ledgerpost_node::config::PipelineConfig;
use ledgerpost_node::network::{HttpDeliverySink, HttpLogClient};
use ledgerpost_node::pipeline::{new_entry, BatchPolicy, DeliveryPipeline, PipelineResult};

use super::receipts::{self, StoredReceipt};
use super::service_url;

#[derive(Debug, Clone)]
pub struct SendOptions {
    pub log_addr: String,
    pub delivery_addr: String,
    pub connect_timeout_ms: u64,
    pub send_timeout_ms: u64,
    pub verify_proof: bool,
    pub author: String,
    pub receipts: Option<PathBuf>,
    pub continue_on_error: bool,
    pub auth_token: Option<String>,
}

impl SendOptions {
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            log_service_url: service_url(&self.log_addr),
            delivery_service_url: service_url(&self.delivery_addr),
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            send_timeout: Duration::from_millis(self.send_timeout_ms),
            verify_proof: self.verify_proof,
            ..Default::default()
        }
    }
}

/// Send each message in order. Returns how many were delivered.
pub async fn run(opts: &SendOptions, messages: Vec<String>) -> anyhow::Result<usize> {
    if messages.is_empty() {
        anyhow::bail!("nothing to send");
    }

    let cfg = opts.pipeline_config();
    let mut log = HttpLogClient::new(&cfg.log_service_url, cfg.connect_timeout)?;
    let mut sink = HttpDeliverySink::new(&cfg.delivery_service_url, cfg.connect_timeout)?;
    if let Some(token) = &opts.auth_token {
        log = log.with_auth_token(token);
        sink = sink.with_auth_token(token);
    }
    let pipeline = DeliveryPipeline::new(Arc::new(log), Arc::new(sink), cfg);

    let entries: Vec<_> = messages
        .into_iter()
        .map(|payload| new_entry(opts.author.as_str(), payload))
        .collect();
    let policy = if opts.continue_on_error {
        BatchPolicy::ContinueOnError
    } else {
        BatchPolicy::AbortOnFailure
    };

    let results = pipeline.send_batch(entries.clone(), policy).await;

    let mut delivered = Vec::new();
    let mut failures = 0;
    for (entry, result) in entries.into_iter().zip(&results) {
        match result {
            PipelineResult::Delivered(receipt) => {
                println!(
                    "✅ '{}' logged at leaf {} (root {} @ size {})",
                    entry.payload,
                    receipt.leaf_index,
                    receipt.root.root_hash_hex(),
                    receipt.root.size
                );
                delivered.push(StoredReceipt {
                    entry,
                    receipt: receipt.clone(),
                });
            }
            failed => {
                failures += 1;
                eprintln!("❌ '{}': {}", entry.payload, failed);
            }
        }
    }

    if let Some(path) = &opts.receipts {
        if !delivered.is_empty() {
            receipts::append(path, &delivered)?;
            tracing::info!("Wrote {} receipts to {:?}", delivered.len(), path);
        }
    }

    if failures > 0 && !opts.continue_on_error {
        anyhow::bail!("send aborted after a failed message");
    }
    Ok(delivered.len())
}
