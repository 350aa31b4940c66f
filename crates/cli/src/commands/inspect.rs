// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::path::Path;

use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};
use ledgerpost_kernel::{LogRoot, VerifiableLog};
use ledgerpost_persistence::FileLogStorage;

use super::format_timestamp;

const PREVIEW_CHARS: usize = 48;

fn preview(payload: &str) -> String {
    if payload.chars().count() <= PREVIEW_CHARS {
        payload.to_string()
    } else {
        let cut: String = payload.chars().take(PREVIEW_CHARS).collect();
        format!("{}…", cut)
    }
}

/// Rebuild the tree from an entry file and print its root and timeline.
pub fn run(log_path: &Path) -> anyhow::Result<LogRoot> {
    if !log_path.exists() {
        anyhow::bail!("log file {:?} not found", log_path);
    }

    let log = VerifiableLog::open(FileLogStorage::open(log_path)?)?;
    let root = log.current_root();

    println!("\nLog File: {:?}", log_path);
    println!("Entries:   {}", root.size);
    println!("Root Hash: {}\n", root.root_hash_hex());

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Leaf", "Timestamp", "Author", "Payload"]);

    for leaf in 0..root.size {
        if let Some(entry) = log.entry(leaf) {
            table.add_row(vec![
                leaf.to_string(),
                format_timestamp(entry.timestamp_ms),
                entry.author,
                preview(&entry.payload),
            ]);
        }
    }
    println!("{table}\n");

    Ok(root)
}
