// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::path::Path;

use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};
use ledgerpost_kernel::InclusionVerifier;

use super::format_timestamp;
use super::receipts::{self, StoredReceipt};

fn check(stored: &StoredReceipt) -> &'static str {
    match &stored.receipt.proof {
        None => "NO PROOF",
        Some(proof) => {
            if InclusionVerifier::verify(&stored.entry, stored.receipt.leaf_index, &stored.receipt.root, proof) {
                "VERIFIED"
            } else {
                "MISMATCH"
            }
        }
    }
}

/// Check every receipt in the file offline. Fails unless all of them verify.
pub fn run(receipts_path: &Path) -> anyhow::Result<()> {
    let stored = receipts::read_all(receipts_path)?;
    if stored.is_empty() {
        anyhow::bail!("no receipts in {:?}", receipts_path);
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Leaf", "Tree Size", "Author", "Timestamp", "Status"]);

    let mut bad = 0;
    for s in &stored {
        let status = check(s);
        if status != "VERIFIED" {
            bad += 1;
        }
        table.add_row(vec![
            s.receipt.leaf_index.to_string(),
            s.receipt.root.size.to_string(),
            s.entry.author.clone(),
            format_timestamp(s.entry.timestamp_ms),
            status.to_string(),
        ]);
    }

    println!("\nReceipts\n");
    println!("{table}\n");

    if bad > 0 {
        println!("❌ {} of {} receipts failed verification\n", bad, stored.len());
        anyhow::bail!("{} receipts failed verification", bad);
    }
    println!("✅ VERIFIED ({} receipts)\n", stored.len());
    Ok(())
}
