// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Receipt files: one JSON object per line, appended as messages are delivered.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use anyhow::Context;
use ledgerpost_kernel::{AppendReceipt, Entry};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredReceipt {
    pub entry: Entry,
    pub receipt: AppendReceipt,
}

pub fn append(path: &Path, receipts: &[StoredReceipt]) -> anyhow::Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("cannot open receipts file {:?}", path))?;

    for stored in receipts {
        let line = serde_json::to_string(stored)?;
        writeln!(file, "{}", line)?;
    }
    file.sync_data()?;
    Ok(())
}

pub fn read_all(path: &Path) -> anyhow::Result<Vec<StoredReceipt>> {
    let file = File::open(path).with_context(|| format!("cannot open receipts file {:?}", path))?;

    let mut receipts = Vec::new();
    for (n, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let stored = serde_json::from_str(&line)
            .with_context(|| format!("{:?}: malformed receipt on line {}", path, n + 1))?;
        receipts.push(stored);
    }
    Ok(receipts)
}
