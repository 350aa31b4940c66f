// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::time::Duration;

use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};
use ledgerpost_kernel::LogRoot;
use ledgerpost_node::network::{HttpLogClient, LogClient};

use super::service_url;

pub async fn run(log_addr: &str, timeout: Duration, auth_token: Option<&str>) -> anyhow::Result<LogRoot> {
    let url = service_url(log_addr);
    let mut client = HttpLogClient::new(&url, timeout)?;
    if let Some(token) = auth_token {
        client = client.with_auth_token(token);
    }
    let root = client.current_root(timeout).await?;

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Log", "Size", "Root Hash"]);
    table.add_row(vec![url, root.size.to_string(), root.root_hash_hex()]);

    println!("\nCurrent Log Root\n");
    println!("{table}\n");

    Ok(root)
}
