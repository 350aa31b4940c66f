// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
pub mod inspect;
pub mod receipts;
pub mod root;
pub mod send;
pub mod verify;

/// Accept `host:port` as well as full URLs.
pub fn service_url(addr: &str) -> String {
    if addr.starts_with("http://") || addr.starts_with("https://") {
        addr.trim_end_matches('/').to_string()
    } else {
        format!("http://{}", addr.trim_end_matches('/'))
    }
}

pub(crate) fn format_timestamp(ms: u64) -> String {
    chrono::DateTime::from_timestamp_millis(ms as i64)
        .unwrap_or_default()
        .to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_url() {
        assert_eq!(service_url("127.0.0.1:50052"), "http://127.0.0.1:50052");
        assert_eq!(service_url("http://log.internal/"), "http://log.internal");
        assert_eq!(service_url("https://log.internal"), "https://log.internal");
    }
}
