// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::errors::NodeError;

/// Which service this process runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NodeMode {
    /// Verifiable log service.
    #[default]
    Log,
    /// Downstream delivery service.
    Delivery,
}

impl FromStr for NodeMode {
    type Err = NodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "log" => Ok(NodeMode::Log),
            "delivery" => Ok(NodeMode::Delivery),
            other => Err(NodeError::Config(format!("unknown mode '{}'", other))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub bind_addr: SocketAddr,
    pub mode: NodeMode,
    /// Entry file for the log service. `None` keeps the log in memory.
    pub log_path: Option<PathBuf>,
    /// Bearer token required on every request when set.
    pub auth_token: Option<String>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 50052)),
            mode: NodeMode::Log,
            log_path: None,
            auth_token: None,
        }
    }
}

impl NodeConfig {
    /// Defaults overridden by `LEDGERPOST_*` environment variables.
    pub fn from_env() -> Result<Self, NodeError> {
        let mut cfg = Self::default();

        if let Ok(mode) = std::env::var("LEDGERPOST_MODE") {
            cfg.mode = mode.parse()?;
            if cfg.mode == NodeMode::Delivery {
                cfg.bind_addr = SocketAddr::from(([127, 0, 0, 1], 50051));
            }
        }
        if let Ok(addr) = std::env::var("LEDGERPOST_BIND_ADDR") {
            cfg.bind_addr = addr
                .parse()
                .map_err(|e| NodeError::Config(format!("LEDGERPOST_BIND_ADDR: {}", e)))?;
        }
        if let Ok(path) = std::env::var("LEDGERPOST_LOG_PATH") {
            cfg.log_path = Some(PathBuf::from(path));
        }
        if let Ok(token) = std::env::var("LEDGERPOST_AUTH_TOKEN") {
            if !token.is_empty() {
                cfg.auth_token = Some(token);
            }
        }

        Ok(cfg)
    }
}

/// Client-side settings for one `DeliveryPipeline`.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub log_service_url: String,
    pub delivery_service_url: String,
    pub connect_timeout: Duration,
    /// Budget for log + verify + forward of one message.
    pub send_timeout: Duration,
    /// Gate forwarding on a verified inclusion proof.
    pub verify_proof: bool,
    /// When the log answers without a proof, ask for one instead of failing.
    pub fetch_missing_proof: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            log_service_url: "http://127.0.0.1:50052".to_string(),
            delivery_service_url: "http://127.0.0.1:50051".to_string(),
            connect_timeout: Duration::from_secs(1),
            send_timeout: Duration::from_secs(5),
            verify_proof: false,
            fetch_missing_proof: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parsing() {
        assert_eq!("log".parse::<NodeMode>().unwrap(), NodeMode::Log);
        assert_eq!("Delivery".parse::<NodeMode>().unwrap(), NodeMode::Delivery);
        assert!("leader".parse::<NodeMode>().is_err());
    }
}
