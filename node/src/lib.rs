// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
pub mod api;
pub mod config;
pub mod errors;
pub mod network;
pub mod pipeline;
pub mod server;
pub mod telemetry;

pub use config::{NodeConfig, NodeMode, PipelineConfig};
pub use errors::{DeliveryError, NodeError};
pub use network::{DeliverySink, HttpDeliverySink, HttpLogClient, LocalLogClient, LogClient};
pub use pipeline::{new_entry, BatchPolicy, DeliveryPipeline, ForwardFailure, LogFailure, PipelineResult, ProofFailure};
