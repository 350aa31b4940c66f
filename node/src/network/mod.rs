// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Boundaries to the two remote services: the verifiable log and the
//! downstream delivery sink.

pub mod client;
pub mod sink;

pub use client::{HttpLogClient, LocalLogClient, LogClient};
pub use sink::{DeliverySink, HttpDeliverySink};
