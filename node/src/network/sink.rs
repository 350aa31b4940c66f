// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::api::{DeliverRequest, ErrorBody};
use crate::errors::DeliveryError;

/// Downstream service that accepts a forwarded payload.
#[async_trait]
pub trait DeliverySink: Send + Sync {
    async fn deliver(&self, payload: &str, deadline: Duration) -> Result<(), DeliveryError>;
}

/// Delivery service reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpDeliverySink {
    base_url: String,
    client: Client,
    auth_token: Option<String>,
}

impl HttpDeliverySink {
    pub fn new(url: impl Into<String>, connect_timeout: Duration) -> Result<Self, DeliveryError> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| DeliveryError::Unavailable(e.to_string()))?;

        Ok(Self {
            base_url: url.into().trim_end_matches('/').to_string(),
            client,
            auth_token: None,
        })
    }

    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl DeliverySink for HttpDeliverySink {
    async fn deliver(&self, payload: &str, deadline: Duration) -> Result<(), DeliveryError> {
        let url = format!("{}/v1/deliver", self.base_url);
        let mut req = self
            .client
            .post(&url)
            .json(&DeliverRequest {
                payload: payload.to_string(),
            })
            .timeout(deadline);
        if let Some(token) = &self.auth_token {
            req = req.bearer_auth(token);
        }

        let resp = match tokio::time::timeout(deadline, req.send()).await {
            Ok(Ok(resp)) => resp,
            Ok(Err(e)) if e.is_timeout() => return Err(DeliveryError::DeadlineExceeded),
            Ok(Err(e)) => return Err(DeliveryError::Unavailable(e.to_string())),
            Err(_) => return Err(DeliveryError::DeadlineExceeded),
        };

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }

        let message = match resp.json::<ErrorBody>().await {
            Ok(body) => body.error,
            Err(_) => format!("status {}", status),
        };
        if status.is_client_error() {
            Err(DeliveryError::Rejected(message))
        } else {
            Err(DeliveryError::Unavailable(message))
        }
    }
}
