//! Collectors perform the outbound network handoff
//!
//! [`HttpCollector`] talks to a real endpoint over HTTP. [`MockCollector`]
//! records requests and replays scripted outcomes for tests.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::{Value, json};
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::DeliveryError;

/// One outbound delivery call
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryRequest {
    pub method: String,
    pub url: String,
    pub body: Value,
}

/// Destination for telemetry
#[async_trait]
pub trait Collector: Send + Sync {
    /// Send `request` and decode the JSON response body
    async fn deliver(&self, request: DeliveryRequest) -> Result<Value, DeliveryError>;
}

/// Delivers over HTTP with reqwest
#[derive(Debug, Clone, Default)]
pub struct HttpCollector {
    client: reqwest::Client,
}

impl HttpCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Collector for HttpCollector {
    async fn deliver(&self, request: DeliveryRequest) -> Result<Value, DeliveryError> {
        let method = Method::from_bytes(request.method.to_uppercase().as_bytes())
            .map_err(|_| DeliveryError::InvalidMethod(request.method.clone()))?;

        let response = self
            .client
            .request(method, &request.url)
            .json(&request.body)
            .send()
            .await?;

        // Status is not checked; any JSON body is relayed
        debug!(status = %response.status(), url = %request.url, "Collector responded");

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| DeliveryError::Decode(e.to_string()))
    }
}

/// Scripted outcome for the next [`MockCollector`] call
#[derive(Debug, Clone)]
pub enum MockOutcome {
    Respond(Value),
    Fail(String),
    /// Respond after a delay
    Delayed(Duration, Value),
    /// Never complete
    Hang,
}

/// Test collector that records every request
///
/// Outcomes queued with [`MockCollector::queue`] are consumed one per call;
/// once the queue is empty every call responds with `{"data": true}`.
#[derive(Debug, Default)]
pub struct MockCollector {
    requests: Mutex<Vec<DeliveryRequest>>,
    outcomes: Mutex<VecDeque<MockOutcome>>,
}

impl MockCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an outcome for a future call
    pub async fn queue(&self, outcome: MockOutcome) {
        self.outcomes.lock().await.push_back(outcome);
    }

    /// Every request seen so far, in call order
    pub async fn requests(&self) -> Vec<DeliveryRequest> {
        self.requests.lock().await.clone()
    }

    pub async fn request_count(&self) -> usize {
        self.requests.lock().await.len()
    }

    /// Poll until at least `count` requests arrived or `timeout` elapsed
    pub async fn wait_for_requests(&self, count: usize, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.request_count().await >= count {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

#[async_trait]
impl Collector for MockCollector {
    async fn deliver(&self, request: DeliveryRequest) -> Result<Value, DeliveryError> {
        self.requests.lock().await.push(request);
        let outcome = self.outcomes.lock().await.pop_front();

        match outcome {
            None => Ok(json!({ "data": true })),
            Some(MockOutcome::Respond(value)) => Ok(value),
            Some(MockOutcome::Fail(reason)) => Err(DeliveryError::Collector(reason)),
            Some(MockOutcome::Delayed(delay, value)) => {
                tokio::time::sleep(delay).await;
                Ok(value)
            }
            Some(MockOutcome::Hang) => std::future::pending().await,
        }
    }
}
