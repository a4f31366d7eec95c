//! Delivery agent - the background side of the pipeline
//!
//! Owns the [`DeliveryConfig`], consumes payloads from the main context and
//! issues one outbound call per payload once an endpoint is known. Each
//! call runs on its own task, so deliveries overlap and may complete out of
//! order; every successful response is relayed back independently.
//!
//! Configuration messages are merged into the config and consumed. With
//! [`DeliveryAgent::forward_config_messages`] they are also delivered like
//! any other payload once an endpoint is known.

use std::sync::Arc;

use serde_json::Value;
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::channel::{PortSender, WorkerPort};
use crate::collector::{Collector, DeliveryRequest};
use crate::config::DeliveryConfig;
use crate::message::CONFIG_TYPE;

/// Classification of an inbound payload
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound<'a> {
    /// `{"type": "CONFIG", "payload": {...}}`
    Config(&'a serde_json::Map<String, Value>),
    Telemetry,
}

impl<'a> Inbound<'a> {
    pub fn classify(payload: &'a Value) -> Self {
        if payload.get("type").and_then(Value::as_str) == Some(CONFIG_TYPE)
            && let Some(entries) = payload.get("payload").and_then(Value::as_object)
        {
            return Self::Config(entries);
        }
        Self::Telemetry
    }
}

/// Background delivery agent
pub struct DeliveryAgent {
    config: DeliveryConfig,
    collector: Arc<dyn Collector>,
    forward_config: bool,
    tracker: TaskTracker,
}

impl DeliveryAgent {
    pub fn new(collector: Arc<dyn Collector>) -> Self {
        Self {
            config: DeliveryConfig::default(),
            collector,
            forward_config: false,
            tracker: TaskTracker::new(),
        }
    }

    /// Whether configuration messages are also delivered to the endpoint
    #[must_use]
    pub fn forward_config_messages(mut self, forward: bool) -> Self {
        self.forward_config = forward;
        self
    }

    pub fn config(&self) -> &DeliveryConfig {
        &self.config
    }

    /// Consume payloads until the main context goes away, then wait for
    /// in-flight deliveries.
    pub async fn run(mut self, mut port: WorkerPort) {
        info!("DeliveryAgent started");
        let reply = port.sender();

        while let Some(payload) = port.recv().await {
            self.handle(payload, &reply);
        }

        self.tracker.close();
        debug!(in_flight = self.tracker.len(), "Main context closed, draining deliveries");
        self.tracker.wait().await;
        info!("DeliveryAgent stopped");
    }

    /// Apply one inbound payload. Returns the delivery task, if one was started.
    pub fn handle(&mut self, payload: Value, reply: &PortSender) -> Option<JoinHandle<()>> {
        let is_config = match Inbound::classify(&payload) {
            Inbound::Config(entries) => {
                self.config.merge(entries);
                debug!(keys = entries.len(), "Merged configuration");
                true
            }
            Inbound::Telemetry => false,
        };

        if is_config && !self.forward_config {
            return None;
        }

        let Some(url) = self.config.api_url() else {
            debug!("No api_url configured, skipping delivery");
            return None;
        };

        let request = DeliveryRequest {
            method: self.config.method().to_string(),
            url: url.to_string(),
            body: payload,
        };
        let collector = Arc::clone(&self.collector);
        let reply = reply.clone();

        Some(self.tracker.spawn(async move {
            let url = request.url.clone();
            match collector.deliver(request).await {
                Ok(response) => {
                    if reply.send(response).is_err() {
                        debug!("Main context gone, dropping response");
                    }
                }
                Err(e) => {
                    warn!(url = %url, "Delivery failed: {}", e);
                }
            }
        }))
    }
}
