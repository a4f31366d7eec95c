//! Background execution contexts
//!
//! A [`WorkerFactory`] starts the program named by `worker_path` on its own
//! task, handing it the worker end of the channel.

use std::sync::Arc;

use tracing::info;

use crate::agent::DeliveryAgent;
use crate::channel::WorkerPort;
use crate::collector::Collector;
use crate::error::PassiveError;

/// Creates background execution contexts
pub trait WorkerFactory: Send + Sync {
    /// Start the program at `worker_path` talking over `port`
    fn spawn(&self, worker_path: &str, port: WorkerPort) -> Result<(), PassiveError>;
}

/// Runs a [`DeliveryAgent`] for every worker it starts
pub struct AgentWorkerFactory {
    collector: Arc<dyn Collector>,
    forward_config: bool,
}

impl AgentWorkerFactory {
    pub fn new(collector: Arc<dyn Collector>) -> Self {
        Self {
            collector,
            forward_config: false,
        }
    }

    #[must_use]
    pub fn forward_config_messages(mut self, forward: bool) -> Self {
        self.forward_config = forward;
        self
    }
}

impl WorkerFactory for AgentWorkerFactory {
    fn spawn(&self, worker_path: &str, port: WorkerPort) -> Result<(), PassiveError> {
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|e| PassiveError::WorkerSpawn {
                worker_path: worker_path.to_string(),
                reason: e.to_string(),
            })?;

        let agent = DeliveryAgent::new(Arc::clone(&self.collector))
            .forward_config_messages(self.forward_config);
        runtime.spawn(agent.run(port));
        info!(worker_path = %worker_path, "Started delivery worker");
        Ok(())
    }
}
