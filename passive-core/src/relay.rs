//! Response relay - main-context callbacks for worker responses

use std::sync::Arc;

use serde_json::Value;

use crate::channel::MainPort;

/// Registers callbacks fired once per response relayed by the worker
#[derive(Debug, Clone)]
pub struct ResponseRelay {
    port: MainPort,
}

impl ResponseRelay {
    pub(crate) fn new(port: MainPort) -> Self {
        Self { port }
    }

    /// Invoke `callback` with every decoded response, in arrival order
    pub fn on_response<F>(&self, callback: F)
    where
        F: Fn(Value) + Send + Sync + 'static,
    {
        self.port.on_message(Arc::new(callback));
    }

    pub fn listener_count(&self) -> usize {
        self.port.callback_count()
    }
}
