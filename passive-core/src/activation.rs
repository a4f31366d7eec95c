//! Activation - the one switch that turns instrumentation on
//!
//! [`Passive::activate`] checks that a window exists, that it can start
//! background workers and that it carries an activation config. When all
//! three hold it starts the worker, pushes the configuration, attaches the
//! capture layer and publishes the response relay on the window. Otherwise
//! nothing happens and the result is [`Passive::Inert`].

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::capture::CaptureLayer;
use crate::channel::channel;
use crate::host::Window;
use crate::ids::{IdSource, UuidIdSource};
use crate::message::MessageBuilder;
use crate::relay::ResponseRelay;
use crate::transform::{EventKindList, standard_event_kinds};

/// Handle to active instrumentation
#[derive(Debug, Clone)]
pub struct Instrumentation {
    instance_id: String,
    relay: ResponseRelay,
}

impl Instrumentation {
    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    pub fn relay(&self) -> &ResponseRelay {
        &self.relay
    }
}

/// Outcome of activation
#[derive(Debug, Clone)]
pub enum Passive {
    Active(Instrumentation),
    Inert,
}

impl Passive {
    /// Activate with the standard event surface and random ids
    pub fn activate(window: Option<&Window>) -> Self {
        Self::activate_with(window, standard_event_kinds(), Arc::new(UuidIdSource))
    }

    /// Activate with a custom event surface and id source
    pub fn activate_with(
        window: Option<&Window>,
        kinds: EventKindList,
        ids: Arc<dyn IdSource>,
    ) -> Self {
        let Some(window) = window else {
            debug!("No window, instrumentation inert");
            return Self::Inert;
        };
        let (Some(factory), Some(config)) = (window.worker(), window.passive_config()) else {
            debug!(
                worker = window.worker().is_some(),
                config = window.passive_config().is_some(),
                "Activation preconditions unmet, instrumentation inert"
            );
            return Self::Inert;
        };

        let (main, worker) = channel();
        if let Err(e) = factory.spawn(&config.worker_path, worker) {
            warn!("Failed to start worker: {}", e);
            return Self::Inert;
        }

        // Must precede the first telemetry message
        if let Err(e) = main.send(config.to_config_message()) {
            warn!("Failed to configure worker: {}", e);
        }

        let builder = MessageBuilder::new(ids, window.viewport());
        let capture = CaptureLayer::new(builder, main.sender()).configure(kinds);
        capture.attach(window.document());

        let relay = ResponseRelay::new(main);
        window.set_passive_instance(relay.clone());

        info!(
            instance_id = %capture.instance_id(),
            worker_path = %config.worker_path,
            "Passive instrumentation active"
        );

        Self::Active(Instrumentation {
            instance_id: capture.instance_id().to_string(),
            relay,
        })
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active(_))
    }

    pub fn instrumentation(&self) -> Option<&Instrumentation> {
        match self {
            Self::Active(instrumentation) => Some(instrumentation),
            Self::Inert => None,
        }
    }

    pub fn relay(&self) -> Option<&ResponseRelay> {
        self.instrumentation().map(Instrumentation::relay)
    }

    /// Register a response callback; returns false when inert
    pub fn on_response<F>(&self, callback: F) -> bool
    where
        F: Fn(serde_json::Value) + Send + Sync + 'static,
    {
        match self.relay() {
            Some(relay) => {
                relay.on_response(callback);
                true
            }
            None => false,
        }
    }
}
