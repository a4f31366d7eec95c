//! passive-core: behavioral telemetry without getting in the user's way
//!
//! This crate provides the two cooperating halves of the passive client:
//!
//! - **Capture** - [`CaptureLayer`] binds passive listeners on a [`Document`]
//!   and turns interaction events into [`Message`]s via [`Transformer`]s
//! - **Delivery** - [`DeliveryAgent`] runs in its own task, owns the
//!   [`DeliveryConfig`] and hands each message to a [`Collector`]
//! - **Channel** - [`channel()`] connects the two with owned JSON payloads
//! - **Activation** - [`Passive::activate`] wires everything up when the
//!   [`Window`] carries worker support and an [`ActivationConfig`]
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use passive_core::{
//!     ActivationConfig, AgentWorkerFactory, DomEvent, Element, HttpCollector, Passive, Window,
//! };
//!
//! # async fn example() {
//! let window = Window::new("https://shop.test/")
//!     .with_worker(Arc::new(AgentWorkerFactory::new(Arc::new(HttpCollector::new()))))
//!     .with_passive_config(
//!         ActivationConfig::new("/w.js").with_api_url("https://collector.test/ingest"),
//!     );
//!
//! let passive = Passive::activate(Some(&window));
//! passive.on_response(|response| println!("collector said {response}"));
//!
//! window.document().dispatch(&DomEvent::pointer(
//!     "click",
//!     Element::new("button").with_data("foo", "bar"),
//!     10.0,
//!     20.0,
//! ));
//! # }
//! ```
//!
//! # Architecture
//!
//! ```text
//!  main context                         background context
//! ┌──────────────────────────┐         ┌──────────────────────────┐
//! │ Document ─▶ CaptureLayer │  CONFIG │ DeliveryAgent            │
//! │   (passive listeners)    │ ──────▶ │   DeliveryConfig         │
//! │            │             │ message │        │                 │
//! │            ▼             │ ──────▶ │        ▼                 │
//! │       MessageBuilder     │         │    Collector ──▶ network │
//! │                          │ response│        │                 │
//! │ ResponseRelay callbacks ◀│ ◀────── │ ◀──────┘                 │
//! └──────────────────────────┘         └──────────────────────────┘
//! ```

pub mod activation;
pub mod agent;
pub mod capture;
pub mod channel;
pub mod collector;
pub mod config;
pub mod error;
pub mod host;
pub mod ids;
pub mod message;
pub mod relay;
pub mod transform;
pub mod worker;

// Re-export key types for convenience
pub use activation::{Instrumentation, Passive};
pub use agent::{DeliveryAgent, Inbound};
pub use capture::CaptureLayer;
pub use channel::{MainPort, MessageCallback, PortSender, WorkerPort, channel};
pub use collector::{Collector, DeliveryRequest, HttpCollector, MockCollector, MockOutcome};
pub use config::{ActivationConfig, DEFAULT_METHOD, DeliveryConfig};
pub use error::{ChannelError, ConfigError, DeliveryError, PassiveError};
pub use host::{DomEvent, Document, Element, ListenerOptions, Rect, Viewport, Window};
pub use ids::{IdSource, SequentialIdSource, UuidIdSource};
pub use message::{
    BASE_FIELDS, Bounds, CONFIG_TYPE, EventDetail, Message, MessageBuilder, PointerDetail,
    ScrollDetail, TargetDetail,
};
pub use relay::ResponseRelay;
pub use transform::{
    EventKindList, STANDARD_EVENT_KINDS, Transformer, TransformerTable, standard_event_kinds,
};
pub use worker::{AgentWorkerFactory, WorkerFactory};
