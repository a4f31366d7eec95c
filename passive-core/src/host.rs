//! Host environment model
//!
//! The browsing context the capture layer observes: a [`Window`] owning a
//! [`Document`] (the root observation target), the current [`Viewport`],
//! optional background-worker support and the optional activation config.
//! Events are plain [`DomEvent`] values dispatched synchronously to every
//! listener registered for their kind.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::config::ActivationConfig;
use crate::relay::ResponseRelay;
use crate::worker::WorkerFactory;

/// Element node type as reported by the DOM
pub const ELEMENT_NODE: u16 = 1;

/// Bounding client rectangle of an element
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn left(&self) -> f64 {
        self.x.min(self.x + self.width)
    }

    pub fn top(&self) -> f64 {
        self.y.min(self.y + self.height)
    }

    pub fn right(&self) -> f64 {
        self.x.max(self.x + self.width)
    }

    pub fn bottom(&self) -> f64 {
        self.y.max(self.y + self.height)
    }
}

/// The element an event fired on
///
/// `dataset` and `class_name` are optional because not every event target
/// carries them (text nodes, the document itself, SVG in some engines).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Element {
    /// `data-*` attributes keyed without the `data-` prefix
    pub dataset: Option<BTreeMap<String, String>>,
    /// Raw space-separated class attribute
    pub class_name: Option<String>,
    pub id: String,
    #[serde(rename = "innerHTML")]
    pub inner_html: String,
    pub inner_text: String,
    pub tag_name: String,
    #[serde(default = "default_node_type")]
    pub node_type: u16,
    pub bounds: Option<Rect>,
}

fn default_node_type() -> u16 {
    ELEMENT_NODE
}

impl Element {
    /// Create an element with the given tag name (upper-cased, as the DOM reports it)
    pub fn new(tag_name: &str) -> Self {
        Self {
            dataset: Some(BTreeMap::new()),
            class_name: Some(String::new()),
            tag_name: tag_name.to_uppercase(),
            node_type: ELEMENT_NODE,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    #[must_use]
    pub fn with_class_name(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = Some(class_name.into());
        self
    }

    /// Add a data attribute; accepts either `data-foo` or `foo`
    #[must_use]
    pub fn with_data(mut self, key: &str, value: impl Into<String>) -> Self {
        let key = key.strip_prefix("data-").unwrap_or(key).to_string();
        self.dataset
            .get_or_insert_with(BTreeMap::new)
            .insert(key, value.into());
        self
    }

    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        let text = text.into();
        self.inner_html = text.clone();
        self.inner_text = text;
        self
    }

    #[must_use]
    pub fn with_inner_html(mut self, html: impl Into<String>) -> Self {
        self.inner_html = html.into();
        self
    }

    #[must_use]
    pub fn with_bounds(mut self, bounds: Rect) -> Self {
        self.bounds = Some(bounds);
        self
    }
}

/// A discrete interaction event reported by the page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomEvent {
    /// Event kind name (`click`, `scroll`, ...)
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub target: Option<Element>,
    #[serde(default)]
    pub client_x: f64,
    #[serde(default)]
    pub client_y: f64,
    #[serde(default)]
    pub layer_x: f64,
    #[serde(default)]
    pub layer_y: f64,
}

impl DomEvent {
    /// Event with no target and no coordinates
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ..Default::default()
        }
    }

    /// Pointer event at client coordinates on `target`
    pub fn pointer(kind: impl Into<String>, target: Element, client_x: f64, client_y: f64) -> Self {
        Self {
            kind: kind.into(),
            target: Some(target),
            client_x,
            client_y,
            layer_x: client_x,
            layer_y: client_y,
        }
    }

    #[must_use]
    pub fn with_layer(mut self, layer_x: f64, layer_y: f64) -> Self {
        self.layer_x = layer_x;
        self.layer_y = layer_y;
        self
    }
}

/// Location and scroll position of the page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub location: String,
    pub scroll_x: f64,
    pub scroll_y: f64,
}

/// Options for listener registration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListenerOptions {
    /// Passive listeners never block or cancel default handling
    pub passive: bool,
}

impl ListenerOptions {
    pub fn passive() -> Self {
        Self { passive: true }
    }
}

/// Callback invoked with each dispatched event
pub type Listener = Arc<dyn Fn(&DomEvent) + Send + Sync>;

#[derive(Clone)]
struct Registration {
    listener: Listener,
    options: ListenerOptions,
}

/// Root observation target
///
/// Cheap to clone; clones share the same listener set.
#[derive(Clone, Default)]
pub struct Document {
    listeners: Arc<Mutex<HashMap<String, Vec<Registration>>>>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener for `kind`. Listeners are never removed.
    pub fn add_event_listener(&self, kind: &str, listener: Listener, options: ListenerOptions) {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(kind.to_string())
            .or_default()
            .push(Registration { listener, options });
    }

    /// Run every listener registered for the event's kind, in registration
    /// order. Returns how many listeners ran.
    pub fn dispatch(&self, event: &DomEvent) -> usize {
        // Snapshot so listeners may register further listeners
        let registrations = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&event.kind)
            .cloned()
            .unwrap_or_default();

        for registration in &registrations {
            (registration.listener)(event);
        }
        registrations.len()
    }

    pub fn listener_count(&self, kind: &str) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(kind)
            .map_or(0, Vec::len)
    }

    pub fn total_listeners(&self) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(Vec::len)
            .sum()
    }

    /// Whether every listener registered for `kind` is passive
    pub fn all_passive(&self, kind: &str) -> bool {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(kind)
            .is_none_or(|regs| regs.iter().all(|r| r.options.passive))
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("listeners", &self.total_listeners())
            .finish()
    }
}

/// Host execution environment
pub struct Window {
    document: Document,
    viewport: watch::Sender<Viewport>,
    worker: Option<Arc<dyn WorkerFactory>>,
    passive_config: Option<ActivationConfig>,
    passive_instance: Mutex<Option<ResponseRelay>>,
}

impl Window {
    /// Create a window at `location` with no worker support and no activation config
    pub fn new(location: impl Into<String>) -> Self {
        let (viewport, _) = watch::channel(Viewport {
            location: location.into(),
            ..Default::default()
        });
        Self {
            document: Document::new(),
            viewport,
            worker: None,
            passive_config: None,
            passive_instance: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn with_worker(mut self, factory: Arc<dyn WorkerFactory>) -> Self {
        self.worker = Some(factory);
        self
    }

    #[must_use]
    pub fn with_passive_config(mut self, config: ActivationConfig) -> Self {
        self.passive_config = Some(config);
        self
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn worker(&self) -> Option<&Arc<dyn WorkerFactory>> {
        self.worker.as_ref()
    }

    pub fn passive_config(&self) -> Option<&ActivationConfig> {
        self.passive_config.as_ref()
    }

    /// Live view of the viewport, read at capture time
    pub fn viewport(&self) -> watch::Receiver<Viewport> {
        self.viewport.subscribe()
    }

    pub fn location(&self) -> String {
        self.viewport.borrow().location.clone()
    }

    pub fn navigate(&self, location: impl Into<String>) {
        let location = location.into();
        self.viewport.send_modify(|v| v.location = location);
    }

    pub fn scroll_to(&self, x: f64, y: f64) {
        self.viewport.send_modify(|v| {
            v.scroll_x = x;
            v.scroll_y = y;
        });
    }

    /// The relay published by an active instrumentation, if any
    pub fn passive_instance(&self) -> Option<ResponseRelay> {
        self.passive_instance
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn set_passive_instance(&self, relay: ResponseRelay) {
        *self
            .passive_instance
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(relay);
    }
}
