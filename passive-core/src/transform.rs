//! Event transformers
//!
//! A [`Transformer`] turns a fired [`DomEvent`] into an optional
//! [`Message`]. The no-op transformer registers interest in a kind without
//! emitting anything, keeping the upgrade path open for future enrichment.

use std::collections::HashMap;
use std::sync::Arc;

use crate::host::DomEvent;
use crate::message::{EventDetail, Message, MessageBuilder, PointerDetail, ScrollDetail};

type TransformFn = dyn Fn(&MessageBuilder, &DomEvent) -> Option<Message> + Send + Sync;

/// Strategy mapping a fired event to a message (or nothing)
#[derive(Clone)]
pub struct Transformer {
    name: &'static str,
    f: Arc<TransformFn>,
}

impl Transformer {
    /// Custom transformer
    pub fn new<F>(name: &'static str, f: F) -> Self
    where
        F: Fn(&MessageBuilder, &DomEvent) -> Option<Message> + Send + Sync + 'static,
    {
        Self {
            name,
            f: Arc::new(f),
        }
    }

    /// Produces nothing
    pub fn noop() -> Self {
        Self::new("noop", |_, _| None)
    }

    pub fn click() -> Self {
        Self::new("click", |builder, event| {
            Some(builder.with_detail(
                "click",
                EventDetail::Pointer(PointerDetail::from_event(event)),
            ))
        })
    }

    pub fn context_menu() -> Self {
        Self::new("context_menu", |builder, event| {
            Some(builder.with_detail(
                "context_menu",
                EventDetail::Pointer(PointerDetail::from_event(event)),
            ))
        })
    }

    pub fn scroll() -> Self {
        Self::new("scroll", |builder, _| {
            let viewport = builder.viewport();
            Some(builder.with_detail(
                "scroll",
                EventDetail::Scroll(ScrollDetail {
                    scroll_y: viewport.scroll_y,
                    scroll_x: viewport.scroll_x,
                }),
            ))
        })
    }

    pub fn before_unload() -> Self {
        Self::new("beforeunload", |builder, _| Some(builder.base("beforeunload")))
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_noop(&self) -> bool {
        self.name == "noop"
    }

    pub fn apply(&self, builder: &MessageBuilder, event: &DomEvent) -> Option<Message> {
        (self.f)(builder, event)
    }
}

impl std::fmt::Debug for Transformer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Transformer").field(&self.name).finish()
    }
}

/// Specialized transformers keyed by event kind
#[derive(Debug, Clone, Default)]
pub struct TransformerTable {
    handlers: HashMap<String, Transformer>,
}

impl TransformerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// click, contextmenu, scroll and beforeunload
    pub fn builtin() -> Self {
        let mut table = Self::new();
        table.register("click", Transformer::click());
        table.register("contextmenu", Transformer::context_menu());
        table.register("scroll", Transformer::scroll());
        table.register("beforeunload", Transformer::before_unload());
        table
    }

    /// Register or replace the transformer for `kind`
    pub fn register(&mut self, kind: &str, transformer: Transformer) {
        self.handlers.insert(kind.to_string(), transformer);
    }

    pub fn get(&self, kind: &str) -> Option<&Transformer> {
        self.handlers.get(kind)
    }

    /// Pair each kind with its specialized transformer, or the no-op default
    pub fn resolve<'a, I>(&self, kinds: I) -> EventKindList
    where
        I: IntoIterator<Item = &'a str>,
    {
        kinds
            .into_iter()
            .map(|kind| {
                let transformer = self.get(kind).cloned().unwrap_or_else(Transformer::noop);
                (kind.to_string(), transformer)
            })
            .collect()
    }
}

/// Ordered (kind, transformer) pairs bound by the capture layer
pub type EventKindList = Vec<(String, Transformer)>;

/// Event kinds observed by default
/// <https://developer.mozilla.org/en-US/docs/Web/Events>
pub const STANDARD_EVENT_KINDS: &[&str] = &[
    "click",
    "error",
    "abort",
    "load",
    "beforeunload",
    "unload",
    "online",
    "offline",
    "pagehide",
    "pageshow",
    "popstate",
    "reset",
    "submit",
    "beforeprint",
    "afterprint",
    "fullscreenchange",
    "resize",
    "scroll",
    "fullscreenerror",
    "cut",
    "copy",
    "paste",
    "contextmenu",
    "select",
    "waiting",
];

/// The standard event surface resolved against the builtin table
pub fn standard_event_kinds() -> EventKindList {
    TransformerTable::builtin().resolve(STANDARD_EVENT_KINDS.iter().copied())
}
