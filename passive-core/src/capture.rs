//! Capture layer
//!
//! Binds one passive listener per configured event kind on the document.
//! Each listener runs the kind's transformer and forwards any resulting
//! message over the channel. Listeners are never removed.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::channel::PortSender;
use crate::host::{Document, DomEvent, ListenerOptions};
use crate::message::{CONFIG_TYPE, MessageBuilder};
use crate::transform::{EventKindList, Transformer};

pub struct CaptureLayer {
    builder: MessageBuilder,
    sender: PortSender,
    kinds: EventKindList,
}

impl CaptureLayer {
    pub fn new(builder: MessageBuilder, sender: PortSender) -> Self {
        Self {
            builder,
            sender,
            kinds: Vec::new(),
        }
    }

    /// Set the (kind, transformer) pairs to bind
    #[must_use]
    pub fn configure(mut self, kinds: EventKindList) -> Self {
        self.kinds = kinds;
        self
    }

    pub fn kinds(&self) -> &EventKindList {
        &self.kinds
    }

    pub fn instance_id(&self) -> &str {
        self.builder.instance_id()
    }

    /// Register one passive listener per configured kind on `document`
    pub fn attach(&self, document: &Document) {
        for (kind, transformer) in &self.kinds {
            let builder = self.builder.clone();
            let sender = self.sender.clone();
            let transformer = transformer.clone();
            document.add_event_listener(
                kind,
                Arc::new(move |event: &DomEvent| {
                    capture(&builder, &transformer, &sender, event);
                }),
                ListenerOptions::passive(),
            );
        }
        debug!(kinds = self.kinds.len(), "Capture listeners attached");
    }
}

fn capture(
    builder: &MessageBuilder,
    transformer: &Transformer,
    sender: &PortSender,
    event: &DomEvent,
) {
    let Some(message) = transformer.apply(builder, event) else {
        return;
    };
    let shadowed = message.shadowed_fields();
    if !shadowed.is_empty() {
        warn!(
            transformer = transformer.name(),
            fields = ?shadowed,
            "Transformer detail shadows base fields, ignoring them"
        );
    }

    let payload = match message.to_value() {
        Ok(payload) => payload,
        Err(e) => {
            warn!("Failed to serialize message: {}", e);
            return;
        }
    };
    // The agent reads `type` off the wire to spot configuration messages
    if payload.get("type").and_then(Value::as_str) == Some(CONFIG_TYPE) {
        warn!(transformer = transformer.name(), "Dropping telemetry tagged as CONFIG");
        return;
    }
    if sender.send(payload).is_err() {
        debug!(kind = %event.kind, "Worker gone, message dropped");
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use serde_json::{Map, json};

    use super::*;
    use crate::channel::{WorkerPort, channel};
    use crate::host::{Element, Window};
    use crate::ids::UuidIdSource;
    use crate::message::EventDetail;
    use crate::transform::{TransformerTable, standard_event_kinds};

    fn setup() -> (Window, CaptureLayer, WorkerPort, crate::channel::MainPort) {
        let window = Window::new("https://shop.test/cart");
        let (main, worker) = channel();
        let builder = MessageBuilder::new(Arc::new(UuidIdSource), window.viewport());
        let layer = CaptureLayer::new(builder, main.sender()).configure(standard_event_kinds());
        (window, layer, worker, main)
    }

    async fn drain(worker: &mut WorkerPort) -> Vec<Value> {
        let mut out = Vec::new();
        while let Ok(Some(v)) =
            tokio::time::timeout(std::time::Duration::from_millis(20), worker.recv()).await
        {
            out.push(v);
        }
        out
    }

    #[tokio::test]
    async fn attach_binds_one_passive_listener_per_kind() {
        let (window, layer, _worker, _main) = setup();
        layer.attach(window.document());

        let doc = window.document();
        assert_eq!(doc.total_listeners(), layer.kinds().len());
        for (kind, _) in layer.kinds() {
            assert_eq!(doc.listener_count(kind), 1);
            assert!(doc.all_passive(kind));
        }
    }

    #[tokio::test]
    async fn enriched_kind_forwards_exactly_one_message() {
        let (window, layer, mut worker, _main) = setup();
        layer.attach(window.document());

        window.document().dispatch(&DomEvent::pointer(
            "click",
            Element::new("button").with_class_name("btn"),
            1.0,
            2.0,
        ));

        let messages = drain(&mut worker).await;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["type"], "click");
        assert_eq!(messages[0]["url"], "https://shop.test/cart");
    }

    #[tokio::test]
    async fn default_kind_forwards_nothing() {
        let (window, layer, mut worker, _main) = setup();
        layer.attach(window.document());

        for kind in ["resize", "copy", "online", "load"] {
            window.document().dispatch(&DomEvent::new(kind));
        }
        assert!(drain(&mut worker).await.is_empty());
    }

    #[tokio::test]
    async fn messages_share_instance_and_have_distinct_ids() {
        let (window, layer, mut worker, _main) = setup();
        layer.attach(window.document());

        for _ in 0..3 {
            window.document().dispatch(&DomEvent::new("scroll"));
            window.document().dispatch(&DomEvent::new("beforeunload"));
        }

        let messages = drain(&mut worker).await;
        assert_eq!(messages.len(), 6);
        let instances: HashSet<&str> = messages
            .iter()
            .map(|m| m["instance_id"].as_str().unwrap())
            .collect();
        let ids: HashSet<&str> = messages.iter().map(|m| m["id"].as_str().unwrap()).collect();
        assert_eq!(instances.len(), 1);
        assert_eq!(instances.into_iter().next(), Some(layer.instance_id()));
        assert_eq!(ids.len(), 6);
    }

    #[tokio::test]
    async fn event_without_target_is_tolerated() {
        let (window, layer, mut worker, _main) = setup();
        layer.attach(window.document());

        window.document().dispatch(&DomEvent::new("contextmenu"));
        let messages = drain(&mut worker).await;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["type"], "context_menu");
        assert!(messages[0].get("target").is_none());
    }

    #[tokio::test]
    async fn transformer_emitting_config_type_is_dropped() {
        let (window, _layer, mut worker, main) = setup();
        let builder = MessageBuilder::new(Arc::new(UuidIdSource), window.viewport());
        let rogue = Transformer::new("rogue", |b, _| Some(b.base(CONFIG_TYPE)));
        CaptureLayer::new(builder, main.sender())
            .configure(vec![("submit".to_string(), rogue)])
            .attach(window.document());

        window.document().dispatch(&DomEvent::new("submit"));
        assert!(drain(&mut worker).await.is_empty());
    }

    #[tokio::test]
    async fn custom_detail_cannot_rewrite_base_fields() {
        let (window, _layer, mut worker, main) = setup();
        let builder = MessageBuilder::new(Arc::new(UuidIdSource), window.viewport());
        let instance_id = builder.instance_id().to_string();

        let mut table = TransformerTable::builtin();
        table.register(
            "copy",
            Transformer::new("copy", |b, _| {
                let Value::Object(fields) = json!({
                    "type": "CONFIG",
                    "payload": { "api_url": "https://elsewhere.test/" },
                    "instance_id": "spoofed",
                }) else {
                    return None;
                };
                Some(b.with_detail("copy", EventDetail::Fields(fields)))
            }),
        );
        CaptureLayer::new(builder, main.sender())
            .configure(table.resolve(["copy"]))
            .attach(window.document());

        window.document().dispatch(&DomEvent::new("copy"));
        let messages = drain(&mut worker).await;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["type"], "copy");
        assert_eq!(messages[0]["instance_id"], instance_id.as_str());
        assert_eq!(messages[0]["url"], "https://shop.test/cart");
    }

    #[tokio::test]
    async fn detail_fields_keep_their_non_base_keys() {
        let (window, _layer, mut worker, main) = setup();
        let builder = MessageBuilder::new(Arc::new(UuidIdSource), window.viewport());
        let with_selection = Transformer::new("copy", |b, _| {
            let mut fields = Map::new();
            fields.insert("selection".to_string(), Value::from("hello"));
            Some(b.with_detail("copy", EventDetail::Fields(fields)))
        });
        CaptureLayer::new(builder, main.sender())
            .configure(vec![("copy".to_string(), with_selection)])
            .attach(window.document());

        window.document().dispatch(&DomEvent::new("copy"));
        let messages = drain(&mut worker).await;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["selection"], "hello");
    }

    #[tokio::test]
    async fn closed_channel_does_not_break_listeners() {
        let (window, layer, worker, _main) = setup();
        layer.attach(window.document());
        drop(worker);

        assert_eq!(window.document().dispatch(&DomEvent::new("click")), 1);
        assert_eq!(window.document().dispatch(&DomEvent::new("click")), 1);
    }
}
