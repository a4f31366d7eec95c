//! Telemetry messages and the builder that stamps them
//!
//! Every [`Message`] carries four base fields (`id`, `instance_id`,
//! `timestamp`, `url`) plus a `type` tag and kind-specific detail fields
//! flattened beside them. Field names on the wire are camelCase where the
//! DOM names them that way (`clientX`, `innerHTML`, ...).

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::ser::{Error as _, SerializeMap};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use tokio::sync::watch;

use crate::host::{DomEvent, Element, Rect, Viewport};
use crate::ids::IdSource;

/// Type tag reserved for configuration messages
pub const CONFIG_TYPE: &str = "CONFIG";

/// Keys owned by the base record; detail fields never override them
pub const BASE_FIELDS: &[&str] = &["id", "instance_id", "timestamp", "url", "type"];

/// Normalized telemetry record built from one interaction event
///
/// Serialization writes the base fields first and then every detail field
/// whose key is not in [`BASE_FIELDS`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Message {
    pub id: String,
    pub instance_id: String,
    #[serde(deserialize_with = "from_rfc3339")]
    pub timestamp: DateTime<Utc>,
    pub url: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(flatten)]
    pub detail: EventDetail,
}

impl Message {
    /// Serialize for the transport channel
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    /// Detail keys that collide with base fields and are left off the wire
    pub fn shadowed_fields(&self) -> Vec<&str> {
        match &self.detail {
            EventDetail::Fields(fields) => fields
                .keys()
                .map(String::as_str)
                .filter(|key| BASE_FIELDS.contains(key))
                .collect(),
            _ => Vec::new(),
        }
    }
}

impl Serialize for Message {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let detail = match serde_json::to_value(&self.detail).map_err(S::Error::custom)? {
            Value::Object(fields) => fields,
            _ => Map::new(),
        };
        let extra: Vec<(&String, &Value)> = detail
            .iter()
            .filter(|(key, _)| !BASE_FIELDS.contains(&key.as_str()))
            .collect();

        let mut map = serializer.serialize_map(Some(BASE_FIELDS.len() + extra.len()))?;
        map.serialize_entry("id", &self.id)?;
        map.serialize_entry("instance_id", &self.instance_id)?;
        map.serialize_entry(
            "timestamp",
            &self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
        )?;
        map.serialize_entry("url", &self.url)?;
        map.serialize_entry("type", &self.kind)?;
        for (key, value) in extra {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

fn from_rfc3339<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
    let raw = String::deserialize(d)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(serde::de::Error::custom)
}

/// Kind-specific fields of a message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventDetail {
    /// click / context menu
    Pointer(PointerDetail),
    Scroll(ScrollDetail),
    /// Free-form fields from custom transformers; empty for lifecycle events
    Fields(Map<String, Value>),
}

impl EventDetail {
    /// No extra fields
    pub fn empty() -> Self {
        Self::Fields(Map::new())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointerDetail {
    #[serde(rename = "clientX")]
    pub client_x: f64,
    #[serde(rename = "clientY")]
    pub client_y: f64,
    #[serde(rename = "layerX")]
    pub layer_x: f64,
    #[serde(rename = "layerY")]
    pub layer_y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<TargetDetail>,
}

impl PointerDetail {
    pub fn from_event(event: &DomEvent) -> Self {
        Self {
            client_x: event.client_x,
            client_y: event.client_y,
            layer_x: event.layer_x,
            layer_y: event.layer_y,
            target: event.target.as_ref().map(TargetDetail::from_element),
        }
    }
}

/// Description of the DOM element an event fired on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetDetail {
    pub data: BTreeMap<String, String>,
    pub classes: Vec<String>,
    pub id: String,
    #[serde(rename = "innerHTML")]
    pub inner_html: String,
    pub inner_text: String,
    pub tag_name: String,
    pub node_type: u16,
    pub bounds: Bounds,
}

impl TargetDetail {
    /// Read target fields, degrading missing substructure to empty values
    pub fn from_element(element: &Element) -> Self {
        let data: BTreeMap<String, String> = element
            .dataset
            .as_ref()
            .map(|dataset| {
                dataset
                    .iter()
                    .map(|(k, v)| (k.strip_prefix("data-").unwrap_or(k).to_string(), v.clone()))
                    .collect()
            })
            .unwrap_or_default();
        let classes: Vec<String> = element
            .class_name
            .as_deref()
            .map(|names| names.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default();

        Self {
            data,
            classes,
            id: element.id.clone(),
            inner_html: element.inner_html.clone(),
            inner_text: element.inner_text.clone(),
            tag_name: element.tag_name.clone(),
            node_type: element.node_type,
            bounds: element.bounds.unwrap_or_default().into(),
        }
    }
}

/// Bounding rectangle as reported to the collector
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub left: f64,
    pub top: f64,
    pub bottom: f64,
    pub right: f64,
    pub width: f64,
    pub height: f64,
}

impl From<Rect> for Bounds {
    fn from(rect: Rect) -> Self {
        Self {
            x: rect.x,
            y: rect.y,
            left: rect.left(),
            top: rect.top(),
            bottom: rect.bottom(),
            right: rect.right(),
            width: rect.width,
            height: rect.height,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScrollDetail {
    #[serde(rename = "scrollY")]
    pub scroll_y: f64,
    #[serde(rename = "scrollX")]
    pub scroll_x: f64,
}

/// Stamps base fields onto messages for one capture instance
///
/// The instance id is drawn once at construction and reused for every
/// message; message ids are drawn fresh per call to [`MessageBuilder::base`].
#[derive(Clone)]
pub struct MessageBuilder {
    instance_id: String,
    ids: Arc<dyn IdSource>,
    viewport: watch::Receiver<Viewport>,
}

impl MessageBuilder {
    pub fn new(ids: Arc<dyn IdSource>, viewport: watch::Receiver<Viewport>) -> Self {
        let instance_id = ids.generate();
        Self {
            instance_id,
            ids,
            viewport,
        }
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Current viewport at capture time
    pub fn viewport(&self) -> Viewport {
        self.viewport.borrow().clone()
    }

    /// Base record for `kind` with no detail fields
    pub fn base(&self, kind: &str) -> Message {
        Message {
            id: self.ids.generate(),
            instance_id: self.instance_id.clone(),
            timestamp: Utc::now(),
            url: self.viewport.borrow().location.clone(),
            kind: kind.to_string(),
            detail: EventDetail::empty(),
        }
    }

    /// Base record for `kind` carrying `detail`
    pub fn with_detail(&self, kind: &str, detail: EventDetail) -> Message {
        Message {
            detail,
            ..self.base(kind)
        }
    }
}

impl std::fmt::Debug for MessageBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageBuilder")
            .field("instance_id", &self.instance_id)
            .finish()
    }
}
