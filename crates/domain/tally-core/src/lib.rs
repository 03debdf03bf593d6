use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod entry;
pub mod health;
pub mod notify;
pub mod service;
pub mod telemetry;

/// One inbound stream message. Backends use two envelope shapes: most carry
/// the payload under a `data` key, the monitoring feed puts payload fields
/// beside `type`. `Frame` keeps the whole body so both decode paths work.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub kind: String,
    raw: Value,
}

impl Frame {
    /// Parses one text frame. Returns `None` for anything that is not a JSON
    /// object with a string `type` field; callers drop those and keep the
    /// connection alive.
    pub fn parse(text: &str) -> Option<Self> {
        let raw: Value = serde_json::from_str(text).ok()?;
        let kind = raw.get("type")?.as_str()?.to_owned();
        Some(Self { kind, raw })
    }

    /// Decodes the payload under the `data` key. `None` when the payload is
    /// missing or does not match `T`.
    pub fn data<T: DeserializeOwned>(&self) -> Option<T> {
        serde_json::from_value(self.raw.get("data")?.clone()).ok()
    }

    /// Decodes the whole message body, for flat envelopes.
    pub fn body<T: DeserializeOwned>(&self) -> Option<T> {
        serde_json::from_value(self.raw.clone()).ok()
    }
}

/// Outbound subscription request, sent on every successful stream open.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscribe {
    #[serde(rename = "type")]
    kind: String,
    pub topics: Vec<String>,
}

impl Subscribe {
    pub fn new<I, S>(topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kind: "subscribe".to_owned(),
            topics: topics.into_iter().map(Into::into).collect(),
        }
    }
}
