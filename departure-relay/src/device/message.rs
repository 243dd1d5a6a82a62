//! Outbound message representation.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use super::keys::OutboundKey;

/// Value carried under a message key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum MessageValue {
    Text(String),
    Int(i32),
}

/// One key/value message for the watch.
///
/// Serializes as a single-entry object, e.g. `{"NO_INTERNET":1}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub key: OutboundKey,
    pub value: MessageValue,
}

impl OutboundMessage {
    pub fn text(key: OutboundKey, text: impl Into<String>) -> Self {
        Self {
            key,
            value: MessageValue::Text(text.into()),
        }
    }

    pub fn int(key: OutboundKey, value: i32) -> Self {
        Self {
            key,
            value: MessageValue::Int(value),
        }
    }

    /// The `NO_INTERNET` message.
    pub fn no_internet() -> Self {
        Self::int(OutboundKey::NoInternet, 1)
    }

    /// Text payload, if this message carries one.
    pub fn as_text(&self) -> Option<&str> {
        match &self.value {
            MessageValue::Text(text) => Some(text),
            MessageValue::Int(_) => None,
        }
    }
}

impl Serialize for OutboundMessage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(self.key.as_str(), &self.value)?;
        map.end()
    }
}
