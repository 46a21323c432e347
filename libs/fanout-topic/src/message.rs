use std::fmt;

use serde::{Deserialize, Serialize};

/// Immutable unit of data carried by a topic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Message {
    id: i64,
    payload: String,
}

impl Message {
    pub fn new(id: i64, payload: impl Into<String>) -> Self {
        Self {
            id,
            payload: payload.into(),
        }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    pub fn into_payload(self) -> String {
        self.payload
    }
}

/// Identity of a subscriber cursor within one topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriberId(u32);

impl SubscriberId {
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl From<u32> for SubscriberId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_accessors() {
        let msg = Message::new(1003, "P1_msg_3");
        assert_eq!(msg.id(), 1003);
        assert_eq!(msg.payload(), "P1_msg_3");
        assert_eq!(msg.into_payload(), "P1_msg_3");
    }

    #[test]
    fn subscriber_id_serializes_as_plain_integer() {
        let json = serde_json::to_string(&SubscriberId::new(3)).unwrap();
        assert_eq!(json, "3");
        let back: SubscriberId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, SubscriberId::from(3));
    }
}
