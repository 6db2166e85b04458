use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single tracked occurrence along with its capture metadata.
///
/// Events are immutable once created. The serialized field names match the
/// collector wire format: `event`, `properties`, `timestamp`, `url` and
/// `userAgent`.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Event {
    #[serde(rename = "event")]
    name: String,

    properties: Value,

    timestamp: i64,

    #[serde(rename = "url")]
    origin: String,

    #[serde(rename = "userAgent")]
    agent: String,
}

impl Event {
    /// Creates a new event stamped with the current time.
    pub fn new(
        name: impl Into<String>,
        properties: impl Into<Value>,
        origin: impl Into<String>,
        agent: impl Into<String>,
    ) -> Self {
        Self::at(
            Utc::now().timestamp_millis(),
            name,
            properties,
            origin,
            agent,
        )
    }

    /// Creates a new event with an explicit timestamp (milliseconds since epoch).
    pub fn at(
        timestamp: i64,
        name: impl Into<String>,
        properties: impl Into<Value>,
        origin: impl Into<String>,
        agent: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            properties: properties.into(),
            timestamp,
            origin: origin.into(),
            agent: agent.into(),
        }
    }

    /// The event name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The caller-supplied properties, passed through untouched.
    #[must_use]
    pub const fn properties(&self) -> &Value {
        &self.properties
    }

    /// Milliseconds since the Unix epoch at which the event was created.
    #[must_use]
    pub const fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Location identifier of the triggering context, empty when unknown.
    #[must_use]
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Client identifier of the triggering context, empty when unknown.
    #[must_use]
    pub fn agent(&self) -> &str {
        &self.agent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_serializes_with_wire_names() {
        let event = Event::at(
            1_700_000_000_000,
            "page_load",
            json!({ "match": "home", "page": "home" }),
            "https://example.com/",
            "beacon/0.1.0",
        );

        let value = serde_json::to_value(&event).unwrap();

        assert_eq!(
            value,
            json!({
                "event": "page_load",
                "properties": { "match": "home", "page": "home" },
                "timestamp": 1_700_000_000_000_i64,
                "url": "https://example.com/",
                "userAgent": "beacon/0.1.0",
            })
        );
    }

    #[test]
    fn test_new_stamps_current_time() {
        let before = Utc::now().timestamp_millis();
        let event = Event::new("click", json!({}), "", "");
        let after = Utc::now().timestamp_millis();

        assert!(event.timestamp() >= before && event.timestamp() <= after);
        assert_eq!(event.origin(), "");
        assert_eq!(event.agent(), "");
    }
}
