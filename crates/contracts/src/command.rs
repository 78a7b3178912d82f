//! Commands - producer input
//!
//! One command is one unit of telemetry waiting to be written to the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Tag mapping shared by commands and wire objects
pub type Tags = BTreeMap<String, String>;

/// Time-series point(s) for one entity
///
/// The timestamp is mandatory for series; a command without one is rejected
/// by the transformer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesCommand {
    /// Entity name
    pub entity: String,

    /// Series tags
    #[serde(default)]
    pub tags: Tags,

    /// Sample timestamp
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,

    /// Metric name -> value
    #[serde(default)]
    pub metrics: BTreeMap<String, f64>,
}

impl SeriesCommand {
    pub fn new(entity: impl Into<String>, timestamp: Option<DateTime<Utc>>) -> Self {
        Self {
            entity: entity.into(),
            tags: Tags::new(),
            timestamp,
            metrics: BTreeMap::new(),
        }
    }

    pub fn with_metric(mut self, name: impl Into<String>, value: f64) -> Self {
        self.metrics.insert(name.into(), value);
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }
}

/// Entity-level tag update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityTagCommand {
    /// Entity name
    pub entity: String,

    /// Tags to set on the entity
    #[serde(default)]
    pub tags: Tags,

    /// Command timestamp (not forwarded to the store)
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl EntityTagCommand {
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            tags: Tags::new(),
            timestamp: None,
        }
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }
}

/// Property record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyCommand {
    /// Property type
    #[serde(rename = "type")]
    pub prop_type: String,

    /// Entity name
    pub entity: String,

    /// Property key
    #[serde(default)]
    pub key: Tags,

    /// Property tags
    #[serde(default)]
    pub tags: Tags,

    /// Optional timestamp
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl PropertyCommand {
    pub fn new(prop_type: impl Into<String>, entity: impl Into<String>) -> Self {
        Self {
            prop_type: prop_type.into(),
            entity: entity.into(),
            key: Tags::new(),
            tags: Tags::new(),
            timestamp: None,
        }
    }

    pub fn with_key(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.key.insert(key.into(), value.into());
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

/// Free-text message
///
/// The tags `severity`, `source` and `type` are reserved: besides being kept
/// as generic tags they populate dedicated wire fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageCommand {
    /// Entity name
    pub entity: String,

    /// Message text
    pub message: String,

    /// Message tags
    #[serde(default)]
    pub tags: Tags,

    /// Optional timestamp
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl MessageCommand {
    pub fn new(entity: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            message: message.into(),
            tags: Tags::new(),
            timestamp: None,
        }
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

/// Any command, tagged by kind (used for line-oriented input)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Command {
    Series(SeriesCommand),
    EntityTag(EntityTagCommand),
    Property(PropertyCommand),
    Message(MessageCommand),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_series_builder() {
        let cmd = SeriesCommand::new("host1", None)
            .with_metric("cpu", 1.5)
            .with_tag("dc", "eu");
        assert_eq!(cmd.metrics.get("cpu"), Some(&1.5));
        assert_eq!(cmd.tags.get("dc").map(String::as_str), Some("eu"));
        assert!(cmd.timestamp.is_none());
    }

    #[test]
    fn test_command_deserialize_tagged() {
        let line = r#"{"kind":"series","entity":"e1","timestamp":"2024-01-01T00:00:00Z","metrics":{"m":2.0}}"#;
        let cmd: Command = serde_json::from_str(line).unwrap();
        match cmd {
            Command::Series(s) => {
                assert_eq!(s.entity, "e1");
                assert!(s.timestamp.is_some());
                assert_eq!(s.metrics.len(), 1);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_property_type_field_rename() {
        let line = r#"{"kind":"property","type":"disk","entity":"e1","key":{"id":"sda"}}"#;
        let cmd: Command = serde_json::from_str(line).unwrap();
        let Command::Property(p) = cmd else {
            panic!("expected property");
        };
        assert_eq!(p.prop_type, "disk");
        assert_eq!(p.key.get("id").map(String::as_str), Some("sda"));
        assert!(p.tags.is_empty());
    }
}
