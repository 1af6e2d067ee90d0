use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::reference::Tag;

/// Kind of infrastructure change recorded by an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    ToolInstall,
    ToolUpdate,
    ToolRemoval,
    Outage,
    Patch,
    Rollout,
    ConfigChange,
}

impl EventType {
    pub const ALL: [EventType; 7] = [
        EventType::ToolInstall,
        EventType::ToolUpdate,
        EventType::ToolRemoval,
        EventType::Outage,
        EventType::Patch,
        EventType::Rollout,
        EventType::ConfigChange,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EventType::ToolInstall => "tool_install",
            EventType::ToolUpdate => "tool_update",
            EventType::ToolRemoval => "tool_removal",
            EventType::Outage => "outage",
            EventType::Patch => "patch",
            EventType::Rollout => "rollout",
            EventType::ConfigChange => "config_change",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    #[default]
    Info,
    Warning,
    Critical,
}

impl Severity {
    pub const ALL: [Severity; 3] = [Severity::Info, Severity::Warning, Severity::Critical];

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        }
    }
}

/// Where an event came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EventSource {
    #[default]
    Manual,
    Automated,
    Webhook,
}

impl EventSource {
    pub const ALL: [EventSource; 3] = [
        EventSource::Manual,
        EventSource::Automated,
        EventSource::Webhook,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EventSource::Manual => "manual",
            EventSource::Automated => "automated",
            EventSource::Webhook => "webhook",
        }
    }
}

macro_rules! impl_wire_enum {
    ($ty:ty, $what:literal) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::ALL
                    .into_iter()
                    .find(|v| v.as_str() == s)
                    .ok_or_else(|| {
                        let allowed: Vec<&str> = Self::ALL.iter().map(|v| v.as_str()).collect();
                        format!("unknown {} '{}' (expected one of: {})", $what, s, allowed.join(", "))
                    })
            }
        }
    };
}

impl_wire_enum!(EventType, "event type");
impl_wire_enum!(Severity, "severity");
impl_wire_enum!(EventSource, "source");

/// Agent reference embedded in an event read model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventAgentRef {
    pub id: i64,
    pub name: String,
}

/// Tool reference embedded in an event, with the version change it recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventToolRef {
    pub id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_to: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventTagRef {
    pub id: i64,
    pub name: String,
}

/// A change event as returned by `GET /api/events`.
///
/// `tags` and `tag_ids` describe the same relationship. Readers should go
/// through [`EventItem::tag_names`] / [`EventItem::resolved_tag_ids`] rather
/// than picking one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventItem {
    pub id: i64,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub event_type: EventType,
    pub severity: Severity,
    pub source: EventSource,
    /// ISO-8601, as sent by the server.
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agents: Option<Vec<EventAgentRef>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<EventToolRef>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<EventTagRef>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_ids: Option<Vec<i64>>,
}

impl EventItem {
    /// Tag ids of this event, preferring the resolved `tags` list.
    pub fn resolved_tag_ids(&self) -> Vec<i64> {
        match (&self.tags, &self.tag_ids) {
            (Some(tags), _) if !tags.is_empty() => tags.iter().map(|t| t.id).collect(),
            (_, Some(ids)) => ids.clone(),
            _ => Vec::new(),
        }
    }

    /// Display names of this event's tags. Falls back to resolving `tag_ids`
    /// against the loaded tag reference set; unknown ids render as `#<id>`.
    pub fn tag_names(&self, known: &BTreeMap<i64, Tag>) -> Vec<String> {
        if let Some(tags) = self.tags.as_ref().filter(|t| !t.is_empty()) {
            return tags.iter().map(|t| t.name.clone()).collect();
        }
        self.tag_ids
            .iter()
            .flatten()
            .map(|id| match known.get(id) {
                Some(tag) => tag.name.clone(),
                None => format!("#{id}"),
            })
            .collect()
    }
}

/// Tool version change inside a create payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolVersionPayload {
    pub tool_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_to: Option<String>,
}

/// Body of `POST /api/events`. Relations are flattened to id lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventCreatePayload {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub event_type: EventType,
    pub severity: Severity,
    pub source: EventSource,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(default)]
    pub agent_ids: Vec<i64>,
    #[serde(default)]
    pub tag_ids: Vec<i64>,
    #[serde(default)]
    pub tool_versions: Vec<ToolVersionPayload>,
}

impl From<&EventItem> for EventCreatePayload {
    fn from(item: &EventItem) -> Self {
        Self {
            title: item.title.clone(),
            description: item.description.clone(),
            event_type: item.event_type,
            severity: item.severity,
            source: item.source,
            timestamp: item.timestamp.clone(),
            metadata: item.metadata.clone(),
            agent_ids: item.agents.iter().flatten().map(|a| a.id).collect(),
            tag_ids: item.resolved_tag_ids(),
            tool_versions: item
                .tools
                .iter()
                .flatten()
                .map(|t| ToolVersionPayload {
                    tool_id: t.id,
                    version_from: t.version_from.clone(),
                    version_to: t.version_to.clone(),
                })
                .collect(),
        }
    }
}
