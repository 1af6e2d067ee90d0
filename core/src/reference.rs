use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vm_hostname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub architecture: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub tool_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
}

/// The three inventory collections served under `/api/{kind}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Agents,
    Tools,
    Tags,
}

impl ResourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Agents => "agents",
            ResourceKind::Tools => "tools",
            ResourceKind::Tags => "tags",
        }
    }

    /// Collection path relative to the API root.
    pub fn path(self) -> String {
        format!("/api/{}", self.as_str())
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "agents" | "agent" => Ok(ResourceKind::Agents),
            "tools" | "tool" => Ok(ResourceKind::Tools),
            "tags" | "tag" => Ok(ResourceKind::Tags),
            other => Err(format!(
                "unknown resource '{other}' (expected agents, tools or tags)"
            )),
        }
    }
}

/// One row of the inventory view. Each variant carries only its own fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InventoryItem {
    Agent(Agent),
    Tool(Tool),
    Tag(Tag),
}

impl InventoryItem {
    pub fn id(&self) -> i64 {
        match self {
            InventoryItem::Agent(a) => a.id,
            InventoryItem::Tool(t) => t.id,
            InventoryItem::Tag(t) => t.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            InventoryItem::Agent(a) => &a.name,
            InventoryItem::Tool(t) => &t.name,
            InventoryItem::Tag(t) => &t.name,
        }
    }

    pub fn kind(&self) -> ResourceKind {
        match self {
            InventoryItem::Agent(_) => ResourceKind::Agents,
            InventoryItem::Tool(_) => ResourceKind::Tools,
            InventoryItem::Tag(_) => ResourceKind::Tags,
        }
    }

    /// Secondary column shown next to the name.
    pub fn summary(&self) -> String {
        match self {
            InventoryItem::Agent(a) => a.os_type.clone().unwrap_or_default(),
            InventoryItem::Tool(t) => match (&t.tool_type, &t.category) {
                (Some(ty), Some(cat)) => format!("{ty} / {cat}"),
                (Some(ty), None) => ty.clone(),
                (None, Some(cat)) => cat.clone(),
                (None, None) => String::new(),
            },
            InventoryItem::Tag(_) => String::new(),
        }
    }

    /// Decode a server row for the given collection.
    pub fn from_value(kind: ResourceKind, value: serde_json::Value) -> serde_json::Result<Self> {
        Ok(match kind {
            ResourceKind::Agents => InventoryItem::Agent(serde_json::from_value(value)?),
            ResourceKind::Tools => InventoryItem::Tool(serde_json::from_value(value)?),
            ResourceKind::Tags => InventoryItem::Tag(serde_json::from_value(value)?),
        })
    }
}

/// Read-only reference collections keyed by their own ids.
#[derive(Debug, Clone, Default)]
pub struct ReferenceData {
    pub agents: BTreeMap<i64, Agent>,
    pub tools: BTreeMap<i64, Tool>,
    pub tags: BTreeMap<i64, Tag>,
}

impl ReferenceData {
    pub fn set_agents(&mut self, agents: Vec<Agent>) {
        self.agents = agents.into_iter().map(|a| (a.id, a)).collect();
    }

    pub fn set_tools(&mut self, tools: Vec<Tool>) {
        self.tools = tools.into_iter().map(|t| (t.id, t)).collect();
    }

    pub fn set_tags(&mut self, tags: Vec<Tag>) {
        self.tags = tags.into_iter().map(|t| (t.id, t)).collect();
    }

    /// Name for a filter value holding an agent id. `None` when the value is
    /// not a known id (not loaded yet, or not numeric).
    pub fn agent_name(&self, raw_id: &str) -> Option<&str> {
        let id = raw_id.parse::<i64>().ok()?;
        self.agents.get(&id).map(|a| a.name.as_str())
    }

    pub fn tool_name(&self, raw_id: &str) -> Option<&str> {
        let id = raw_id.parse::<i64>().ok()?;
        self.tools.get(&id).map(|t| t.name.as_str())
    }

    pub fn tag_name(&self, raw_id: &str) -> Option<&str> {
        let id = raw_id.parse::<i64>().ok()?;
        self.tags.get(&id).map(|t| t.name.as_str())
    }
}
