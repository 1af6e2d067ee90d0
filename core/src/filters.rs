use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::FilterError;

pub const DEFAULT_LIMIT: u32 = 20;

/// Storage key for the JSON-encoded [`FilterState`].
pub const FILTERS_STORAGE_KEY: &str = "ledger.events.filters";
/// Storage key for the plain search string.
pub const SEARCH_STORAGE_KEY: &str = "ledger.events.search";

/// A filter field other than pagination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterKey {
    AgentId,
    ToolId,
    TagId,
    EventType,
    Severity,
    Source,
    Start,
    End,
}

impl FilterKey {
    /// Projection order of the chips.
    pub const ALL: [FilterKey; 8] = [
        FilterKey::AgentId,
        FilterKey::ToolId,
        FilterKey::TagId,
        FilterKey::EventType,
        FilterKey::Severity,
        FilterKey::Source,
        FilterKey::Start,
        FilterKey::End,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FilterKey::AgentId => "agentId",
            FilterKey::ToolId => "toolId",
            FilterKey::TagId => "tagId",
            FilterKey::EventType => "eventType",
            FilterKey::Severity => "severity",
            FilterKey::Source => "source",
            FilterKey::Start => "start",
            FilterKey::End => "end",
        }
    }

    /// Whether changing this field reloads the event list by itself.
    ///
    /// `tagId` is not a trigger; its value is picked up by the next load.
    pub fn triggers_reload(self) -> bool {
        !matches!(self, FilterKey::TagId)
    }
}

impl fmt::Display for FilterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterKey {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.replace(['_', '-'], "").to_ascii_lowercase();
        FilterKey::ALL
            .into_iter()
            .find(|k| k.as_str().to_ascii_lowercase() == normalized)
            .or(match normalized.as_str() {
                "agent" => Some(FilterKey::AgentId),
                "tool" => Some(FilterKey::ToolId),
                "tag" => Some(FilterKey::TagId),
                "type" => Some(FilterKey::EventType),
                "from" => Some(FilterKey::Start),
                "to" | "until" => Some(FilterKey::End),
                _ => None,
            })
            .ok_or_else(|| FilterError::UnknownKey(s.to_string()))
    }
}

/// Filter and pagination state of the events view.
///
/// Field setters go through [`FilterState::set`], which resets `page` to 0:
/// a new result set invalidates the pagination position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterState {
    pub agent_id: String,
    pub tool_id: String,
    pub tag_id: String,
    pub event_type: String,
    pub severity: String,
    pub source: String,
    pub start: String,
    pub end: String,
    pub page: u32,
    pub limit: u32,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            agent_id: String::new(),
            tool_id: String::new(),
            tag_id: String::new(),
            event_type: String::new(),
            severity: String::new(),
            source: String::new(),
            start: String::new(),
            end: String::new(),
            page: 0,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl FilterState {
    /// Decode a persisted blob. Returns `None` when it does not parse;
    /// a persisted zero limit is replaced by the default.
    pub fn from_persisted(raw: &str) -> Option<Self> {
        let mut state: FilterState = serde_json::from_str(raw).ok()?;
        if state.limit == 0 {
            state.limit = DEFAULT_LIMIT;
        }
        Some(state)
    }

    pub fn get(&self, key: FilterKey) -> &str {
        match key {
            FilterKey::AgentId => &self.agent_id,
            FilterKey::ToolId => &self.tool_id,
            FilterKey::TagId => &self.tag_id,
            FilterKey::EventType => &self.event_type,
            FilterKey::Severity => &self.severity,
            FilterKey::Source => &self.source,
            FilterKey::Start => &self.start,
            FilterKey::End => &self.end,
        }
    }

    fn field_mut(&mut self, key: FilterKey) -> &mut String {
        match key {
            FilterKey::AgentId => &mut self.agent_id,
            FilterKey::ToolId => &mut self.tool_id,
            FilterKey::TagId => &mut self.tag_id,
            FilterKey::EventType => &mut self.event_type,
            FilterKey::Severity => &mut self.severity,
            FilterKey::Source => &mut self.source,
            FilterKey::Start => &mut self.start,
            FilterKey::End => &mut self.end,
        }
    }

    /// Set one filter field and reset `page` to 0. Returns whether the value
    /// changed.
    pub fn set(&mut self, key: FilterKey, value: impl Into<String>) -> bool {
        let value = value.into();
        self.page = 0;
        let slot = self.field_mut(key);
        if *slot == value {
            return false;
        }
        *slot = value;
        true
    }

    pub fn clear(&mut self, key: FilterKey) -> bool {
        self.set(key, String::new())
    }

    /// Reset every filter field, keeping the page size.
    pub fn clear_all(&mut self) {
        *self = FilterState {
            limit: self.limit,
            ..FilterState::default()
        };
    }

    pub fn set_page(&mut self, page: u32) -> bool {
        let changed = self.page != page;
        self.page = page;
        changed
    }

    pub fn set_limit(&mut self, limit: u32) -> Result<bool, FilterError> {
        if limit == 0 {
            return Err(FilterError::ZeroLimit);
        }
        let changed = self.limit != limit;
        self.limit = limit;
        Ok(changed)
    }

    pub fn has_active_filters(&self) -> bool {
        FilterKey::ALL.iter().any(|k| !self.get(*k).is_empty())
    }

    pub fn to_persisted(&self) -> String {
        // Plain strings and integers only; serialization cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}
