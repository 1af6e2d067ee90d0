use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::FilterError;
use crate::filters::{FilterKey, FilterState};
use crate::reference::ReferenceData;

/// Identifies what a chip removes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChipKey {
    Search,
    Filter(FilterKey),
}

impl ChipKey {
    pub fn as_str(self) -> &'static str {
        match self {
            ChipKey::Search => "search",
            ChipKey::Filter(key) => key.as_str(),
        }
    }
}

impl fmt::Display for ChipKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ChipKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl FromStr for ChipKey {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("search") {
            return Ok(ChipKey::Search);
        }
        s.parse().map(ChipKey::Filter)
    }
}

/// One active filter, as shown in the filter bar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterChip {
    pub key: ChipKey,
    pub label: String,
}

fn reference_label(kind: &str, name: Option<&str>, raw: &str) -> String {
    match name {
        Some(name) => format!("{kind}: {name}"),
        None => format!("{kind} #{raw}"),
    }
}

/// Derive the active filter chips: search first, then agent, tool and tag
/// (resolved through the reference data), then the plain fields. Ids that are
/// not loaded yet get a generic label instead of being hidden.
pub fn active_filters(search: &str, filters: &FilterState, refs: &ReferenceData) -> Vec<FilterChip> {
    let mut chips = Vec::new();
    if !search.is_empty() {
        chips.push(FilterChip {
            key: ChipKey::Search,
            label: format!("Search: {search}"),
        });
    }
    for key in FilterKey::ALL {
        let value = filters.get(key);
        if value.is_empty() {
            continue;
        }
        let label = match key {
            FilterKey::AgentId => reference_label("Agent", refs.agent_name(value), value),
            FilterKey::ToolId => reference_label("Tool", refs.tool_name(value), value),
            FilterKey::TagId => reference_label("Tag", refs.tag_name(value), value),
            FilterKey::EventType => format!("Type: {value}"),
            FilterKey::Severity => format!("Severity: {value}"),
            FilterKey::Source => format!("Source: {value}"),
            FilterKey::Start => format!("From: {value}"),
            FilterKey::End => format!("To: {value}"),
        };
        chips.push(FilterChip {
            key: ChipKey::Filter(key),
            label,
        });
    }
    chips
}

/// Remove one chip. Returns whether anything changed.
///
/// `search` clears the search string and nothing else; every other key clears
/// its filter field and resets the page.
pub fn remove_chip(key: ChipKey, search: &mut String, filters: &mut FilterState) -> bool {
    match key {
        ChipKey::Search => {
            let changed = !search.is_empty();
            search.clear();
            changed
        }
        ChipKey::Filter(field) => filters.clear(field),
    }
}
