use std::fmt::Write;

use ledger_core::chips::FilterChip;
use ledger_core::events::EventItem;
use ledger_core::filters::FilterState;
use ledger_core::reference::{InventoryItem, ReferenceData};
use ledger_core::time::parse_server_timestamp;
use ledger_core::toast::{Toast, ToastKind};
use ledger_core::view::{Density, ViewMode, ViewSettings, timeline};

const EMPTY_MESSAGE: &str = "No events match the current filters.";

fn truncate(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        return value.to_string();
    }
    let mut out: String = value.chars().take(width.saturating_sub(1)).collect();
    out.push('…');
    out
}

fn display_time(timestamp: &str) -> String {
    parse_server_timestamp(timestamp)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}

fn cell(event: &EventItem, key: &str, refs: &ReferenceData) -> String {
    match key {
        "timestamp" => display_time(&event.timestamp),
        "severity" => event.severity.to_string(),
        "type" => event.event_type.to_string(),
        "title" => event.title.clone(),
        "source" => event.source.to_string(),
        "agents" => event
            .agents
            .iter()
            .flatten()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(", "),
        "tools" => event
            .tools
            .iter()
            .flatten()
            .map(|t| match (&t.version_from, &t.version_to) {
                (Some(from), Some(to)) => format!("{} {from}→{to}", t.name),
                (None, Some(to)) => format!("{} {to}", t.name),
                _ => t.name.clone(),
            })
            .collect::<Vec<_>>()
            .join(", "),
        "tags" => event.tag_names(&refs.tags).join(", "),
        _ => String::new(),
    }
}

fn width(key: &str) -> usize {
    match key {
        "timestamp" => 16,
        "severity" => 8,
        "type" => 13,
        "title" => 36,
        "source" => 9,
        _ => 20,
    }
}

fn row(event: &EventItem, view: &ViewSettings, refs: &ReferenceData) -> String {
    let mut line = format!("#{:<5}", event.id);
    for column in view.visible_columns() {
        let w = width(column.key);
        let _ = write!(line, " {:<w$}", truncate(&cell(event, column.key, refs), w));
    }
    line.trim_end().to_string()
}

/// The events list or timeline, with the load banner on top.
pub fn events(
    events: &[EventItem],
    view: &ViewSettings,
    refs: &ReferenceData,
    error: Option<&str>,
) -> String {
    let mut out = String::new();
    if let Some(message) = error {
        let _ = writeln!(out, "! {message}");
    }
    if events.is_empty() {
        if error.is_none() {
            let _ = writeln!(out, "{EMPTY_MESSAGE}");
        }
        return out;
    }

    match view.mode {
        ViewMode::List => {
            let mut header = format!("{:<6}", "ID");
            for column in view.visible_columns() {
                let w = width(column.key);
                let _ = write!(header, " {:<w$}", column.label);
            }
            let _ = writeln!(out, "{}", header.trim_end());
            for event in events {
                let _ = writeln!(out, "{}", row(event, view, refs));
                if view.density == Density::Comfortable {
                    if let Some(desc) = event.description.as_deref().filter(|d| !d.is_empty()) {
                        let _ = writeln!(out, "       {}", truncate(desc, 100));
                    }
                }
            }
        }
        ViewMode::Timeline => {
            for day in timeline(events) {
                let heading = day
                    .date
                    .map(|d| d.format("%A, %B %-d %Y").to_string())
                    .unwrap_or_else(|| "Unknown date".to_string());
                let _ = writeln!(out, "── {heading}");
                for event in day.events {
                    let time = parse_server_timestamp(&event.timestamp)
                        .map(|dt| dt.format("%H:%M").to_string())
                        .unwrap_or_default();
                    let _ = writeln!(
                        out,
                        "  {time:<5} [{}] {} ({}, #{})",
                        event.severity, event.title, event.event_type, event.id
                    );
                    if view.density == Density::Comfortable {
                        let context: Vec<String> = ["agents", "tools", "tags"]
                            .into_iter()
                            .filter(|key| view.is_visible(key))
                            .map(|key| cell(event, key, refs))
                            .filter(|s| !s.is_empty())
                            .collect();
                        if !context.is_empty() {
                            let _ = writeln!(out, "        {}", context.join(" · "));
                        }
                    }
                }
            }
        }
    }
    out
}

pub fn chips(chips: &[FilterChip]) -> String {
    if chips.is_empty() {
        return "No active filters.\n".to_string();
    }
    let labels: Vec<String> = chips.iter().map(|c| format!("[{} ✕ {}]", c.label, c.key)).collect();
    format!("Filters: {}\n", labels.join(" "))
}

pub fn pagination(filters: &FilterState, page_len: usize, has_prev: bool, has_next: bool) -> String {
    let start = u64::from(filters.page) * u64::from(filters.limit);
    let range = if page_len == 0 {
        "no results".to_string()
    } else {
        format!("{}-{}", start.saturating_add(1), start.saturating_add(page_len as u64))
    };
    format!(
        "Page {} ({range}) · prev: {} · next: {}\n",
        u64::from(filters.page) + 1,
        if has_prev { "yes" } else { "no" },
        if has_next { "yes" } else { "no" },
    )
}

pub fn toasts<'a>(toasts: impl Iterator<Item = &'a Toast>) -> String {
    let mut out = String::new();
    for toast in toasts {
        let marker = match toast.kind {
            ToastKind::Success => "✓",
            ToastKind::Error => "✗",
            ToastKind::Info => "i",
        };
        let _ = write!(out, "{marker} {} (toast {})", toast.message, toast.id);
        if let Some(action) = &toast.action {
            let _ = write!(out, " · {} available", action.label());
        }
        out.push('\n');
    }
    out
}

pub fn inventory(items: &[InventoryItem]) -> String {
    if items.is_empty() {
        return "Nothing here yet.\n".to_string();
    }
    let mut out = String::new();
    for item in items {
        let _ = writeln!(
            out,
            "{:<6} {:<30} {}",
            format!("#{}", item.id()),
            truncate(item.name(), 30),
            item.summary()
        );
    }
    out
}
