use std::str::FromStr;

use chrono::NaiveDate;
use serde::Serialize;

use crate::events::EventItem;
use crate::time::parse_server_timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    #[default]
    List,
    Timeline,
}

impl FromStr for ViewMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "list" => Ok(ViewMode::List),
            "timeline" => Ok(ViewMode::Timeline),
            other => Err(format!("unknown view '{other}' (expected list or timeline)")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Density {
    #[default]
    Comfortable,
    Compact,
}

impl FromStr for Density {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "comfortable" => Ok(Density::Comfortable),
            "compact" => Ok(Density::Compact),
            other => Err(format!("unknown density '{other}' (expected comfortable or compact)")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    pub key: &'static str,
    pub label: &'static str,
    pub visible: bool,
}

const DEFAULT_COLUMNS: [(&str, &str, bool); 8] = [
    ("timestamp", "Time", true),
    ("severity", "Severity", true),
    ("type", "Type", true),
    ("title", "Title", true),
    ("source", "Source", true),
    ("agents", "Agents", true),
    ("tools", "Tools", true),
    ("tags", "Tags", false),
];

/// Display options of the events view: mode, density and visible columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewSettings {
    pub mode: ViewMode,
    pub density: Density,
    pub columns: Vec<Column>,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            mode: ViewMode::default(),
            density: Density::default(),
            columns: DEFAULT_COLUMNS
                .iter()
                .map(|&(key, label, visible)| Column { key, label, visible })
                .collect(),
        }
    }
}

impl ViewSettings {
    /// Flip one column. Unknown keys are ignored; returns the new visibility.
    pub fn toggle_column(&mut self, key: &str) -> Option<bool> {
        let column = self.columns.iter_mut().find(|c| c.key == key)?;
        column.visible = !column.visible;
        Some(column.visible)
    }

    pub fn is_visible(&self, key: &str) -> bool {
        self.columns.iter().any(|c| c.key == key && c.visible)
    }

    pub fn visible_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|c| c.visible)
    }
}

/// Events of one calendar day, in list order.
#[derive(Debug, PartialEq)]
pub struct TimelineDay<'a> {
    /// `None` collects events whose timestamp does not parse.
    pub date: Option<NaiveDate>,
    pub events: Vec<&'a EventItem>,
}

/// Group consecutive events by their UTC day. The list arrives newest first,
/// so consecutive grouping keeps days in order.
pub fn timeline(events: &[EventItem]) -> Vec<TimelineDay<'_>> {
    let mut days: Vec<TimelineDay<'_>> = Vec::new();
    for event in events {
        let date = parse_server_timestamp(&event.timestamp).map(|dt| dt.date_naive());
        match days.last_mut() {
            Some(day) if day.date == date => day.events.push(event),
            _ => days.push(TimelineDay {
                date,
                events: vec![event],
            }),
        }
    }
    days
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::fixtures::event;

    #[test]
    fn toggle_column() {
        let mut view = ViewSettings::default();
        assert!(!view.is_visible("tags"));
        assert_eq!(view.toggle_column("tags"), Some(true));
        assert!(view.is_visible("tags"));
        assert_eq!(view.toggle_column("colour"), None);
        assert_eq!(view.visible_columns().count(), 8);
    }

    #[test]
    fn timeline_groups_by_day() {
        let mut a = event(1, "a");
        a.timestamp = "2025-11-21T08:00:00Z".to_string();
        let mut b = event(2, "b");
        b.timestamp = "2025-11-21T01:00:00".to_string();
        let mut c = event(3, "c");
        c.timestamp = "2025-11-20T23:00:00Z".to_string();
        let events = vec![a, b, c];

        let days = timeline(&events);
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].date, NaiveDate::from_ymd_opt(2025, 11, 21));
        assert_eq!(days[0].events.iter().map(|e| e.id).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(days[1].events[0].id, 3);
    }

    #[test]
    fn modes_parse() {
        assert_eq!("timeline".parse::<ViewMode>(), Ok(ViewMode::Timeline));
        assert_eq!("compact".parse::<Density>(), Ok(Density::Compact));
        assert!("grid".parse::<ViewMode>().is_err());
    }
}
