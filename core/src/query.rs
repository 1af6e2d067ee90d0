use serde::Serialize;

use crate::events::EventItem;
use crate::filters::FilterState;
use crate::time::local_input_to_utc;

/// Banner text shown when the event list cannot be loaded.
pub const LOAD_ERROR_MESSAGE: &str = "Failed to load events";

/// Query parameters of `GET /api/events`. Empty filters are omitted.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct EventQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
    pub skip: u64,
    pub limit: u32,
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

fn absolute(field: &str, value: &str) -> Option<String> {
    if value.is_empty() {
        return None;
    }
    let converted = local_input_to_utc(value);
    if converted.is_none() {
        tracing::warn!(field, value, "ignoring unparseable date filter");
    }
    converted
}

impl EventQuery {
    pub fn build(filters: &FilterState, search: &str) -> Self {
        Self {
            search: non_empty(search),
            agent_id: non_empty(&filters.agent_id),
            tool_id: non_empty(&filters.tool_id),
            tag_id: non_empty(&filters.tag_id),
            event_type: non_empty(&filters.event_type),
            severity: non_empty(&filters.severity),
            source: non_empty(&filters.source),
            start: absolute("start", &filters.start),
            end: absolute("end", &filters.end),
            skip: u64::from(filters.page) * u64::from(filters.limit),
            limit: filters.limit,
        }
    }

    /// Ordered `(name, value)` pairs for the query string.
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let optional = [
            ("search", &self.search),
            ("agent_id", &self.agent_id),
            ("tool_id", &self.tool_id),
            ("tag_id", &self.tag_id),
            ("event_type", &self.event_type),
            ("severity", &self.severity),
            ("source", &self.source),
            ("start", &self.start),
            ("end", &self.end),
        ];
        let mut pairs: Vec<(&'static str, String)> = optional
            .into_iter()
            .filter_map(|(name, value)| value.as_ref().map(|v| (name, v.clone())))
            .collect();
        pairs.push(("skip", self.skip.to_string()));
        pairs.push(("limit", self.limit.to_string()));
        pairs
    }
}

/// Sequence number of one issued query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

/// What happened to a completed query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Applied,
    /// A newer query was issued after this one; its result was dropped.
    Stale,
}

/// Result list of the events view.
///
/// Each load takes a [`Ticket`]; only the completion carrying the newest
/// ticket may touch the list, so a slow response can never overwrite a
/// fresher one.
#[derive(Debug, Default)]
pub struct QueryState {
    events: Vec<EventItem>,
    loading: bool,
    error: Option<String>,
    issued: u64,
}

impl QueryState {
    pub fn events(&self) -> &[EventItem] {
        &self.events
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn begin(&mut self) -> Ticket {
        self.issued += 1;
        self.loading = true;
        self.error = None;
        Ticket(self.issued)
    }

    pub fn complete<E: std::fmt::Display>(
        &mut self,
        ticket: Ticket,
        result: Result<Vec<EventItem>, E>,
    ) -> Completion {
        if ticket.0 != self.issued {
            tracing::debug!(ticket = ticket.0, latest = self.issued, "dropping stale event page");
            return Completion::Stale;
        }
        match result {
            Ok(events) => {
                tracing::debug!(count = events.len(), "event page loaded");
                self.events = events;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to load events");
                self.error = Some(LOAD_ERROR_MESSAGE.to_string());
            }
        }
        self.loading = false;
        Completion::Applied
    }

    /// Drop one item locally (after a confirmed delete).
    pub fn remove(&mut self, id: i64) -> Option<EventItem> {
        let idx = self.events.iter().position(|e| e.id == id)?;
        Some(self.events.remove(idx))
    }

    pub fn find(&self, id: i64) -> Option<&EventItem> {
        self.events.iter().find(|e| e.id == id)
    }
}

/// "Prev" is available on every page but the first.
pub fn has_prev(filters: &FilterState) -> bool {
    filters.page > 0
}

/// "Next" is disabled once a page comes back short; there is no total count.
pub fn has_next(filters: &FilterState, page_len: usize) -> bool {
    page_len >= filters.limit as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::fixtures::event;
    use crate::filters::FilterKey;

    #[test]
    fn severity_only_query_omits_everything_else() {
        let mut filters = FilterState::default();
        filters.set(FilterKey::Severity, "critical");
        let query = EventQuery::build(&filters, "");
        assert_eq!(
            query.to_pairs(),
            vec![
                ("severity", "critical".to_string()),
                ("skip", "0".to_string()),
                ("limit", "20".to_string()),
            ]
        );
    }

    #[test]
    fn skip_is_page_times_limit() {
        let mut filters = FilterState::default();
        filters.set_limit(25).unwrap();
        filters.set_page(3);
        let query = EventQuery::build(&filters, "jenkins");
        assert_eq!(query.skip, 75);
        assert_eq!(query.limit, 25);
        assert_eq!(query.search.as_deref(), Some("jenkins"));
    }

    #[test]
    fn dates_become_absolute_and_garbage_is_dropped() {
        let mut filters = FilterState::default();
        filters.set(FilterKey::Start, "2025-11-20T08:00:00+00:00");
        filters.set(FilterKey::End, "soon");
        let query = EventQuery::build(&filters, "");
        assert_eq!(query.start.as_deref(), Some("2025-11-20T08:00:00.000Z"));
        assert_eq!(query.end, None);
    }

    #[test]
    fn tag_and_ids_pass_through() {
        let mut filters = FilterState::default();
        filters.set(FilterKey::AgentId, "2");
        filters.set(FilterKey::TagId, "9");
        let names: Vec<&str> = EventQuery::build(&filters, "").to_pairs().iter().map(|(n, _)| *n).collect();
        assert_eq!(names, vec!["agent_id", "tag_id", "skip", "limit"]);
    }

    #[test]
    fn load_lifecycle() {
        let mut state = QueryState::default();
        let ticket = state.begin();
        assert!(state.loading());
        assert_eq!(state.complete::<String>(ticket, Ok(vec![event(1, "a")])), Completion::Applied);
        assert!(!state.loading());
        assert_eq!(state.events().len(), 1);

        let ticket = state.begin();
        state.complete(ticket, Err("connection refused"));
        assert_eq!(state.error(), Some(LOAD_ERROR_MESSAGE));
        assert!(!state.loading());
        // a failed load keeps the previous page on screen
        assert_eq!(state.events().len(), 1);

        let ticket = state.begin();
        assert_eq!(state.error(), None);
        state.complete::<String>(ticket, Ok(Vec::new()));
        assert!(state.events().is_empty());
    }

    #[test]
    fn stale_completion_is_discarded() {
        let mut state = QueryState::default();
        let first = state.begin();
        let second = state.begin();
        assert_eq!(state.complete::<String>(second, Ok(vec![event(2, "fresh")])), Completion::Applied);
        assert_eq!(state.complete::<String>(first, Ok(vec![event(1, "old")])), Completion::Stale);
        assert_eq!(state.events()[0].title, "fresh");
    }

    #[test]
    fn pagination_buttons() {
        let mut filters = FilterState::default();
        assert!(!has_prev(&filters));
        filters.set_page(1);
        assert!(has_prev(&filters));
        assert!(has_next(&filters, 20));
        assert!(!has_next(&filters, 19));
    }

    #[test]
    fn remove_drops_only_that_item() {
        let mut state = QueryState::default();
        let ticket = state.begin();
        state.complete::<String>(ticket, Ok(vec![event(1, "a"), event(2, "b")]));
        assert_eq!(state.remove(1).map(|e| e.id), Some(1));
        assert!(state.remove(1).is_none());
        assert_eq!(state.events().len(), 1);
        assert!(state.find(2).is_some());
    }
}
