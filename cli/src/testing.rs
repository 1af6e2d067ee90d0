//! In-memory [`LedgerApi`] used by the controller and shell tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ledger_core::events::{
    EventAgentRef, EventCreatePayload, EventItem, EventSource, EventTagRef, EventToolRef,
    EventType, Severity,
};
use ledger_core::query::EventQuery;
use ledger_core::reference::{Agent, Tag, Tool};

use crate::api::{ApiError, LedgerApi};

#[derive(Debug, Default)]
struct State {
    events: Vec<EventItem>,
    next_id: i64,
    queries: Vec<EventQuery>,
    created: Vec<EventCreatePayload>,
    fail_reads: bool,
    fail_mutations: bool,
}

#[derive(Debug, Clone, Default)]
pub struct FakeApi {
    state: Arc<Mutex<State>>,
}

fn unavailable() -> ApiError {
    ApiError::Status {
        status: 503,
        detail: "unavailable".to_string(),
    }
}

fn agents() -> Vec<Agent> {
    vec![Agent {
        id: 1,
        name: "agent-1".to_string(),
        vm_hostname: None,
        os_type: Some("linux".to_string()),
        architecture: None,
        status: None,
    }]
}

fn tools() -> Vec<Tool> {
    vec![Tool {
        id: 4,
        name: "python".to_string(),
        tool_type: None,
        category: None,
    }]
}

fn tags() -> Vec<Tag> {
    vec![
        Tag { id: 3, name: "prod".to_string() },
        Tag { id: 5, name: "staging".to_string() },
    ]
}

fn materialize(id: i64, payload: &EventCreatePayload) -> EventItem {
    let agent_names = agents();
    let tool_names = tools();
    let tag_names = tags();
    EventItem {
        id,
        title: payload.title.clone(),
        description: payload.description.clone(),
        event_type: payload.event_type,
        severity: payload.severity,
        source: payload.source,
        timestamp: payload.timestamp.clone(),
        details: None,
        metadata: payload.metadata.clone(),
        agents: Some(
            payload
                .agent_ids
                .iter()
                .map(|id| EventAgentRef {
                    id: *id,
                    name: agent_names
                        .iter()
                        .find(|a| a.id == *id)
                        .map(|a| a.name.clone())
                        .unwrap_or_default(),
                })
                .collect(),
        ),
        tools: Some(
            payload
                .tool_versions
                .iter()
                .map(|tv| EventToolRef {
                    id: tv.tool_id,
                    name: tool_names
                        .iter()
                        .find(|t| t.id == tv.tool_id)
                        .map(|t| t.name.clone())
                        .unwrap_or_default(),
                    version_from: tv.version_from.clone(),
                    version_to: tv.version_to.clone(),
                })
                .collect(),
        ),
        tags: Some(
            payload
                .tag_ids
                .iter()
                .map(|id| EventTagRef {
                    id: *id,
                    name: tag_names
                        .iter()
                        .find(|t| t.id == *id)
                        .map(|t| t.name.clone())
                        .unwrap_or_default(),
                })
                .collect(),
        ),
        tag_ids: None,
    }
}

impl FakeApi {
    /// `count` events, newest first, one per hour.
    pub fn with_events(count: i64) -> Self {
        let api = FakeApi::default();
        {
            let mut state = api.state.lock().unwrap();
            for n in 0..count {
                let payload = EventCreatePayload {
                    title: format!("Event {n}"),
                    description: None,
                    event_type: EventType::ToolUpdate,
                    severity: if n % 3 == 0 { Severity::Critical } else { Severity::Info },
                    source: EventSource::Automated,
                    timestamp: format!("2025-11-{:02}T{:02}:00:00Z", 28 - n / 24, 23 - n % 24),
                    metadata: None,
                    agent_ids: vec![1],
                    tag_ids: vec![3],
                    tool_versions: Vec::new(),
                };
                state.next_id += 1;
                let id = state.next_id;
                state.events.push(materialize(id, &payload));
            }
        }
        api
    }

    pub fn fail_reads(&self, fail: bool) {
        self.state.lock().unwrap().fail_reads = fail;
    }

    pub fn fail_mutations(&self, fail: bool) {
        self.state.lock().unwrap().fail_mutations = fail;
    }

    pub fn queries(&self) -> Vec<EventQuery> {
        self.state.lock().unwrap().queries.clone()
    }

    pub fn events(&self) -> Vec<EventItem> {
        self.state.lock().unwrap().events.clone()
    }

    pub fn created_payloads(&self) -> Vec<EventCreatePayload> {
        self.state.lock().unwrap().created.clone()
    }
}

#[async_trait]
impl LedgerApi for FakeApi {
    async fn list_events(&self, query: &EventQuery) -> Result<Vec<EventItem>, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.queries.push(query.clone());
        if state.fail_reads {
            return Err(unavailable());
        }
        let mut matching: Vec<EventItem> = state
            .events
            .iter()
            .filter(|e| query.severity.as_deref().is_none_or(|s| e.severity.as_str() == s))
            .filter(|e| {
                query
                    .search
                    .as_deref()
                    .is_none_or(|s| e.title.to_lowercase().contains(&s.to_lowercase()))
            })
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(matching
            .into_iter()
            .skip(query.skip as usize)
            .take(query.limit as usize)
            .collect())
    }

    async fn get_event(&self, id: i64) -> Result<EventItem, ApiError> {
        let state = self.state.lock().unwrap();
        state
            .events
            .iter()
            .find(|e| e.id == id)
            .cloned()
            .ok_or(ApiError::Status {
                status: 404,
                detail: "Event not found".to_string(),
            })
    }

    async fn create_event(&self, payload: &EventCreatePayload) -> Result<EventItem, ApiError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_mutations {
            return Err(unavailable());
        }
        state.next_id += 1;
        let item = materialize(state.next_id, payload);
        state.events.push(item.clone());
        state.created.push(payload.clone());
        Ok(item)
    }

    async fn delete_event(&self, id: i64) -> Result<(), ApiError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_mutations {
            return Err(unavailable());
        }
        let before = state.events.len();
        state.events.retain(|e| e.id != id);
        if state.events.len() == before {
            return Err(ApiError::Status {
                status: 404,
                detail: "Event not found".to_string(),
            });
        }
        Ok(())
    }

    async fn list_agents(&self) -> Result<Vec<Agent>, ApiError> {
        if self.state.lock().unwrap().fail_reads {
            return Err(unavailable());
        }
        Ok(agents())
    }

    async fn list_tools(&self) -> Result<Vec<Tool>, ApiError> {
        if self.state.lock().unwrap().fail_reads {
            return Err(unavailable());
        }
        Ok(tools())
    }

    async fn list_tags(&self) -> Result<Vec<Tag>, ApiError> {
        if self.state.lock().unwrap().fail_reads {
            return Err(unavailable());
        }
        Ok(tags())
    }
}
