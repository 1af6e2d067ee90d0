use crate::error::ValidationError;
use crate::events::{EventCreatePayload, EventSource, EventType, Severity, ToolVersionPayload};
use crate::time::local_input_to_utc;

/// Raw values of the create-event form, exactly as typed or selected.
#[derive(Debug, Clone, Default)]
pub struct EventForm {
    pub title: String,
    pub description: String,
    pub event_type: String,
    pub severity: String,
    pub source: String,
    /// Local datetime input; empty means "now".
    pub timestamp: String,
    pub agent_ids: Vec<String>,
    pub tool_id: String,
    pub version_from: String,
    pub version_to: String,
    pub tag_ids: Vec<String>,
    /// Free-form JSON object text.
    pub metadata: String,
}

fn parse_ids(field: &'static str, raw: &[String]) -> Result<Vec<i64>, ValidationError> {
    raw.iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i64>()
                .map_err(|_| ValidationError::new(field, format!("'{s}' is not a valid id")))
        })
        .collect()
}

fn optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn parse_enum<T: std::str::FromStr<Err = String> + Default>(
    field: &'static str,
    raw: &str,
) -> Result<T, ValidationError> {
    if raw.trim().is_empty() {
        return Ok(T::default());
    }
    raw.trim().parse().map_err(|e| ValidationError::new(field, e))
}

impl EventForm {
    /// Validate and convert to a create payload. Nothing is sent when this
    /// fails.
    pub fn to_payload(&self) -> Result<EventCreatePayload, ValidationError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(ValidationError::new("title", "title is required"));
        }

        let event_type = self.event_type.trim();
        if event_type.is_empty() {
            return Err(ValidationError::new("event_type", "event type is required"));
        }
        let event_type: EventType = event_type
            .parse()
            .map_err(|e| ValidationError::new("event_type", e))?;
        let severity: Severity = parse_enum("severity", &self.severity)?;
        let source: EventSource = parse_enum("source", &self.source)?;

        let timestamp = if self.timestamp.trim().is_empty() {
            chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
        } else {
            local_input_to_utc(&self.timestamp).ok_or_else(|| {
                ValidationError::new("timestamp", format!("'{}' is not a valid date/time", self.timestamp))
            })?
        };

        let metadata = match self.metadata.trim() {
            "" => None,
            raw => match serde_json::from_str::<serde_json::Value>(raw) {
                Ok(serde_json::Value::Object(map)) => Some(map),
                Ok(_) => return Err(ValidationError::new("metadata", "metadata must be a JSON object")),
                Err(e) => return Err(ValidationError::new("metadata", format!("invalid JSON: {e}"))),
            },
        };

        let tool_versions = match optional(&self.tool_id) {
            None => Vec::new(),
            Some(raw) => {
                let tool_id = raw
                    .parse::<i64>()
                    .map_err(|_| ValidationError::new("tool_id", format!("'{raw}' is not a valid id")))?;
                vec![ToolVersionPayload {
                    tool_id,
                    version_from: optional(&self.version_from),
                    version_to: optional(&self.version_to),
                }]
            }
        };

        Ok(EventCreatePayload {
            title: title.to_string(),
            description: optional(&self.description),
            event_type,
            severity,
            source,
            timestamp,
            metadata,
            agent_ids: parse_ids("agent_ids", &self.agent_ids)?,
            tag_ids: parse_ids("tag_ids", &self.tag_ids)?,
            tool_versions,
        })
    }
}
