//! Event models and DTOs.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

use super::json_column;

#[derive(Debug, Clone, FromRow)]
pub struct Event {
    pub name: String,
    /// Eligibility criteria as JSON text
    pub criteria: String,
    pub details: Option<String>,
    /// Last interview id handed out for this event
    pub interview_seq: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventResponse {
    pub name: String,
    pub criteria: Value,
    pub details: Option<Value>,
}

impl From<Event> for EventResponse {
    fn from(event: Event) -> Self {
        Self {
            name: event.name,
            criteria: json_column(Some(&event.criteria)),
            details: event.details.as_deref().map(|d| json_column(Some(d))),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateEventRequest {
    pub name: Option<String>,
    pub criteria: Option<Value>,
    pub details: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateEventRequest {
    pub criteria: Option<Value>,
    pub details: Option<Value>,
}

impl UpdateEventRequest {
    /// True when neither field carries content (`{}`, `null` and `""` count as empty)
    pub fn is_empty(&self) -> bool {
        is_empty_value(self.criteria.as_ref()) && is_empty_value(self.details.as_ref())
    }
}

fn is_empty_value(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::Object(map)) => map.is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}

#[derive(Debug, Deserialize)]
pub struct ApproveRequest {
    pub email: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_update_request_emptiness() {
        assert!(UpdateEventRequest::default().is_empty());
        assert!(UpdateEventRequest {
            criteria: Some(json!({})),
            details: Some(Value::Null),
        }
        .is_empty());
        assert!(!UpdateEventRequest {
            criteria: None,
            details: Some(json!({"room": "B12"})),
        }
        .is_empty());
    }

    #[test]
    fn test_response_keeps_null_details() {
        let event = Event {
            name: "event1".to_string(),
            criteria: "{}".to_string(),
            details: None,
            interview_seq: 0,
            created_at: String::new(),
            updated_at: String::new(),
        };
        let response = EventResponse::from(event);
        assert_eq!(response.criteria, json!({}));
        assert_eq!(response.details, None);
    }
}
