//! Interview models and DTOs.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

use super::json_column;

#[derive(Debug, Clone, FromRow)]
pub struct Interview {
    pub event: String,
    /// Sequence id, unique within the event
    pub id: i64,
    pub interviewer: String,
    pub interviewee: String,
    /// Scheduled time (RFC 3339, UTC)
    pub time: String,
    pub results: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Interview {
    pub fn is_participant(&self, email: &str) -> bool {
        self.interviewer == email || self.interviewee == email
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewResponse {
    pub event: String,
    pub id: i64,
    pub interviewer: String,
    pub interviewee: String,
    pub time: String,
    pub results: Option<Value>,
}

impl From<Interview> for InterviewResponse {
    fn from(interview: Interview) -> Self {
        Self {
            results: interview.results.as_deref().map(|r| json_column(Some(r))),
            event: interview.event,
            id: interview.id,
            interviewer: interview.interviewer,
            interviewee: interview.interviewee,
            time: interview.time,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateInterviewRequest {
    pub interviewer: Option<String>,
    pub interviewee: Option<String>,
    /// RFC 3339 timestamp
    pub timestamp: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateInterviewResponse {
    pub create: bool,
    pub id: i64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateInterviewRequest {
    pub timestamp: Option<String>,
    pub results: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct SetLanguageRequest {
    pub language: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CompileRequest {
    pub source: Option<String>,
    #[serde(default)]
    pub input: String,
}
