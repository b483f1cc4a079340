//! Live interview state, tracked per login session.
//!
//! A session is either [`LiveInterview::Idle`] or inside exactly one
//! interview. Every mutation re-checks the caller-declared `(event, id)`
//! against the stored marker, so a caller cannot change the language of, or
//! end, an interview other than the one it started.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;

use crate::access::{authorize, Action, Caller};
use crate::db::Interview;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LiveInterview {
    #[default]
    Idle,
    InProgress {
        event: String,
        id: i64,
        language: Option<String>,
    },
}

/// A requested change of live state. `event`/`id` are what the caller
/// declares, not what is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition<'a> {
    Start { event: &'a str, id: i64 },
    SetLanguage { event: &'a str, id: i64, language: &'a str },
    End { event: &'a str, id: i64 },
}

impl LiveInterview {
    pub fn is_idle(&self) -> bool {
        matches!(self, LiveInterview::Idle)
    }

    /// Compute the state after `transition`, or the error that rejects it.
    /// `self` is never modified.
    pub fn apply(&self, transition: Transition<'_>) -> Result<LiveInterview> {
        match (self, transition) {
            (LiveInterview::Idle, Transition::Start { event, id }) => {
                Ok(LiveInterview::InProgress {
                    event: event.to_string(),
                    id,
                    language: None,
                })
            }
            (LiveInterview::InProgress { .. }, Transition::Start { .. }) => Err(Error::conflict(
                135,
                "An interview is already in progress for this session",
            )),

            (LiveInterview::Idle, Transition::SetLanguage { .. } | Transition::End { .. }) => Err(
                Error::NotInProgress(136, "No interview in progress".to_string()),
            ),

            (
                LiveInterview::InProgress { event, id, .. },
                Transition::SetLanguage {
                    event: declared_event,
                    id: declared_id,
                    language,
                },
            ) => {
                ensure_same_interview(event, *id, declared_event, declared_id)?;
                Ok(LiveInterview::InProgress {
                    event: event.clone(),
                    id: *id,
                    language: Some(language.to_string()),
                })
            }

            (
                LiveInterview::InProgress { event, id, .. },
                Transition::End {
                    event: declared_event,
                    id: declared_id,
                },
            ) => {
                ensure_same_interview(event, *id, declared_event, declared_id)?;
                Ok(LiveInterview::Idle)
            }
        }
    }

    /// Language to compile with. Idle sessions may not compile at all.
    pub fn compile_language(&self) -> Result<&str> {
        match self {
            LiveInterview::Idle => Err(Error::not_authorized(132, "Not in an interview")),
            LiveInterview::InProgress { language: None, .. } => Err(Error::NotConfigured(
                133,
                "No language selected for this interview".to_string(),
            )),
            LiveInterview::InProgress {
                language: Some(language),
                ..
            } => Ok(language),
        }
    }
}

fn ensure_same_interview(event: &str, id: i64, declared_event: &str, declared_id: i64) -> Result<()> {
    if event == declared_event && id == declared_id {
        Ok(())
    } else {
        Err(Error::conflict(
            137,
            "Interview does not match the one in progress",
        ))
    }
}

/// Live markers keyed by session id. Idle sessions have no entry.
#[derive(Debug, Clone, Default)]
pub struct LiveSessions {
    inner: Arc<DashMap<String, LiveInterview>>,
}

impl LiveSessions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, session_id: &str) -> LiveInterview {
        self.inner
            .get(session_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    /// Enter `interview`. Only its interviewer or interviewee may start it.
    pub fn start(&self, session_id: &str, caller: &Caller, interview: &Interview) -> Result<()> {
        authorize(
            Some(caller),
            &Action::StartInterview {
                interviewer: &interview.interviewer,
                interviewee: &interview.interviewee,
            },
        )
        .require(129)?;

        self.transition(
            session_id,
            Transition::Start {
                event: &interview.event,
                id: interview.id,
            },
        )?;
        tracing::info!(
            email = %caller.email,
            event = %interview.event,
            id = interview.id,
            "Interview started"
        );
        Ok(())
    }

    pub fn set_language(&self, session_id: &str, event: &str, id: i64, language: &str) -> Result<()> {
        self.transition(session_id, Transition::SetLanguage { event, id, language })?;
        Ok(())
    }

    pub fn end(&self, session_id: &str, event: &str, id: i64) -> Result<()> {
        self.transition(session_id, Transition::End { event, id })?;
        tracing::info!(event = %event, id = id, "Interview ended");
        Ok(())
    }

    pub fn compile_language(&self, session_id: &str) -> Result<String> {
        self.get(session_id).compile_language().map(str::to_string)
    }

    /// Forget the marker of a session that has ended
    pub fn clear(&self, session_id: &str) {
        self.inner.remove(session_id);
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Apply a transition under the entry lock, so two requests on the same
    /// session cannot interleave between the check and the write.
    fn transition(&self, session_id: &str, transition: Transition<'_>) -> Result<LiveInterview> {
        match self.inner.entry(session_id.to_string()) {
            Entry::Occupied(mut entry) => {
                let next = entry.get().apply(transition)?;
                if next.is_idle() {
                    entry.remove();
                } else {
                    entry.insert(next.clone());
                }
                Ok(next)
            }
            Entry::Vacant(entry) => {
                let next = LiveInterview::Idle.apply(transition)?;
                if !next.is_idle() {
                    entry.insert(next.clone());
                }
                Ok(next)
            }
        }
    }
}
