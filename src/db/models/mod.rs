//! Database models split into domain-specific modules.

pub mod account;
pub mod event;
pub mod interview;
pub mod session;

pub use account::*;
pub use event::*;
pub use interview::*;
pub use session::*;

/// Parse a JSON column, treating unparseable text as `null`
pub(crate) fn json_column(raw: Option<&str>) -> serde_json::Value {
    raw.and_then(|s| serde_json::from_str(s).ok())
        .unwrap_or(serde_json::Value::Null)
}
