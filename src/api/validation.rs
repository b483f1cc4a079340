//! Input validation for API requests.
//!
//! Checks return `Err(message)`; handlers collect them with
//! `ValidationErrorBuilder` from the `error` module.

use chrono::{DateTime, NaiveDateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;

use crate::db::Role;

pub const MIN_PASSWORD_LENGTH: usize = 8;
const MAX_PASSWORD_LENGTH: usize = 128;

lazy_static! {
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9]([A-Za-z0-9-]*[A-Za-z0-9])?(\.[A-Za-z0-9]([A-Za-z0-9-]*[A-Za-z0-9])?)*$"
    ).unwrap();

    /// Event names appear in URL paths
    static ref EVENT_NAME_REGEX: Regex = Regex::new(
        r"^[A-Za-z0-9]([A-Za-z0-9 _.-]*[A-Za-z0-9])?$"
    ).unwrap();

    static ref LANGUAGE_REGEX: Regex = Regex::new(r"^[a-z0-9+#]{1,20}$").unwrap();
}

pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email is required".to_string());
    }
    if email.len() > 254 {
        return Err("Email is too long (max 254 characters)".to_string());
    }
    if !EMAIL_REGEX.is_match(email) {
        return Err("Invalid email format".to_string());
    }
    Ok(())
}

pub fn validate_event_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("Event name is required".to_string());
    }
    if name.len() > 100 {
        return Err("Event name is too long (max 100 characters)".to_string());
    }
    if !EVENT_NAME_REGEX.is_match(name) {
        return Err(
            "Event name must be alphanumeric with spaces, dots, dashes or underscores".to_string(),
        );
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), String> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        ));
    }
    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(format!(
            "Password is too long (max {} characters)",
            MAX_PASSWORD_LENGTH
        ));
    }
    Ok(())
}

pub fn parse_role(role: &str) -> Result<Role, String> {
    role.parse()
        .map_err(|_| "Role must be one of admin, interviewer, interviewee".to_string())
}

/// Accepts RFC 3339 (`2026-03-14T09:00:00Z`) or a naive
/// `YYYY-MM-DD HH:MM:SS`, which is taken as UTC.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, String> {
    let value = value.trim();
    if let Ok(time) = DateTime::parse_from_rfc3339(value) {
        return Ok(time.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .map(|naive| naive.and_utc())
        .map_err(|_| "Timestamp must be RFC 3339, e.g. 2026-03-14T09:00:00Z".to_string())
}

/// Language codes are short lowercase identifiers such as `python3` or `cpp`
pub fn validate_language(code: &str) -> Result<(), String> {
    if LANGUAGE_REGEX.is_match(code) {
        Ok(())
    } else {
        Err("Invalid language code".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_emails() {
        assert!(validate_email("a@x.com").is_ok());
        assert!(validate_email("first.last+tag@mail.example.org").is_ok());
    }

    #[test]
    fn test_invalid_emails() {
        assert!(validate_email("").is_err());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("a@").is_err());
        assert!(validate_email("a b@x.com").is_err());
        assert!(validate_email(&format!("{}@x.com", "a".repeat(260))).is_err());
    }

    #[test]
    fn test_event_names() {
        assert!(validate_event_name("e1").is_ok());
        assert!(validate_event_name("Spring Hiring 2026").is_ok());
        assert!(validate_event_name("").is_err());
        assert!(validate_event_name("a/b").is_err());
        assert!(validate_event_name(" padded").is_err());
    }

    #[test]
    fn test_password_length() {
        assert!(validate_password("12345678").is_ok());
        assert!(validate_password("short").is_err());
        assert!(validate_password(&"x".repeat(200)).is_err());
    }

    #[test]
    fn test_roles() {
        assert_eq!(parse_role("Interviewer").unwrap(), Role::Interviewer);
        assert!(parse_role("superuser").is_err());
    }

    #[test]
    fn test_timestamps() {
        let expected = "2026-03-14T09:00:00Z";
        let parsed = parse_timestamp("2026-03-14T09:00:00Z").unwrap();
        assert_eq!(parsed.to_rfc3339_opts(chrono::SecondsFormat::Secs, true), expected);

        let offset = parse_timestamp("2026-03-14T11:00:00+02:00").unwrap();
        assert_eq!(offset, parsed);

        let naive = parse_timestamp("2026-03-14 09:00:00").unwrap();
        assert_eq!(naive, parsed);

        assert!(parse_timestamp("next tuesday").is_err());
    }

    #[test]
    fn test_languages() {
        assert!(validate_language("python3").is_ok());
        assert!(validate_language("c++").is_ok());
        assert!(validate_language("Python").is_err());
        assert!(validate_language("").is_err());
    }
}
