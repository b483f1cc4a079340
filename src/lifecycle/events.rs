//! Event storage.

use serde_json::Value;
use tracing::info;

use crate::db::{DbPool, Event};
use crate::error::{classify_write, Error, Result};

pub async fn create_event(
    db: &DbPool,
    name: &str,
    criteria: &Value,
    details: Option<&Value>,
) -> Result<()> {
    let details = details.filter(|d| !d.is_null()).map(Value::to_string);

    sqlx::query("INSERT INTO events (name, criteria, details) VALUES (?, ?, ?)")
        .bind(name)
        .bind(criteria.to_string())
        .bind(details)
        .execute(db)
        .await
        .map_err(|e| classify_write(e, (3, "Event already exists"), (2, "Event does not exist")))?;

    info!(event = %name, "Event created");
    Ok(())
}

/// Names of all events, alphabetically
pub async fn list_events(db: &DbPool) -> Result<Vec<String>> {
    let names = sqlx::query_scalar::<_, String>("SELECT name FROM events ORDER BY name")
        .fetch_all(db)
        .await?;
    Ok(names)
}

pub async fn get_event(db: &DbPool, name: &str) -> Result<Event> {
    sqlx::query_as::<_, Event>("SELECT * FROM events WHERE name = ?")
        .bind(name)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| Error::not_found(2, "Event does not exist"))
}

pub(crate) async fn ensure_event_exists(db: &DbPool, name: &str) -> Result<()> {
    let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM events WHERE name = ?")
        .bind(name)
        .fetch_optional(db)
        .await?;
    match exists {
        Some(_) => Ok(()),
        None => Err(Error::not_found(2, "Event does not exist")),
    }
}

/// Partial update: a `None` field keeps its stored value
pub async fn update_event(
    db: &DbPool,
    name: &str,
    criteria: Option<&Value>,
    details: Option<&Value>,
) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE events SET
            criteria = COALESCE(?, criteria),
            details = COALESCE(?, details),
            updated_at = datetime('now')
        WHERE name = ?
        "#,
    )
    .bind(criteria.map(Value::to_string))
    .bind(details.map(Value::to_string))
    .bind(name)
    .execute(db)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::not_found(11, "Unable to update, event does not exist"));
    }

    info!(event = %name, "Event updated");
    Ok(())
}

/// Delete an event. Registrations, approvals and interviews go with it.
pub async fn delete_event(db: &DbPool, name: &str) -> Result<()> {
    let result = sqlx::query("DELETE FROM events WHERE name = ?")
        .bind(name)
        .execute(db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::not_found(1, "Event does not exist"));
    }

    info!(event = %name, "Event deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::EventResponse;
    use crate::error::ErrorKind;
    use crate::lifecycle::test_support;
    use serde_json::json;

    #[tokio::test]
    async fn test_create_and_list() {
        let db = test_support::pool().await;
        create_event(&db, "event2", &json!({}), Some(&Value::Null)).await.unwrap();
        create_event(&db, "event1", &json!({}), None).await.unwrap();

        assert_eq!(list_events(&db).await.unwrap(), vec!["event1", "event2"]);
        // Explicit null details are stored as absent
        assert_eq!(get_event(&db, "event2").await.unwrap().details, None);

        let err = create_event(&db, "event1", &json!({}), None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(err.to_string(), "003: Event already exists");
    }

    #[tokio::test]
    async fn test_round_trip_keeps_criteria_and_details() {
        let db = test_support::pool().await;
        create_event(&db, "event1", &json!({}), None).await.unwrap();
        create_event(&db, "event2", &json!({"min_gpa": 3.0}), Some(&json!({"room": "B12"})))
            .await
            .unwrap();

        let first = EventResponse::from(get_event(&db, "event1").await.unwrap());
        assert_eq!(
            first,
            EventResponse {
                name: "event1".to_string(),
                criteria: json!({}),
                details: None,
            }
        );

        let second = EventResponse::from(get_event(&db, "event2").await.unwrap());
        assert_eq!(second.criteria, json!({"min_gpa": 3.0}));
        assert_eq!(second.details, Some(json!({"room": "B12"})));
    }

    #[tokio::test]
    async fn test_partial_update() {
        let db = test_support::pool().await;
        create_event(&db, "event1", &json!({"year": 3}), Some(&json!({"room": "A"})))
            .await
            .unwrap();

        update_event(&db, "event1", None, Some(&json!({"room": "B"})))
            .await
            .unwrap();

        let event = EventResponse::from(get_event(&db, "event1").await.unwrap());
        assert_eq!(event.criteria, json!({"year": 3}));
        assert_eq!(event.details, Some(json!({"room": "B"})));

        let err = update_event(&db, "missing", Some(&json!({})), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_delete_missing_event() {
        let db = test_support::pool().await;
        test_support::event(&db, "event1").await;

        delete_event(&db, "event1").await.unwrap();
        let err = delete_event(&db, "event1").await.unwrap_err();
        assert_eq!(err.to_string(), "001: Event does not exist");
        assert_eq!(get_event(&db, "event1").await.unwrap_err().kind(), ErrorKind::NotFound);
    }
}
