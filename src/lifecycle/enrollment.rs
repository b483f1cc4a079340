//! Registration and approval: the `none -> pending -> approved` transitions
//! and the listings derived from them.

use tracing::info;

use super::events::ensure_event_exists;
use crate::db::DbPool;
use crate::error::{classify_write, Error, Result};

/// Record a pending application of `email` to `event`.
///
/// Fails with `Conflict` when the account is already pending or approved for
/// the event, and `NotFound` when the event does not exist. The approval check
/// and the insert are one statement, so no other writer can slip in between.
pub async fn apply_for_event(db: &DbPool, email: &str, event: &str) -> Result<()> {
    let inserted = sqlx::query(
        r#"
        INSERT INTO registrations (email, event)
        SELECT ?, ?
        WHERE NOT EXISTS (SELECT 1 FROM approvals WHERE email = ? AND event = ?)
        "#,
    )
    .bind(email)
    .bind(event)
    .bind(email)
    .bind(event)
    .execute(db)
    .await
    .map_err(|e| classify_write(e, (6, "Already Registered"), (13, "Event does not exist")))?;

    if inserted.rows_affected() == 0 {
        return Err(Error::conflict(6, "Already Registered"));
    }

    info!(email = %email, event = %event, "Registered for event");
    Ok(())
}

/// Move a pending registration to approved.
///
/// The delete and the insert commit together. Without a pending registration
/// there is nothing to approve and the call fails with `Conflict`; a second
/// approval of the same pair fails the same way.
pub async fn approve_registration(db: &DbPool, event: &str, email: &str) -> Result<()> {
    let mut tx = db.begin().await?;

    let removed = sqlx::query("DELETE FROM registrations WHERE email = ? AND event = ?")
        .bind(email)
        .bind(event)
        .execute(&mut *tx)
        .await?;
    if removed.rows_affected() == 0 {
        return Err(Error::conflict(7, "No pending registration to approve"));
    }

    sqlx::query("INSERT INTO approvals (email, event) VALUES (?, ?)")
        .bind(email)
        .bind(event)
        .execute(&mut *tx)
        .await
        .map_err(|e| classify_write(e, (7, "Already Approved"), (13, "Event does not exist")))?;

    tx.commit().await?;

    info!(email = %email, event = %event, "Registration approved");
    Ok(())
}

/// Emails with a pending registration for `event`
pub async fn list_registrations(db: &DbPool, event: &str) -> Result<Vec<String>> {
    ensure_event_exists(db, event).await?;
    let emails = sqlx::query_scalar::<_, String>(
        "SELECT email FROM registrations WHERE event = ? ORDER BY created_at, email",
    )
    .bind(event)
    .fetch_all(db)
    .await?;
    Ok(emails)
}

/// Emails approved for `event`
pub async fn list_approved(db: &DbPool, event: &str) -> Result<Vec<String>> {
    ensure_event_exists(db, event).await?;
    let emails = sqlx::query_scalar::<_, String>(
        "SELECT email FROM approvals WHERE event = ? ORDER BY created_at, email",
    )
    .bind(event)
    .fetch_all(db)
    .await?;
    Ok(emails)
}

/// Events the account has neither applied to nor been approved for
pub async fn events_not_registered(db: &DbPool, email: &str) -> Result<Vec<String>> {
    let names = sqlx::query_scalar::<_, String>(
        r#"
        SELECT name FROM events
        WHERE name NOT IN (SELECT event FROM registrations WHERE email = ?)
          AND name NOT IN (SELECT event FROM approvals WHERE email = ?)
        ORDER BY name
        "#,
    )
    .bind(email)
    .bind(email)
    .fetch_all(db)
    .await?;
    Ok(names)
}

/// Events the account applied to and is still waiting on
pub async fn events_registered(db: &DbPool, email: &str) -> Result<Vec<String>> {
    let names = sqlx::query_scalar::<_, String>(
        "SELECT event FROM registrations WHERE email = ? ORDER BY event",
    )
    .bind(email)
    .fetch_all(db)
    .await?;
    Ok(names)
}

/// Events the account has been approved for
pub async fn events_approved(db: &DbPool, email: &str) -> Result<Vec<String>> {
    let names =
        sqlx::query_scalar::<_, String>("SELECT event FROM approvals WHERE email = ? ORDER BY event")
            .bind(email)
            .fetch_all(db)
            .await?;
    Ok(names)
}
