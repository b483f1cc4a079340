//! Authenticated login sessions.
//!
//! A session row maps the SHA-256 of a bearer token to an account. The
//! plaintext token is only ever returned to the client at login.

use chrono::{Duration, Utc};
use tokio::time::{interval, MissedTickBehavior};

use crate::crypto::{generate_token, hash_token};
use crate::db::{DbPool, Session};
use crate::error::Result;
use crate::live::LiveSessions;

/// SQLite `datetime('now')` layout, so expiry compares as text
const EXPIRY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A session that was just created, with the token to hand to the client
#[derive(Debug, Clone)]
pub struct NewSession {
    pub id: String,
    pub token: String,
}

pub async fn create_session(db: &DbPool, email: &str, ttl: Duration) -> Result<NewSession> {
    let token = generate_token();
    let id = uuid::Uuid::new_v4().to_string();
    let expires_at = (Utc::now() + ttl).format(EXPIRY_FORMAT).to_string();

    sqlx::query("INSERT INTO sessions (id, email, token_hash, expires_at) VALUES (?, ?, ?, ?)")
        .bind(&id)
        .bind(email)
        .bind(hash_token(&token))
        .bind(&expires_at)
        .execute(db)
        .await?;

    Ok(NewSession { id, token })
}

/// Look up an unexpired session by its plaintext token
pub async fn find_session(db: &DbPool, token: &str) -> Result<Option<Session>> {
    let session = sqlx::query_as::<_, Session>(
        "SELECT * FROM sessions WHERE token_hash = ? AND expires_at > datetime('now')",
    )
    .bind(hash_token(token))
    .fetch_optional(db)
    .await?;
    Ok(session)
}

pub async fn delete_session(db: &DbPool, id: &str) -> Result<()> {
    sqlx::query("DELETE FROM sessions WHERE id = ?")
        .bind(id)
        .execute(db)
        .await?;
    Ok(())
}

/// Revoke every session of an account. Returns the removed session ids.
pub async fn delete_sessions_for(db: &DbPool, email: &str) -> Result<Vec<String>> {
    let ids = sqlx::query_scalar::<_, String>("DELETE FROM sessions WHERE email = ? RETURNING id")
        .bind(email)
        .fetch_all(db)
        .await?;
    Ok(ids)
}

/// Delete expired sessions. Returns the removed session ids.
pub async fn purge_expired(db: &DbPool) -> Result<Vec<String>> {
    let ids = sqlx::query_scalar::<_, String>(
        "DELETE FROM sessions WHERE expires_at <= datetime('now') RETURNING id",
    )
    .fetch_all(db)
    .await?;
    Ok(ids)
}

/// Spawn the background task that removes expired sessions together with
/// their live-interview markers.
pub fn spawn_cleanup_task(db: DbPool, live: LiveSessions, interval_secs: u64) {
    tracing::info!(interval_secs = interval_secs, "Starting session cleanup task");

    tokio::spawn(async move {
        let mut tick = interval(std::time::Duration::from_secs(interval_secs.max(1)));
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tick.tick().await;
            match purge_expired(&db).await {
                Ok(ids) => {
                    for id in &ids {
                        live.clear(id);
                    }
                    if !ids.is_empty() {
                        tracing::info!(count = ids.len(), "Removed expired sessions");
                    }
                }
                Err(e) => tracing::error!(error = %e, "Session cleanup failed"),
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Role;
    use crate::lifecycle::test_support;

    #[tokio::test]
    async fn test_session_lookup_by_token() {
        let db = test_support::pool().await;
        test_support::account(&db, "a@x.com", Role::Interviewee).await;

        let created = create_session(&db, "a@x.com", Duration::hours(1)).await.unwrap();
        let session = find_session(&db, &created.token).await.unwrap().unwrap();
        assert_eq!(session.id, created.id);
        assert_eq!(session.email, "a@x.com");
        assert_ne!(session.token_hash, created.token);

        assert!(find_session(&db, "bogus").await.unwrap().is_none());

        delete_session(&db, &created.id).await.unwrap();
        assert!(find_session(&db, &created.token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_sessions_are_ignored_and_purged() {
        let db = test_support::pool().await;
        test_support::account(&db, "a@x.com", Role::Interviewee).await;

        let stale = create_session(&db, "a@x.com", Duration::hours(-1)).await.unwrap();
        let fresh = create_session(&db, "a@x.com", Duration::hours(1)).await.unwrap();

        assert!(find_session(&db, &stale.token).await.unwrap().is_none());
        assert_eq!(purge_expired(&db).await.unwrap(), vec![stale.id]);
        assert!(find_session(&db, &fresh.token).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_revoke_all_sessions_of_account() {
        let db = test_support::pool().await;
        test_support::account(&db, "a@x.com", Role::Interviewee).await;
        test_support::account(&db, "b@x.com", Role::Interviewee).await;

        create_session(&db, "a@x.com", Duration::hours(1)).await.unwrap();
        create_session(&db, "a@x.com", Duration::hours(1)).await.unwrap();
        let other = create_session(&db, "b@x.com", Duration::hours(1)).await.unwrap();

        assert_eq!(delete_sessions_for(&db, "a@x.com").await.unwrap().len(), 2);
        assert!(find_session(&db, &other.token).await.unwrap().is_some());
    }
}
