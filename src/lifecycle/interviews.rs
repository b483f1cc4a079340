//! Interview scheduling and results.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use tracing::info;

use super::events::ensure_event_exists;
use crate::db::{DbPool, Interview};
use crate::error::{Error, Result};

/// Schedule an interview and return its per-event sequence id.
///
/// Both participants must hold an approval for the event. The approval
/// checks, the sequence bump and the insert share one transaction, and the
/// insert itself re-checks both approvals, so an interview never references
/// an unapproved participant.
pub async fn schedule_interview(
    db: &DbPool,
    event: &str,
    interviewer: &str,
    interviewee: &str,
    time: DateTime<Utc>,
) -> Result<i64> {
    let mut tx = db.begin().await?;

    let id: i64 = sqlx::query_scalar(
        r#"
        UPDATE events SET interview_seq = interview_seq + 1, updated_at = datetime('now')
        WHERE name = ?
        RETURNING interview_seq
        "#,
    )
    .bind(event)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| Error::not_found(2, "Event does not exist"))?;

    for (email, who) in [(interviewer, "Interviewer"), (interviewee, "Interviewee")] {
        let approved: Option<i64> =
            sqlx::query_scalar("SELECT 1 FROM approvals WHERE email = ? AND event = ?")
                .bind(email)
                .bind(event)
                .fetch_optional(&mut *tx)
                .await?;
        if approved.is_none() {
            return Err(Error::NotEligible(
                8,
                format!("{} has not been approved for this event", who),
            ));
        }
    }

    let inserted = sqlx::query(
        r#"
        INSERT INTO interviews (event, id, interviewer, interviewee, time)
        SELECT ?, ?, ?, ?, ?
        WHERE EXISTS (SELECT 1 FROM approvals WHERE email = ? AND event = ?)
          AND EXISTS (SELECT 1 FROM approvals WHERE email = ? AND event = ?)
        "#,
    )
    .bind(event)
    .bind(id)
    .bind(interviewer)
    .bind(interviewee)
    .bind(time.to_rfc3339_opts(SecondsFormat::Secs, true))
    .bind(interviewer)
    .bind(event)
    .bind(interviewee)
    .bind(event)
    .execute(&mut *tx)
    .await?;
    if inserted.rows_affected() == 0 {
        return Err(Error::NotEligible(8, "Unable to schedule the interview".to_string()));
    }

    tx.commit().await?;

    info!(
        event = %event,
        id = id,
        interviewer = %interviewer,
        interviewee = %interviewee,
        "Interview scheduled"
    );
    Ok(id)
}

/// Update the time and/or the results of an interview. At least one must be
/// given; the other keeps its stored value.
pub async fn record_result(
    db: &DbPool,
    event: &str,
    id: i64,
    time: Option<DateTime<Utc>>,
    results: Option<&Value>,
) -> Result<()> {
    if time.is_none() && results.is_none() {
        return Err(Error::malformed(
            118,
            "Insufficient Information. Missing both timestamp and results",
        ));
    }

    let result = sqlx::query(
        r#"
        UPDATE interviews SET
            time = COALESCE(?, time),
            results = COALESCE(?, results),
            updated_at = datetime('now')
        WHERE event = ? AND id = ?
        "#,
    )
    .bind(time.map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true)))
    .bind(results.map(Value::to_string))
    .bind(event)
    .bind(id)
    .execute(db)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::not_found(12, "Interview does not exist"));
    }

    info!(event = %event, id = id, "Interview updated");
    Ok(())
}

pub async fn get_interview(db: &DbPool, event: &str, id: i64) -> Result<Interview> {
    sqlx::query_as::<_, Interview>("SELECT * FROM interviews WHERE event = ? AND id = ?")
        .bind(event)
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| Error::not_found(12, "Interview does not exist"))
}

pub async fn delete_interview(db: &DbPool, event: &str, id: i64) -> Result<()> {
    let result = sqlx::query("DELETE FROM interviews WHERE event = ? AND id = ?")
        .bind(event)
        .bind(id)
        .execute(db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::not_found(12, "Interview does not exist"));
    }

    info!(event = %event, id = id, "Interview deleted");
    Ok(())
}

/// Interviews where the account is either interviewer or interviewee
pub async fn schedule_of_user(db: &DbPool, email: &str) -> Result<Vec<Interview>> {
    let interviews = sqlx::query_as::<_, Interview>(
        "SELECT * FROM interviews WHERE interviewer = ? OR interviewee = ? ORDER BY time, event, id",
    )
    .bind(email)
    .bind(email)
    .fetch_all(db)
    .await?;
    Ok(interviews)
}

pub async fn schedule_of_event(db: &DbPool, event: &str) -> Result<Vec<Interview>> {
    ensure_event_exists(db, event).await?;
    let interviews = sqlx::query_as::<_, Interview>(
        "SELECT * FROM interviews WHERE event = ? ORDER BY id",
    )
    .bind(event)
    .fetch_all(db)
    .await?;
    Ok(interviews)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{InterviewResponse, Role};
    use crate::error::ErrorKind;
    use crate::lifecycle::{delete_event, test_support};
    use chrono::TimeZone;
    use serde_json::json;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, hour, 0, 0).unwrap()
    }

    async fn setup() -> DbPool {
        let db = test_support::pool().await;
        test_support::event(&db, "e1").await;
        test_support::approved(&db, "a@x.com", Role::Interviewer, "e1").await;
        test_support::approved(&db, "b@x.com", Role::Interviewee, "e1").await;
        db
    }

    #[tokio::test]
    async fn test_sequence_ids_increase_per_event() {
        let db = setup().await;
        test_support::event(&db, "e2").await;
        apply_and_approve(&db, "a@x.com", "e2").await;
        apply_and_approve(&db, "b@x.com", "e2").await;

        assert_eq!(schedule_interview(&db, "e1", "a@x.com", "b@x.com", at(9)).await.unwrap(), 1);
        assert_eq!(schedule_interview(&db, "e1", "a@x.com", "b@x.com", at(10)).await.unwrap(), 2);
        assert_eq!(schedule_interview(&db, "e2", "a@x.com", "b@x.com", at(9)).await.unwrap(), 1);
    }

    async fn apply_and_approve(db: &DbPool, email: &str, event: &str) {
        crate::lifecycle::apply_for_event(db, email, event).await.unwrap();
        crate::lifecycle::approve_registration(db, event, email).await.unwrap();
    }

    #[tokio::test]
    async fn test_ids_are_not_reused_after_delete() {
        let db = setup().await;
        schedule_interview(&db, "e1", "a@x.com", "b@x.com", at(9)).await.unwrap();
        let second = schedule_interview(&db, "e1", "a@x.com", "b@x.com", at(10)).await.unwrap();
        delete_interview(&db, "e1", second).await.unwrap();

        let third = schedule_interview(&db, "e1", "a@x.com", "b@x.com", at(11)).await.unwrap();
        assert_eq!(third, 3);
    }

    #[tokio::test]
    async fn test_unapproved_participant_is_not_eligible() {
        let db = setup().await;
        test_support::account(&db, "c@x.com", Role::Interviewee).await;
        crate::lifecycle::apply_for_event(&db, "c@x.com", "e1").await.unwrap();

        let err = schedule_interview(&db, "e1", "a@x.com", "c@x.com", at(9)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotEligible);

        let err = schedule_interview(&db, "e1", "c@x.com", "b@x.com", at(9)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotEligible);

        assert!(schedule_of_event(&db, "e1").await.unwrap().is_empty());
        // The failed attempts did not consume ids
        assert_eq!(schedule_interview(&db, "e1", "a@x.com", "b@x.com", at(9)).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_schedule_for_missing_event() {
        let db = setup().await;
        let err = schedule_interview(&db, "nope", "a@x.com", "b@x.com", at(9))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_partial_updates() {
        let db = setup().await;
        let id = schedule_interview(&db, "e1", "a@x.com", "b@x.com", at(9)).await.unwrap();

        record_result(&db, "e1", id, None, Some(&json!({"score": 4}))).await.unwrap();
        let interview = InterviewResponse::from(get_interview(&db, "e1", id).await.unwrap());
        assert_eq!(interview.time, "2026-03-14T09:00:00Z");
        assert_eq!(interview.results, Some(json!({"score": 4})));

        record_result(&db, "e1", id, Some(at(15)), None).await.unwrap();
        let interview = InterviewResponse::from(get_interview(&db, "e1", id).await.unwrap());
        assert_eq!(interview.time, "2026-03-14T15:00:00Z");
        assert_eq!(interview.results, Some(json!({"score": 4})));

        record_result(&db, "e1", id, Some(at(16)), Some(&json!({"score": 5})))
            .await
            .unwrap();
        let interview = InterviewResponse::from(get_interview(&db, "e1", id).await.unwrap());
        assert_eq!(interview.time, "2026-03-14T16:00:00Z");
        assert_eq!(interview.results, Some(json!({"score": 5})));
    }

    #[tokio::test]
    async fn test_record_result_needs_a_field() {
        let db = setup().await;
        let id = schedule_interview(&db, "e1", "a@x.com", "b@x.com", at(9)).await.unwrap();

        let err = record_result(&db, "e1", id, None, None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedInput);

        let err = record_result(&db, "e1", 99, Some(at(9)), None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_schedules() {
        let db = setup().await;
        test_support::approved(&db, "c@x.com", Role::Interviewee, "e1").await;
        schedule_interview(&db, "e1", "a@x.com", "b@x.com", at(10)).await.unwrap();
        schedule_interview(&db, "e1", "a@x.com", "c@x.com", at(9)).await.unwrap();

        let ids: Vec<i64> = schedule_of_user(&db, "a@x.com")
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.id)
            .collect();
        assert_eq!(ids, vec![2, 1]);
        assert_eq!(schedule_of_user(&db, "c@x.com").await.unwrap().len(), 1);
        assert_eq!(schedule_of_event(&db, "e1").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_event_deletion_cascades_to_interviews() {
        let db = setup().await;
        let id = schedule_interview(&db, "e1", "a@x.com", "b@x.com", at(9)).await.unwrap();

        delete_event(&db, "e1").await.unwrap();

        assert_eq!(get_interview(&db, "e1", id).await.unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(schedule_of_event(&db, "e1").await.unwrap_err().kind(), ErrorKind::NotFound);
        assert!(schedule_of_user(&db, "a@x.com").await.unwrap().is_empty());
    }
}
