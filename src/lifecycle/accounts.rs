//! Account storage and credential checks.

use serde_json::{Map, Value};
use tracing::info;

use crate::crypto::{hash_password, verify_password};
use crate::db::{Account, DbPool, Role};
use crate::error::{classify_write, Error, Result};

/// Insert a new account. `password_hash` must already be hashed.
pub async fn create_account(
    db: &DbPool,
    email: &str,
    password_hash: &str,
    role: Role,
    details: &Map<String, Value>,
) -> Result<()> {
    let details = serde_json::to_string(details).unwrap_or_else(|_| "{}".to_string());

    sqlx::query("INSERT INTO accounts (email, password_hash, role, details) VALUES (?, ?, ?, ?)")
        .bind(email)
        .bind(password_hash)
        .bind(role.as_str())
        .bind(&details)
        .execute(db)
        .await
        .map_err(|e| classify_write(e, (4, "Account already exists"), (5, "Account does not exist")))?;

    info!(email = %email, role = %role, "Account created");
    Ok(())
}

pub async fn find_account(db: &DbPool, email: &str) -> Result<Option<Account>> {
    let account = sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE email = ?")
        .bind(email)
        .fetch_optional(db)
        .await?;
    Ok(account)
}

pub async fn get_account(db: &DbPool, email: &str) -> Result<Account> {
    find_account(db, email)
        .await?
        .ok_or_else(|| Error::not_found(5, "Account does not exist"))
}

/// Check a credential pair. Returns `None` for an unknown account or a wrong
/// password, without telling the two apart.
pub async fn authenticate(db: &DbPool, email: &str, password: &str) -> Result<Option<Account>> {
    let Some(account) = find_account(db, email).await? else {
        return Ok(None);
    };

    if verify_password(password, &account.password_hash) {
        Ok(Some(account))
    } else {
        Ok(None)
    }
}

/// Replace the free-form details of an account
pub async fn update_account_details(
    db: &DbPool,
    email: &str,
    details: &Map<String, Value>,
) -> Result<()> {
    let details = serde_json::to_string(details).unwrap_or_else(|_| "{}".to_string());

    let result = sqlx::query(
        "UPDATE accounts SET details = ?, updated_at = datetime('now') WHERE email = ?",
    )
    .bind(&details)
    .bind(email)
    .execute(db)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::not_found(10, "Unable to update"));
    }
    Ok(())
}

pub async fn set_password(db: &DbPool, email: &str, password_hash: &str) -> Result<()> {
    let result = sqlx::query(
        "UPDATE accounts SET password_hash = ?, updated_at = datetime('now') WHERE email = ?",
    )
    .bind(password_hash)
    .bind(email)
    .execute(db)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::not_found(5, "Account does not exist"));
    }
    Ok(())
}

/// Create the bootstrap admin account if no account with that email exists.
/// Returns true when an account was created.
pub async fn ensure_admin_account(db: &DbPool, email: &str, password: &str) -> Result<bool> {
    if find_account(db, email).await?.is_some() {
        return Ok(false);
    }

    let hash = hash_password(password)
        .map_err(|e| Error::Credential(14, format!("Failed to hash password: {}", e)))?;
    create_account(db, email, &hash, Role::Admin, &Map::new()).await?;

    info!(email = %email, "Created bootstrap admin account");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::lifecycle::test_support;
    use serde_json::json;

    #[tokio::test]
    async fn test_duplicate_account_conflicts() {
        let db = test_support::pool().await;
        test_support::account(&db, "a@x.com", Role::Interviewer).await;

        let err = create_account(&db, "a@x.com", "h", Role::Interviewee, &Map::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(err.to_string(), "004: Account already exists");
    }

    #[tokio::test]
    async fn test_get_missing_account() {
        let db = test_support::pool().await;
        let err = get_account(&db, "nobody@x.com").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_authenticate_checks_hash() {
        let db = test_support::pool().await;
        let hash = hash_password("hunter22!").unwrap();
        create_account(&db, "a@x.com", &hash, Role::Interviewee, &Map::new())
            .await
            .unwrap();

        let account = authenticate(&db, "a@x.com", "hunter22!").await.unwrap();
        assert_eq!(account.unwrap().role_enum(), Role::Interviewee);

        assert!(authenticate(&db, "a@x.com", "wrong").await.unwrap().is_none());
        assert!(authenticate(&db, "b@x.com", "hunter22!").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_details_replace_and_role_is_kept() {
        let db = test_support::pool().await;
        test_support::account(&db, "a@x.com", Role::Interviewer).await;

        let mut details = Map::new();
        details.insert("name".to_string(), json!("Ada"));
        update_account_details(&db, "a@x.com", &details).await.unwrap();

        let account = get_account(&db, "a@x.com").await.unwrap();
        assert_eq!(account.details.as_deref(), Some(r#"{"name":"Ada"}"#));
        assert_eq!(account.role_enum(), Role::Interviewer);

        let err = update_account_details(&db, "nobody@x.com", &details)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_ensure_admin_account_is_idempotent() {
        let db = test_support::pool().await;
        assert!(ensure_admin_account(&db, "root@x.com", "s3cret-pass").await.unwrap());
        assert!(!ensure_admin_account(&db, "root@x.com", "other").await.unwrap());

        let account = authenticate(&db, "root@x.com", "s3cret-pass")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(account.role_enum(), Role::Admin);
    }
}
