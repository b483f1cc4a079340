//! Storage operations and the registration–approval lifecycle.
//!
//! Every function takes the pool explicitly. Multi-step mutations
//! (`approve_registration`, `schedule_interview`) run in a single transaction
//! that opens with a write and is committed before returning; any early
//! return drops the transaction, which rolls it back. `apply_for_event` is a
//! single guarded insert.
//!
//! An (account, event) pair moves `none -> pending -> approved` and never
//! back. Pending and approved are mutually exclusive.

mod accounts;
mod enrollment;
mod events;
mod interviews;

pub use accounts::*;
pub use enrollment::*;
pub use events::*;
pub use interviews::*;

#[cfg(test)]
pub(crate) mod test_support {
    use crate::db::{self, DbPool, Role};
    use serde_json::{json, Map};

    pub async fn pool() -> DbPool {
        db::init_memory().await.unwrap()
    }

    /// Insert an account with a placeholder hash
    pub async fn account(db: &DbPool, email: &str, role: Role) {
        super::create_account(db, email, "not-a-real-hash", role, &Map::new())
            .await
            .unwrap();
    }

    pub async fn event(db: &DbPool, name: &str) {
        super::create_event(db, name, &json!({}), None).await.unwrap();
    }

    /// Account that has been applied and approved for `event`
    pub async fn approved(db: &DbPool, email: &str, role: Role, event: &str) {
        account(db, email, role).await;
        super::apply_for_event(db, email, event).await.unwrap();
        super::approve_registration(db, event, email).await.unwrap();
    }
}
