//! In-memory user repository.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::ports::{UserPersistenceError, UserRepository};
use crate::domain::{User, UserId};

/// Users keyed by id.
#[derive(Debug, Default)]
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<UserId, User>>,
}

impl InMemoryUserRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn upsert(&self, user: &User) -> Result<(), UserPersistenceError> {
        self.users
            .write()
            .await
            .insert(user.id().clone(), user.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserPersistenceError> {
        Ok(self.users.read().await.get(id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[tokio::test]
    async fn upsert_refreshes_profile_fields() {
        let repo = InMemoryUserRepository::new();
        let id = UserId::new("sub-1").expect("valid id");
        let first = User::try_new(id.clone(), "google")
            .expect("valid user")
            .with_name(Some("Old".to_owned()));
        repo.upsert(&first).await.expect("insert");
        let second = first.clone().with_name(Some("New".to_owned()));
        repo.upsert(&second).await.expect("update");

        let stored = repo.find_by_id(&id).await.expect("lookup").expect("present");
        assert_eq!(stored.name(), Some("New"));
    }
}
