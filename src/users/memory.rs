use std::collections::BTreeMap;

use async_trait::async_trait;
use time::{Duration, OffsetDateTime};
use tokio::sync::Mutex;

use crate::pagination::{Page, PageRequest};
use crate::users::repo_types::{NewUser, User, UserChanges};
use crate::users::store::{StoreError, UserStore};

#[derive(Default)]
struct Inner {
    next_id: i64,
    users: BTreeMap<i64, User>,
}

impl Inner {
    fn email_owner(&self, email: &str) -> Option<i64> {
        self.users
            .values()
            .find(|u| u.email == email)
            .map(|u| u.id)
    }
}

/// Process-local store used by the `testing` profile and the test suite.
/// One mutex covers every operation, so each call sees a consistent
/// snapshot and racing writes on the same email serialize.
#[derive(Default)]
pub struct MemoryUserStore {
    inner: Mutex<Inner>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create(&self, new_user: NewUser) -> Result<User, StoreError> {
        let mut inner = self.inner.lock().await;
        if inner.email_owner(&new_user.email).is_some() {
            return Err(StoreError::EmailTaken);
        }

        inner.next_id += 1;
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: inner.next_id,
            first_name: new_user.first_name,
            last_name: new_user.last_name,
            email: new_user.email,
            phone_number: new_user.phone_number,
            created_at: now,
            updated_at: now,
        };
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get(&self, id: i64) -> Result<User, StoreError> {
        let inner = self.inner.lock().await;
        inner.users.get(&id).cloned().ok_or(StoreError::NotFound(id))
    }

    async fn update(&self, id: i64, changes: UserChanges) -> Result<User, StoreError> {
        let mut inner = self.inner.lock().await;
        let mut user = inner
            .users
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))?;
        if changes.is_empty() {
            return Ok(user);
        }

        if let Some(email) = changes.email.as_deref() {
            if inner.email_owner(email).is_some_and(|owner| owner != id) {
                return Err(StoreError::EmailTaken);
            }
        }

        // Work on a copy so a rejected write leaves the stored row untouched.
        changes.apply(&mut user);
        user.updated_at =
            OffsetDateTime::now_utc().max(user.updated_at + Duration::microseconds(1));
        inner.users.insert(id, user.clone());
        Ok(user)
    }

    async fn delete(&self, id: i64) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        inner
            .users
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound(id))
    }

    async fn list(&self, req: PageRequest) -> Result<Page<User>, StoreError> {
        let inner = self.inner.lock().await;
        let offset = usize::try_from(req.offset()).unwrap_or(usize::MAX);
        let limit = usize::try_from(req.limit()).unwrap_or(0);
        let items = inner
            .users
            .values()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect();
        Ok(Page::new(items, inner.users.len() as i64, req))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            first_name: "Ann".into(),
            last_name: "Lee".into(),
            email: email.into(),
            phone_number: None,
        }
    }

    #[tokio::test]
    async fn create_assigns_fresh_ids() {
        let store = MemoryUserStore::new();
        let mut seen = HashSet::new();
        for i in 0..5 {
            let user = store.create(new_user(&format!("u{i}@x.com"))).await.unwrap();
            assert!(seen.insert(user.id), "id {} issued twice", user.id);
            assert_eq!(user.created_at, user.updated_at);
        }
    }

    #[tokio::test]
    async fn ids_are_not_reused_after_delete() {
        let store = MemoryUserStore::new();
        let first = store.create(new_user("a@x.com")).await.unwrap();
        store.delete(first.id).await.unwrap();
        let second = store.create(new_user("a@x.com")).await.unwrap();
        assert!(second.id > first.id);
    }

    #[tokio::test]
    async fn duplicate_email_conflicts_and_keeps_one_row() {
        let store = MemoryUserStore::new();
        store.create(new_user("ann@x.com")).await.unwrap();
        let err = store.create(new_user("ann@x.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::EmailTaken));

        let page = store.list(PageRequest::new(1, 100)).await.unwrap();
        let count = page.items.iter().filter(|u| u.email == "ann@x.com").count();
        assert_eq!(count, 1);
        assert_eq!(page.total, 1);
    }

    #[tokio::test]
    async fn concurrent_creates_on_same_email_admit_one() {
        let store = std::sync::Arc::new(MemoryUserStore::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.create(new_user("race@x.com")).await })
            })
            .collect();

        let mut ok = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => ok += 1,
                Err(StoreError::EmailTaken) => {}
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!(ok, 1);
    }

    #[tokio::test]
    async fn phone_only_update_touches_nothing_else() {
        let store = MemoryUserStore::new();
        let before = store.create(new_user("ann@x.com")).await.unwrap();

        let after = store
            .update(
                before.id,
                UserChanges {
                    phone_number: Some(Some("555-0100".into())),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(after.phone_number.as_deref(), Some("555-0100"));
        assert_eq!(after.first_name, before.first_name);
        assert_eq!(after.last_name, before.last_name);
        assert_eq!(after.email, before.email);
        assert_eq!(after.created_at, before.created_at);
        assert!(after.updated_at > before.updated_at);
        assert_eq!(store.get(before.id).await.unwrap(), after);
    }

    #[tokio::test]
    async fn null_phone_clears_it() {
        let store = MemoryUserStore::new();
        let mut input = new_user("ann@x.com");
        input.phone_number = Some("555".into());
        let user = store.create(input).await.unwrap();

        let cleared = store
            .update(
                user.id,
                UserChanges {
                    phone_number: Some(None),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(cleared.phone_number, None);
    }

    #[tokio::test]
    async fn update_to_other_users_email_conflicts_without_partial_write() {
        let store = MemoryUserStore::new();
        store.create(new_user("taken@x.com")).await.unwrap();
        let user = store.create(new_user("mine@x.com")).await.unwrap();

        let err = store
            .update(
                user.id,
                UserChanges {
                    first_name: Some("Changed".into()),
                    email: Some("taken@x.com".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::EmailTaken));
        assert_eq!(store.get(user.id).await.unwrap(), user);
    }

    #[tokio::test]
    async fn update_to_own_email_is_not_a_conflict() {
        let store = MemoryUserStore::new();
        let user = store.create(new_user("mine@x.com")).await.unwrap();
        let updated = store
            .update(
                user.id,
                UserChanges {
                    email: Some("mine@x.com".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.email, "mine@x.com");
    }

    #[tokio::test]
    async fn empty_update_leaves_record_alone() {
        let store = MemoryUserStore::new();
        let user = store.create(new_user("ann@x.com")).await.unwrap();
        let same = store.update(user.id, UserChanges::default()).await.unwrap();
        assert_eq!(same, user);
    }

    #[tokio::test]
    async fn missing_ids_are_not_found() {
        let store = MemoryUserStore::new();
        assert!(matches!(store.get(999).await, Err(StoreError::NotFound(999))));
        assert!(matches!(
            store.update(999, UserChanges::default()).await,
            Err(StoreError::NotFound(999))
        ));
        assert!(matches!(store.delete(999).await, Err(StoreError::NotFound(999))));
    }

    #[tokio::test]
    async fn delete_then_get_is_not_found() {
        let store = MemoryUserStore::new();
        let user = store.create(new_user("ann@x.com")).await.unwrap();
        store.delete(user.id).await.unwrap();
        assert!(matches!(store.get(user.id).await, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn list_pages_agree_with_total() {
        let store = MemoryUserStore::new();
        for i in 0..23 {
            store.create(new_user(&format!("u{i}@x.com"))).await.unwrap();
        }

        for per_page in 1..=25 {
            let mut collected = Vec::new();
            for page in 1..=30 {
                let result = store.list(PageRequest::new(page, per_page)).await.unwrap();
                assert_eq!(result.total, 23);
                assert_eq!(result.pages, (23 + per_page - 1) / per_page);
                assert!(result.items.len() as i64 <= per_page);
                if page > result.pages {
                    assert!(result.items.is_empty());
                }
                collected.extend(result.items.into_iter().map(|u| u.id));
            }
            let mut sorted = collected.clone();
            sorted.sort_unstable();
            assert_eq!(collected, sorted, "pages must follow id order");
            assert_eq!(collected.len(), 23);
        }
    }

    #[tokio::test]
    async fn empty_store_lists_zero_pages() {
        let store = MemoryUserStore::new();
        let page = store.list(PageRequest::default()).await.unwrap();
        assert!(page.items.is_empty());
        assert_eq!((page.total, page.page, page.per_page, page.pages), (0, 1, 10, 0));
    }
}
