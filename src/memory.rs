//! In-process implementation of the repository traits, selected with
//! `DATABASE_URL=memory://` and used by the test suite.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::activity::{
    repo::ActivityRepo,
    repo_types::{ActivityActor, ActivityEntry, NewActivity},
};
use crate::auth::{
    repo::{CreateUserError, UserRepo},
    repo_types::{CoreFields, MonthlyCount, NewUser, Role, User, UserFilter},
};
use crate::profiles::{
    repo::ProfileRepo,
    repo_types::{Profile, ProfileUpsert},
};

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, User>,
    profiles: HashMap<Uuid, Profile>, // keyed by user_id
    activities: Vec<(NewActivity, Uuid, OffsetDateTime)>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl Inner {
    fn insert_user(&mut self, new: NewUser) -> Result<User, CreateUserError> {
        if self.users.values().any(|u| u.email == new.email) {
            return Err(CreateUserError::EmailTaken);
        }
        let user = User {
            id: Uuid::new_v4(),
            full_name: new.full_name,
            email: new.email,
            password_hash: new.password_hash,
            phone_number: new.phone_number,
            role: new.role,
            is_active: true,
            last_login: None,
            created_at: OffsetDateTime::now_utc(),
        };
        self.users.insert(user.id, user.clone());
        Ok(user)
    }
}

#[cfg(test)]
impl MemoryStore {
    /// Applies `f` to a stored user; returns false if absent.
    pub(crate) async fn update_user(&self, id: Uuid, f: impl FnOnce(&mut User) + Send) -> bool {
        match self.inner.write().await.users.get_mut(&id) {
            Some(user) => {
                f(user);
                true
            }
            None => false,
        }
    }

    pub(crate) async fn profile_count(&self) -> usize {
        self.inner.read().await.profiles.len()
    }
}

#[async_trait]
impl UserRepo for MemoryStore {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn create(&self, new: NewUser) -> Result<User, CreateUserError> {
        self.inner.write().await.insert_user(new)
    }

    async fn create_first_admin(&self, new: NewUser) -> Result<User, CreateUserError> {
        let mut inner = self.inner.write().await;
        if inner.users.values().any(|u| u.role == Role::Admin) {
            return Err(CreateUserError::AdminExists);
        }
        inner.insert_user(new)
    }

    async fn record_login(&self, id: Uuid, at: OffsetDateTime) -> anyhow::Result<()> {
        if let Some(user) = self.inner.write().await.users.get_mut(&id) {
            user.last_login = Some(at);
        }
        Ok(())
    }

    async fn update_core_fields(&self, id: Uuid, fields: &CoreFields) -> anyhow::Result<()> {
        let mut inner = self.inner.write().await;
        if inner
            .users
            .values()
            .any(|u| u.id != id && u.email == fields.email)
        {
            anyhow::bail!("email {} belongs to another user", fields.email);
        }
        if let Some(user) = inner.users.get_mut(&id) {
            user.full_name = fields.full_name.clone();
            user.email = fields.email.clone();
            if let Some(phone) = &fields.phone_number {
                user.phone_number = Some(phone.clone());
            }
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let mut inner = self.inner.write().await;
        inner.profiles.remove(&id);
        Ok(inner.users.remove(&id).is_some())
    }

    async fn list(&self) -> anyhow::Result<Vec<User>> {
        let mut users: Vec<User> = self.inner.read().await.users.values().cloned().collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(users)
    }

    async fn count_users(&self, role: Option<Role>, filter: UserFilter) -> anyhow::Result<i64> {
        let inner = self.inner.read().await;
        let n = inner
            .users
            .values()
            .filter(|u| role.map_or(true, |r| u.role == r))
            .filter(|u| match filter {
                UserFilter::All => true,
                UserFilter::CreatedSince(t) => u.created_at >= t,
                UserFilter::LoggedInSince(t) => u.last_login.is_some_and(|l| l >= t),
            })
            .count();
        Ok(n as i64)
    }

    async fn signups_by_month(
        &self,
        role: Role,
        since: OffsetDateTime,
    ) -> anyhow::Result<Vec<MonthlyCount>> {
        let inner = self.inner.read().await;
        let mut buckets: BTreeMap<(i32, i32), i64> = BTreeMap::new();
        for u in inner
            .users
            .values()
            .filter(|u| u.role == role && u.created_at >= since)
        {
            let key = (u.created_at.year(), u8::from(u.created_at.month()) as i32);
            *buckets.entry(key).or_default() += 1;
        }
        Ok(buckets
            .into_iter()
            .map(|((year, month), count)| MonthlyCount { year, month, count })
            .collect())
    }
}

#[async_trait]
impl ProfileRepo for MemoryStore {
    async fn find_by_user(&self, user_id: Uuid) -> anyhow::Result<Option<Profile>> {
        Ok(self.inner.read().await.profiles.get(&user_id).cloned())
    }

    async fn upsert(&self, p: ProfileUpsert) -> anyhow::Result<Profile> {
        let mut inner = self.inner.write().await;
        if !inner.users.contains_key(&p.user_id) {
            anyhow::bail!("profile owner {} does not exist", p.user_id);
        }
        let now = OffsetDateTime::now_utc();
        let profile = match inner.profiles.remove(&p.user_id) {
            Some(existing) => Profile {
                personal_info: p.personal_info,
                documents: p.documents.unwrap_or(existing.documents),
                address: p.address.unwrap_or(existing.address),
                about: p.about.or(existing.about),
                files: p.files.unwrap_or(existing.files),
                updated_at: now,
                ..existing
            },
            None => Profile {
                id: Uuid::new_v4(),
                user_id: p.user_id,
                personal_info: p.personal_info,
                documents: p.documents.unwrap_or_default(),
                address: p.address.unwrap_or_default(),
                about: p.about,
                files: p.files.unwrap_or_default(),
                created_at: now,
                updated_at: now,
            },
        };
        inner.profiles.insert(profile.user_id, profile.clone());
        Ok(profile)
    }

    async fn delete_by_user(&self, user_id: Uuid) -> anyhow::Result<bool> {
        Ok(self.inner.write().await.profiles.remove(&user_id).is_some())
    }
}

#[async_trait]
impl ActivityRepo for MemoryStore {
    async fn append(&self, entry: NewActivity) -> anyhow::Result<()> {
        self.inner
            .write()
            .await
            .activities
            .push((entry, Uuid::new_v4(), OffsetDateTime::now_utc()));
        Ok(())
    }

    async fn recent(&self, limit: i64) -> anyhow::Result<Vec<ActivityEntry>> {
        let inner = self.inner.read().await;
        let entries = inner
            .activities
            .iter()
            .rev()
            .take(limit.max(0) as usize)
            .map(|(entry, id, at)| ActivityEntry {
                id: *id,
                user: entry
                    .user_id
                    .and_then(|uid| inner.users.get(&uid))
                    .map(|u| ActivityActor {
                        id: u.id,
                        name: u.full_name.clone(),
                        email: u.email.clone(),
                    }),
                action: entry.action.clone(),
                category: entry.category,
                timestamp: *at,
            })
            .collect();
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profiles::repo_types::{Documents, PersonalInfo};
    use time::Duration;

    fn new_user(email: &str, role: Role) -> NewUser {
        NewUser {
            full_name: "Ann".into(),
            email: email.into(),
            password_hash: "hash".into(),
            phone_number: None,
            role,
        }
    }

    fn upsert(user_id: Uuid, name: &str, documents: Option<Documents>) -> ProfileUpsert {
        ProfileUpsert {
            user_id,
            personal_info: PersonalInfo {
                name: name.into(),
                email: "ann@x.com".into(),
                ..Default::default()
            },
            documents,
            address: None,
            about: None,
            files: None,
        }
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let store = MemoryStore::default();
        store.create(new_user("ann@x.com", Role::User)).await.unwrap();
        let err = store.create(new_user("ann@x.com", Role::User)).await.unwrap_err();
        assert!(matches!(err, CreateUserError::EmailTaken));
        assert_eq!(store.count_users(None, UserFilter::All).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn profile_upsert_keeps_omitted_blocks() {
        let store = MemoryStore::default();
        let user = store.create(new_user("ann@x.com", Role::User)).await.unwrap();
        let docs = Documents {
            aadhaar: Some("1234".into()),
            pan: None,
        };
        let first = store.upsert(upsert(user.id, "Ann", Some(docs.clone()))).await.unwrap();
        let second = store.upsert(upsert(user.id, "Ann B", None)).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.personal_info.name, "Ann B");
        assert_eq!(second.documents, docs);
        assert_eq!(store.profile_count().await, 1);
    }

    #[tokio::test]
    async fn counts_respect_role_and_window() {
        let store = MemoryStore::default();
        let old = store.create(new_user("old@x.com", Role::User)).await.unwrap();
        store.create(new_user("new@x.com", Role::User)).await.unwrap();
        store.create(new_user("boss@x.com", Role::Admin)).await.unwrap();
        let now = OffsetDateTime::now_utc();
        store
            .update_user(old.id, |u| u.created_at = now - Duration::days(90))
            .await;

        let month_ago = now - Duration::days(30);
        assert_eq!(store.count_users(Some(Role::User), UserFilter::All).await.unwrap(), 2);
        assert_eq!(
            store
                .count_users(Some(Role::User), UserFilter::CreatedSince(month_ago))
                .await
                .unwrap(),
            1
        );
        assert_eq!(
            store
                .count_users(Some(Role::User), UserFilter::LoggedInSince(month_ago))
                .await
                .unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn recent_activity_is_newest_first() {
        let store = MemoryStore::default();
        let user = store.create(new_user("ann@x.com", Role::User)).await.unwrap();
        for action in ["first", "second", "third"] {
            store
                .append(NewActivity {
                    user_id: Some(user.id),
                    action: action.into(),
                    category: crate::activity::repo_types::ActivityCategory::Auth,
                })
                .await
                .unwrap();
        }
        let recent = store.recent(2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].action, "third");
        assert_eq!(recent[1].action, "second");
        assert_eq!(recent[0].user.as_ref().map(|a| a.id), Some(user.id));
    }

    #[tokio::test]
    async fn only_one_first_admin() {
        let store = MemoryStore::default();
        store.create(new_user("ann@x.com", Role::User)).await.unwrap();
        let root = store
            .create_first_admin(new_user("root@x.com", Role::Admin))
            .await
            .unwrap();
        assert_eq!(root.role, Role::Admin);
        let err = store
            .create_first_admin(new_user("two@x.com", Role::Admin))
            .await
            .unwrap_err();
        assert!(matches!(err, CreateUserError::AdminExists));
        assert!(store.find_by_email("two@x.com").await.unwrap().is_none());
    }
}
