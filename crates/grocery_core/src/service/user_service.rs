//! Profile persistence across the cache and the `users` collection.
//!
//! # Invariants
//! - Profiles are keyed by normalized email in both places.
//! - The cached copy is written first; the mirror is best-effort.
//! - Only explicit profile saves reach the mirror; sign-in refreshes the
//!   cache alone.
//! - Passwords are cleared before a profile is cached or mirrored.

use crate::db::{CacheTable, LocalCache};
use crate::model::now_epoch_ms;
use crate::model::user::{normalize_email, User, UserRole};
use crate::remote::mirror::UserMirror;
use crate::repo::user_repo::{SqliteUserRepository, UserRepository};
use crate::repo::RepoResult;
use crate::service::{DualWrite, MirrorState, ServiceResult};
use log::info;
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Clone)]
pub struct UserService {
    cache: Arc<LocalCache>,
    mirror: Option<UserMirror>,
}

impl UserService {
    pub fn new(cache: Arc<LocalCache>, mirror: Option<UserMirror>) -> Self {
        Self { cache, mirror }
    }

    /// Validates and stores the profile locally, then mirrors it.
    pub async fn save_profile(&self, user: &User) -> ServiceResult<DualWrite<User>> {
        let mut stored = user.clone();
        stored.email = normalize_email(&stored.email);
        stored.password.clear();
        stored.created_at = stored.created_at.or_else(|| Some(now_epoch_ms()));

        self.cache.write(CacheTable::Users, |conn| {
            SqliteUserRepository::new(conn).upsert(&stored)
        })?;

        let mirror = match &self.mirror {
            None => MirrorState::Skipped,
            Some(mirror) => match mirror.save(&stored).await {
                Ok(()) => MirrorState::Mirrored,
                Err(err) => MirrorState::Failed(err.to_string()),
            },
        };
        info!(
            "event=profile_save module=service status=ok mirrored={}",
            mirror == MirrorState::Mirrored
        );
        Ok(DualWrite {
            value: stored,
            mirror,
        })
    }

    /// Caches the profile returned at sign-in without touching the mirror.
    ///
    /// A missing `created_at` keeps the cached value instead of being stamped.
    pub fn cache_signed_in(&self, user: &User) -> RepoResult<User> {
        let mut stored = user.clone();
        stored.email = normalize_email(&stored.email);
        stored.password.clear();

        self.cache.write(CacheTable::Users, |conn| {
            let repo = SqliteUserRepository::new(conn);
            if stored.created_at.is_none() {
                stored.created_at = repo.get(&stored.email)?.and_then(|cached| cached.created_at);
            }
            repo.upsert(&stored)?;
            Ok(stored)
        })
    }

    pub fn get_local(&self, email: &str) -> RepoResult<Option<User>> {
        self.cache
            .read(|conn| SqliteUserRepository::new(conn).get(email))
    }

    pub fn list_local(&self) -> RepoResult<Vec<User>> {
        self.cache
            .read(|conn| SqliteUserRepository::new(conn).list_all())
    }

    /// Admin role change; local only.
    pub fn update_role(&self, email: &str, role: UserRole) -> RepoResult<()> {
        self.cache.write(CacheTable::Users, |conn| {
            SqliteUserRepository::new(conn).update_role(email, role)
        })
    }

    /// Reads the mirrored profile and caches it when present.
    pub async fn fetch_remote(&self, email: &str) -> ServiceResult<Option<User>> {
        let Some(mirror) = &self.mirror else {
            return Ok(None);
        };
        let Some(user) = mirror.get(email).await? else {
            return Ok(None);
        };
        self.cache.write(CacheTable::Users, |conn| {
            SqliteUserRepository::new(conn).upsert(&user)
        })?;
        Ok(Some(user))
    }

    /// Live feed of the mirrored profile; `None` without a mirror.
    pub fn listen_remote(&self, email: &str) -> Option<watch::Receiver<Option<User>>> {
        self.mirror.as_ref().map(|mirror| mirror.listen(email))
    }
}
