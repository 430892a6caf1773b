use crate::domain_model::*;
use crate::domain_port::*;
use dashmap::DashMap;
use std::sync::Mutex;

#[derive(Default)]
pub struct MemoryUserRepo {
    users: DashMap<UserId, User>,
    // held while checking and writing unique fields
    unique_guard: Mutex<()>,
}

impl MemoryUserRepo {
    pub fn new() -> Self {
        Self::default()
    }

    fn conflict(&self, email: &str, phone: &str, exclude: Option<UserId>) -> Option<UniqueField> {
        let others = || self.users.iter().filter(|u| Some(u.id) != exclude);
        if others().any(|u| u.email == email) {
            return Some(UniqueField::Email);
        }
        if others().any(|u| u.phone == phone) {
            return Some(UniqueField::Phone);
        }
        None
    }

    fn lock_unique(&self) -> Result<std::sync::MutexGuard<'_, ()>, RepoError> {
        self.unique_guard
            .lock()
            .map_err(|_| RepoError::Store("user store lock poisoned".to_string()))
    }
}

#[async_trait::async_trait]
impl UserRepo for MemoryUserRepo {
    async fn create(&self, user: &User) -> Result<(), RepoError> {
        let _guard = self.lock_unique()?;
        if let Some(field) = self.conflict(&user.email, &user.phone, None) {
            return Err(RepoError::Duplicate(field));
        }
        self.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn get_by_id(&self, user_id: UserId) -> Result<Option<User>, RepoError> {
        Ok(self.users.get(&user_id).map(|u| u.value().clone()))
    }

    async fn get_by_identifier(&self, identifier: &str) -> Result<Option<User>, RepoError> {
        Ok(self
            .users
            .iter()
            .find(|u| u.email == identifier || u.phone == identifier)
            .map(|u| u.value().clone()))
    }

    async fn find_conflict(
        &self,
        email: &str,
        phone: &str,
        exclude: Option<UserId>,
    ) -> Result<Option<UniqueField>, RepoError> {
        Ok(self.conflict(email, phone, exclude))
    }

    async fn update_profile(&self, user: &User) -> Result<(), RepoError> {
        let _guard = self.lock_unique()?;
        if let Some(field) = self.conflict(&user.email, &user.phone, Some(user.id)) {
            return Err(RepoError::Duplicate(field));
        }
        let mut stored = self
            .users
            .get_mut(&user.id)
            .ok_or_else(|| RepoError::Store(format!("user {} vanished", user.id)))?;
        let refresh_token_hash = stored.refresh_token_hash.take();
        *stored = User {
            refresh_token_hash,
            ..user.clone()
        };
        Ok(())
    }

    async fn id_exists(&self, user_id: UserId) -> Result<bool, RepoError> {
        Ok(self.users.contains_key(&user_id))
    }

    async fn get_authors(&self, ids: &[UserId]) -> Result<Vec<Author>, RepoError> {
        Ok(ids
            .iter()
            .filter_map(|id| self.users.get(id).map(|u| u.to_author()))
            .collect())
    }

    async fn set_refresh_token(
        &self,
        user_id: UserId,
        token_hash: Option<&str>,
    ) -> Result<bool, RepoError> {
        match self.users.get_mut(&user_id) {
            Some(mut user) => {
                user.refresh_token_hash = token_hash.map(str::to_string);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn replace_refresh_token(
        &self,
        user_id: UserId,
        expected_hash: &str,
        new_hash: &str,
    ) -> Result<bool, RepoError> {
        // the entry guard makes compare and write one step
        match self.users.get_mut(&user_id) {
            Some(mut user) if user.refresh_token_hash.as_deref() == Some(expected_hash) => {
                user.refresh_token_hash = Some(new_hash.to_string());
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
