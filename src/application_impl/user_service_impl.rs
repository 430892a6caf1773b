use super::validation;
use crate::application_port::{CredentialHasher, ProfileUpdate, UserError, UserService};
use crate::domain_model::*;
use crate::domain_port::{ImageStore, UserRepo};
use crate::logger::*;
use chrono::Utc;
use std::sync::Arc;

pub struct RealUserService {
    user_repo: Arc<dyn UserRepo>,
    credential_hasher: Arc<dyn CredentialHasher>,
    image_store: Arc<dyn ImageStore>,
}

impl RealUserService {
    pub fn new(
        user_repo: Arc<dyn UserRepo>,
        credential_hasher: Arc<dyn CredentialHasher>,
        image_store: Arc<dyn ImageStore>,
    ) -> RealUserService {
        RealUserService {
            user_repo,
            credential_hasher,
            image_store,
        }
    }

    /// Apply every field of `update` except the image.
    async fn apply(&self, user: &mut User, update: &ProfileUpdate) -> Result<(), UserError> {
        let invalid = UserError::Validation;
        if let Some(v) = non_blank(&update.first_name) {
            user.first_name = validation::required("First name", v).map_err(invalid)?;
        }
        if let Some(v) = non_blank(&update.last_name) {
            user.last_name = validation::required("Last name", v).map_err(invalid)?;
        }
        if let Some(v) = non_blank(&update.email) {
            user.email = validation::normalize_email(v).map_err(invalid)?;
        }
        if let Some(v) = non_blank(&update.phone) {
            user.phone = validation::normalize_phone(v).map_err(invalid)?;
        }
        if let Some(raw) = non_blank(&update.preferences) {
            match validation::parse_preferences(raw) {
                Ok(preferences) => user.preferences = preferences,
                Err(e) => debug!(user_id = %user.id, "ignoring preferences: {}", e),
            }
        }

        if let (Some(current), Some(new)) = (
            non_blank(&update.current_password),
            non_blank(&update.new_password),
        ) {
            let ok = self
                .credential_hasher
                .verify_password(current, &user.password_hash)
                .await?;
            if !ok {
                return Err(UserError::IncorrectPassword);
            }
            validation::check_password(new).map_err(invalid)?;
            user.password_hash = self.credential_hasher.hash_password(new).await?;
        }

        match self
            .user_repo
            .find_conflict(&user.email, &user.phone, Some(user.id))
            .await?
        {
            Some(UniqueField::Email) => Err(UserError::EmailTaken),
            Some(UniqueField::Phone) => Err(UserError::PhoneTaken),
            None => Ok(()),
        }
    }

    async fn discard_image(&self, path: &str) {
        if let Err(e) = self.image_store.remove(path).await {
            warn!(path, "could not remove image: {}", e);
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

#[async_trait::async_trait]
impl UserService for RealUserService {
    async fn get_profile(&self, user_id: UserId) -> Result<PublicUser, UserError> {
        self.user_repo
            .get_by_id(user_id)
            .await?
            .map(|u| u.to_public())
            .ok_or(UserError::NotFound)
    }

    async fn update_profile(
        &self,
        user_id: UserId,
        update: ProfileUpdate,
    ) -> Result<PublicUser, UserError> {
        let mut user = self
            .user_repo
            .get_by_id(user_id)
            .await?
            .ok_or(UserError::NotFound)?;

        self.apply(&mut user, &update).await?;

        let new_image = match &update.image {
            Some(upload) => Some(self.image_store.save(upload).await?),
            None => None,
        };
        let old_image = match &new_image {
            Some(path) => user.image.replace(path.clone()),
            None => None,
        };
        user.updated_at = Utc::now();

        if let Err(e) = self.user_repo.update_profile(&user).await {
            if let Some(path) = &new_image {
                self.discard_image(path).await;
            }
            return Err(e.into());
        }
        if let Some(path) = &old_image {
            self.discard_image(path).await;
        }

        info!(user_id = %user_id, "profile updated");
        Ok(user.to_public())
    }
}
