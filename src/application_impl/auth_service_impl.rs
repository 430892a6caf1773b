use super::validation;
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use crate::logger::*;
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// Digest under which a refresh token is stored in the user directory.
pub fn refresh_token_digest(token: &RefreshToken) -> String {
    hex::encode(Sha256::digest(token.0.as_bytes()))
}

/// Issues, verifies, rotates and revokes sessions. Holds no session state of
/// its own: the live refresh token is a field of the user record.
pub struct RealAuthService {
    user_repo: Arc<dyn UserRepo>,
    credential_hasher: Arc<dyn CredentialHasher>,
    token_codec: Arc<dyn TokenCodec>,
    image_store: Arc<dyn ImageStore>,
}

impl RealAuthService {
    pub fn new(
        user_repo: Arc<dyn UserRepo>,
        credential_hasher: Arc<dyn CredentialHasher>,
        token_codec: Arc<dyn TokenCodec>,
        image_store: Arc<dyn ImageStore>,
    ) -> Self {
        Self {
            user_repo,
            credential_hasher,
            token_codec,
            image_store,
        }
    }

    fn issue_pair(&self, user_id: UserId) -> Result<AuthTokens, AuthError> {
        let (access_token, access_exp) = self.token_codec.issue_access_token(user_id)?;
        let (refresh_token, refresh_exp) = self.token_codec.issue_refresh_token(user_id)?;
        Ok(AuthTokens {
            access_token,
            refresh_token,
            access_token_expires_at: access_exp,
            refresh_token_expires_at: refresh_exp,
        })
    }

    /// Mint a pair and make its refresh token the user's only live one.
    async fn open_session(&self, user_id: UserId) -> Result<AuthTokens, AuthError> {
        let tokens = self.issue_pair(user_id)?;
        let digest = refresh_token_digest(&tokens.refresh_token);
        if !self
            .user_repo
            .set_refresh_token(user_id, Some(&digest))
            .await?
        {
            return Err(AuthError::UserNotFound);
        }
        Ok(tokens)
    }

    async fn validate_registration(&self, request: &RegisterInput) -> Result<User, AuthError> {
        let invalid = AuthError::Validation;
        let first_name = validation::required("First name", &request.first_name).map_err(invalid)?;
        let last_name = validation::required("Last name", &request.last_name).map_err(invalid)?;
        let email = validation::normalize_email(&request.email).map_err(invalid)?;
        let phone = validation::normalize_phone(&request.phone).map_err(invalid)?;
        validation::check_password(&request.password).map_err(invalid)?;
        let date_of_birth =
            validation::parse_date_of_birth(&request.date_of_birth).map_err(invalid)?;
        let preferences = match request.preferences.as_deref() {
            Some(raw) if !raw.trim().is_empty() => {
                validation::parse_preferences(raw).map_err(invalid)?
            }
            _ => Vec::new(),
        };

        match self.user_repo.find_conflict(&email, &phone, None).await? {
            Some(UniqueField::Email) => return Err(AuthError::EmailTaken),
            Some(UniqueField::Phone) => return Err(AuthError::PhoneTaken),
            None => {}
        }

        let password_hash = self
            .credential_hasher
            .hash_password(&request.password)
            .await?;
        let now = Utc::now();
        Ok(User {
            id: UserId::new_v4(),
            first_name,
            last_name,
            email,
            phone,
            password_hash,
            image: None,
            date_of_birth,
            preferences,
            created_at: now,
            updated_at: now,
            refresh_token_hash: None,
        })
    }

    async fn discard_image(&self, path: &str) {
        if let Err(e) = self.image_store.remove(path).await {
            warn!(path, "could not remove uploaded image: {}", e);
        }
    }
}

#[async_trait::async_trait]
impl AuthService for RealAuthService {
    async fn register(&self, request: RegisterInput) -> Result<LoginResult, AuthError> {
        let mut user = self.validate_registration(&request).await?;

        let image = match &request.image {
            Some(upload) => Some(self.image_store.save(upload).await?),
            None => None,
        };
        user.image = image.clone();

        if let Err(e) = self.user_repo.create(&user).await {
            if let Some(path) = &image {
                self.discard_image(path).await;
            }
            return Err(e.into());
        }

        // the account is kept either way; without a session the client logs in
        let tokens = match self.open_session(user.id).await {
            Ok(tokens) => tokens,
            Err(e) => {
                error!(user_id = %user.id, "user registered but no session opened: {}", e);
                return Err(e);
            }
        };
        info!(user_id = %user.id, "user registered");
        Ok(LoginResult {
            user: user.to_public(),
            tokens,
        })
    }

    async fn login(&self, request: LoginInput) -> Result<LoginResult, AuthError> {
        let LoginInput {
            identifier,
            password,
        } = request;
        let identifier = identifier.trim();
        let identifier = if identifier.contains('@') {
            identifier.to_lowercase()
        } else {
            identifier.to_string()
        };

        let user = self
            .user_repo
            .get_by_identifier(&identifier)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let ok = self
            .credential_hasher
            .verify_password(&password, &user.password_hash)
            .await?;
        if !ok {
            return Err(AuthError::InvalidCredentials);
        }

        let tokens = self.open_session(user.id).await?;
        info!(user_id = %user.id, "user logged in");
        Ok(LoginResult {
            user: user.to_public(),
            tokens,
        })
    }

    async fn verify_token(&self, token: &str) -> Result<UserId, AuthError> {
        let verify_result = self
            .token_codec
            .verify_access_token(&AccessToken(token.to_string()))
            .inspect_err(|e| debug!("access token rejected: {}", e))?;

        if !self.user_repo.id_exists(verify_result.user_id).await? {
            return Err(AuthError::UserNotFound);
        }

        Ok(verify_result.user_id)
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<AuthTokens, AuthError> {
        let presented = RefreshToken(refresh_token.to_string());
        let verify_result = self
            .token_codec
            .verify_refresh_token(&presented)
            .inspect_err(|e| debug!("refresh token rejected: {}", e))?;
        let user_id = verify_result.user_id;

        // Rotation: the swap only lands if the presented token is still the
        // live one, so a replayed or revoked token cannot mint a new pair.
        let tokens = self.issue_pair(user_id)?;
        let swapped = self
            .user_repo
            .replace_refresh_token(
                user_id,
                &refresh_token_digest(&presented),
                &refresh_token_digest(&tokens.refresh_token),
            )
            .await?;
        if !swapped {
            debug!(user_id = %user_id, "stale refresh token presented");
            return Err(AuthError::TokenStale);
        }

        Ok(tokens)
    }

    async fn logout(&self, user_id: UserId) -> Result<(), AuthError> {
        if !self.user_repo.set_refresh_token(user_id, None).await? {
            return Err(AuthError::UserNotFound);
        }
        info!(user_id = %user_id, "user logged out");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application_impl::Argon2PasswordHasher;
    use crate::application_impl::JwtHs256Codec;
    use crate::application_impl::token_codec_jwt::tests::test_config;
    use crate::infra_fs::FsImageStore;
    use crate::infra_memory::MemoryUserRepo;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct Fixture {
        service: RealAuthService,
        users: Arc<MemoryUserRepo>,
    }

    fn fixture() -> Fixture {
        let users = Arc::new(MemoryUserRepo::new());
        let dir = std::env::temp_dir().join(format!("inkwell-auth-{}", uuid::Uuid::new_v4()));
        let service = RealAuthService::new(
            users.clone(),
            Arc::new(Argon2PasswordHasher::with_params(1024, 1, 1).unwrap()),
            Arc::new(JwtHs256Codec::new(test_config())),
            Arc::new(FsImageStore::new(dir)),
        );
        Fixture { service, users }
    }

    fn registration(email: &str, phone: &str) -> RegisterInput {
        RegisterInput {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: email.into(),
            phone: phone.into(),
            password: "analytical".into(),
            date_of_birth: "1990-12-10".into(),
            preferences: Some(r#"["science","technology"]"#.into()),
            image: None,
        }
    }

    async fn login(f: &Fixture, identifier: &str) -> LoginResult {
        f.service
            .login(LoginInput {
                identifier: identifier.into(),
                password: "analytical".into(),
            })
            .await
            .unwrap()
    }

    async fn stored_digest(f: &Fixture, user_id: UserId) -> Option<String> {
        f.users
            .get_by_id(user_id)
            .await
            .unwrap()
            .unwrap()
            .refresh_token_hash
    }

    #[tokio::test]
    async fn register_opens_a_session() {
        let f = fixture();
        let result = f
            .service
            .register(registration("Ada@Example.com", "0123456789"))
            .await
            .unwrap();

        assert_eq!(result.user.email, "ada@example.com");
        assert_eq!(
            result.user.preferences,
            vec![Category::Science, Category::Technology]
        );
        assert_eq!(
            stored_digest(&f, result.user.id).await,
            Some(refresh_token_digest(&result.tokens.refresh_token))
        );
        let user_id = f
            .service
            .verify_token(&result.tokens.access_token.0)
            .await
            .unwrap();
        assert_eq!(user_id, result.user.id);
    }

    #[tokio::test]
    async fn register_rejects_taken_email_and_phone() {
        let f = fixture();
        f.service
            .register(registration("ada@example.com", "0123456789"))
            .await
            .unwrap();

        let err = f
            .service
            .register(registration("ada@example.com", "9999999999"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::EmailTaken));

        let err = f
            .service
            .register(registration("other@example.com", "0123456789"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::PhoneTaken));
    }

    #[tokio::test]
    async fn register_validates_input() {
        let f = fixture();

        let mut bad = registration("ada@example.com", "0123456789");
        bad.password = "short".into();
        assert!(matches!(
            f.service.register(bad).await.unwrap_err(),
            AuthError::Validation(_)
        ));

        let mut bad = registration("ada@example.com", "0123456789");
        bad.preferences = Some("science".into());
        match f.service.register(bad).await.unwrap_err() {
            AuthError::Validation(msg) => assert_eq!(msg, "Invalid preferences format"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn login_accepts_email_or_phone() {
        let f = fixture();
        let registered = f
            .service
            .register(registration("ada@example.com", "0123456789"))
            .await
            .unwrap();

        assert_eq!(login(&f, "ADA@example.com").await.user.id, registered.user.id);
        assert_eq!(login(&f, "0123456789").await.user.id, registered.user.id);
    }

    #[tokio::test]
    async fn login_rejects_bad_credentials() {
        let f = fixture();
        f.service
            .register(registration("ada@example.com", "0123456789"))
            .await
            .unwrap();

        let err = f
            .service
            .login(LoginInput {
                identifier: "ada@example.com".into(),
                password: "not-the-password".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));

        let err = f
            .service
            .login(LoginInput {
                identifier: "nobody@example.com".into(),
                password: "analytical".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn rotation_replaces_the_live_token() {
        let f = fixture();
        f.service
            .register(registration("ada@example.com", "0123456789"))
            .await
            .unwrap();
        let session = login(&f, "ada@example.com").await;
        let r1 = session.tokens.refresh_token.0.clone();

        let rotated = f.service.refresh_token(&r1).await.unwrap();
        let r2 = rotated.refresh_token.0.clone();
        assert_ne!(r1, r2);
        assert_eq!(
            stored_digest(&f, session.user.id).await,
            Some(refresh_token_digest(&rotated.refresh_token))
        );

        let err = f.service.refresh_token(&r1).await.unwrap_err();
        assert!(matches!(err, AuthError::TokenStale));

        // the failed replay left the live token alone
        assert!(f.service.refresh_token(&r2).await.is_ok());
    }

    #[tokio::test]
    async fn new_login_supersedes_previous_refresh_token() {
        let f = fixture();
        let first = f
            .service
            .register(registration("ada@example.com", "0123456789"))
            .await
            .unwrap();
        login(&f, "ada@example.com").await;

        let err = f
            .service
            .refresh_token(&first.tokens.refresh_token.0)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::TokenStale));
    }

    #[tokio::test]
    async fn logout_revokes_refresh_token() {
        let f = fixture();
        f.service
            .register(registration("ada@example.com", "0123456789"))
            .await
            .unwrap();
        let session = login(&f, "ada@example.com").await;
        let rotated = f
            .service
            .refresh_token(&session.tokens.refresh_token.0)
            .await
            .unwrap();

        f.service.logout(session.user.id).await.unwrap();
        assert_eq!(stored_digest(&f, session.user.id).await, None);

        let err = f
            .service
            .refresh_token(&rotated.refresh_token.0)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::TokenStale));
    }

    #[tokio::test]
    async fn access_token_is_not_a_refresh_token() {
        let f = fixture();
        let session = f
            .service
            .register(registration("ada@example.com", "0123456789"))
            .await
            .unwrap();

        let err = f
            .service
            .refresh_token(&session.tokens.access_token.0)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::TokenInvalid));
        assert!(err.is_unauthenticated());
    }

    #[tokio::test]
    async fn garbage_tokens_are_rejected() {
        let f = fixture();
        let err = f.service.verify_token("garbage-string").await.unwrap_err();
        assert!(matches!(err, AuthError::TokenInvalid));
        let err = f.service.refresh_token("garbage-string").await.unwrap_err();
        assert!(matches!(err, AuthError::TokenInvalid));
    }

    #[tokio::test]
    async fn racing_rotations_have_one_winner() {
        let f = Arc::new(fixture());
        f.service
            .register(registration("ada@example.com", "0123456789"))
            .await
            .unwrap();
        let session = login(&f, "ada@example.com").await;
        let token = session.tokens.refresh_token.0;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let f = f.clone();
            let token = token.clone();
            handles.push(tokio::spawn(async move {
                f.service.refresh_token(&token).await.is_ok()
            }));
        }
        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    /// Delegates to the memory repo, failing the next refresh-token write
    /// when armed.
    struct FlakySessionRepo {
        inner: MemoryUserRepo,
        fail_next_session: AtomicBool,
    }

    #[async_trait::async_trait]
    impl UserRepo for FlakySessionRepo {
        async fn create(&self, user: &User) -> Result<(), RepoError> {
            self.inner.create(user).await
        }

        async fn get_by_id(&self, user_id: UserId) -> Result<Option<User>, RepoError> {
            self.inner.get_by_id(user_id).await
        }

        async fn get_by_identifier(&self, identifier: &str) -> Result<Option<User>, RepoError> {
            self.inner.get_by_identifier(identifier).await
        }

        async fn find_conflict(
            &self,
            email: &str,
            phone: &str,
            exclude: Option<UserId>,
        ) -> Result<Option<UniqueField>, RepoError> {
            self.inner.find_conflict(email, phone, exclude).await
        }

        async fn update_profile(&self, user: &User) -> Result<(), RepoError> {
            self.inner.update_profile(user).await
        }

        async fn id_exists(&self, user_id: UserId) -> Result<bool, RepoError> {
            self.inner.id_exists(user_id).await
        }

        async fn get_authors(&self, ids: &[UserId]) -> Result<Vec<Author>, RepoError> {
            self.inner.get_authors(ids).await
        }

        async fn set_refresh_token(
            &self,
            user_id: UserId,
            token_hash: Option<&str>,
        ) -> Result<bool, RepoError> {
            if self.fail_next_session.swap(false, Ordering::SeqCst) {
                return Err(RepoError::Store("connection reset".into()));
            }
            self.inner.set_refresh_token(user_id, token_hash).await
        }

        async fn replace_refresh_token(
            &self,
            user_id: UserId,
            expected_hash: &str,
            new_hash: &str,
        ) -> Result<bool, RepoError> {
            self.inner
                .replace_refresh_token(user_id, expected_hash, new_hash)
                .await
        }
    }

    #[tokio::test]
    async fn failed_session_after_register_keeps_the_account() {
        let users = Arc::new(FlakySessionRepo {
            inner: MemoryUserRepo::new(),
            fail_next_session: AtomicBool::new(true),
        });
        let dir = std::env::temp_dir().join(format!("inkwell-auth-{}", uuid::Uuid::new_v4()));
        let service = RealAuthService::new(
            users.clone(),
            Arc::new(Argon2PasswordHasher::with_params(1024, 1, 1).unwrap()),
            Arc::new(JwtHs256Codec::new(test_config())),
            Arc::new(FsImageStore::new(dir)),
        );

        let err = service
            .register(registration("ada@example.com", "0123456789"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Store(_)));

        let err = service
            .register(registration("ada@example.com", "0123456789"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::EmailTaken));

        let session = service
            .login(LoginInput {
                identifier: "ada@example.com".into(),
                password: "analytical".into(),
            })
            .await
            .unwrap();
        assert_eq!(session.user.email, "ada@example.com");
        assert!(
            service
                .verify_token(&session.tokens.access_token.0)
                .await
                .is_ok()
        );
    }
}
