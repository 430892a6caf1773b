use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_port::*;
use crate::infra_fs::*;
use crate::infra_memory::*;
use crate::infra_mysql::*;
use crate::logger::*;
use crate::settings::{DatabaseBackend, Settings};
use sqlx::mysql::MySqlPoolOptions;
use sqlx::{MySql, Pool};
use std::sync::Arc;

/// Storage backends the services are wired against.
pub struct Stores {
    pub user_repo: Arc<dyn UserRepo>,
    pub article_repo: Arc<dyn ArticleRepo>,
    pub tx_manager: Arc<dyn TxManager>,
    pub image_store: Arc<dyn ImageStore>,
}

impl Stores {
    pub fn memory(image_store: Arc<dyn ImageStore>) -> Self {
        Stores {
            user_repo: Arc::new(MemoryUserRepo::new()),
            article_repo: Arc::new(MemoryArticleRepo::new()),
            tx_manager: Arc::new(MemoryTxManager::new()),
            image_store,
        }
    }

    pub fn mysql(pool: Pool<MySql>, image_store: Arc<dyn ImageStore>) -> Self {
        Stores {
            user_repo: Arc::new(MySqlUserRepo::new(pool.clone())),
            article_repo: Arc::new(MySqlArticleRepo::new(pool.clone())),
            tx_manager: Arc::new(MySqlTxManager::new(pool)),
            image_store,
        }
    }
}

pub struct Server {
    pub auth_service: Arc<dyn AuthService>,
    pub user_service: Arc<dyn UserService>,
    pub article_service: Arc<dyn ArticleService>,
    /// Largest accepted image upload, in bytes.
    pub max_file_size: u64,
    pool: Option<Pool<MySql>>,
}

impl Server {
    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        let image_store: Arc<dyn ImageStore> = Arc::new(FsImageStore::new(&settings.upload.dir));

        let (stores, pool) = match settings.database.backend {
            DatabaseBackend::Memory => {
                warn!("using in-memory storage, data is lost on restart");
                (Stores::memory(image_store), None)
            }
            DatabaseBackend::Mysql => {
                let url = settings
                    .database
                    .url
                    .as_deref()
                    .ok_or_else(|| anyhow::anyhow!("database.url is not set"))?;
                let pool = MySqlPoolOptions::new()
                    .max_connections(settings.database.max_connections)
                    .connect(url)
                    .await?;
                (Stores::mysql(pool.clone(), image_store), Some(pool))
            }
        };

        let password = &settings.auth.password;
        let credential_hasher: Arc<dyn CredentialHasher> = Arc::new(
            Argon2PasswordHasher::with_params(
                password.memory_kib,
                password.iterations,
                password.parallelism,
            )
            .map_err(|e| anyhow::anyhow!(e))?,
        );

        let token_codec: Arc<dyn TokenCodec> = Arc::new(JwtHs256Codec::new(JwtConfig {
            issuer: settings.auth.issuer.clone(),
            audience: settings.auth.audience.clone(),
            access_ttl: chrono::Duration::seconds(settings.auth.access_ttl_secs),
            refresh_ttl: chrono::Duration::seconds(settings.auth.refresh_ttl_secs),
            access_secret: settings.auth.access_secret.clone().into_bytes(),
            refresh_secret: settings.auth.refresh_secret.clone().into_bytes(),
        }));

        let mut server = Self::from_parts(stores, credential_hasher, token_codec);
        server.max_file_size = settings.upload.max_file_size;
        server.pool = pool;

        info!(backend = ?settings.database.backend, "server started");
        Ok(server)
    }

    /// Wire the services over already-built stores. Used directly by tests.
    pub fn from_parts(
        stores: Stores,
        credential_hasher: Arc<dyn CredentialHasher>,
        token_codec: Arc<dyn TokenCodec>,
    ) -> Self {
        let auth_service: Arc<dyn AuthService> = Arc::new(RealAuthService::new(
            stores.user_repo.clone(),
            credential_hasher.clone(),
            token_codec,
            stores.image_store.clone(),
        ));
        let user_service: Arc<dyn UserService> = Arc::new(RealUserService::new(
            stores.user_repo.clone(),
            credential_hasher,
            stores.image_store.clone(),
        ));
        let article_service: Arc<dyn ArticleService> = Arc::new(RealArticleService::new(
            stores.article_repo,
            stores.user_repo,
            stores.image_store,
            stores.tx_manager,
        ));

        Self {
            auth_service,
            user_service,
            article_service,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            pool: None,
        }
    }

    pub async fn shutdown(&self) {
        info!("server shutting down...");

        if let Some(pool) = &self.pool {
            pool.close().await;
        }
    }
}

pub const DEFAULT_MAX_FILE_SIZE: u64 = 5 * 1024 * 1024;
