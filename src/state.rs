use crate::activity::repo::ActivityRepo;
use crate::auth::repo::UserRepo;
use crate::config::{AppConfig, CookieConfig, JwtConfig, RunMode};
use crate::db::PgStore;
use crate::memory::MemoryStore;
use crate::profiles::repo::ProfileRepo;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserRepo>,
    pub profiles: Arc<dyn ProfileRepo>,
    pub activities: Arc<dyn ActivityRepo>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        if config.uses_memory_store() {
            tracing::warn!("using in-memory store; data is lost on restart");
            return Ok(Self::with_store(Arc::new(MemoryStore::default()), config));
        }

        let store = PgStore::connect(&config).await?;
        store.migrate().await;
        Ok(Self::with_store(Arc::new(store), config))
    }

    pub fn with_store<S>(store: Arc<S>, config: Arc<AppConfig>) -> Self
    where
        S: UserRepo + ProfileRepo + ActivityRepo + 'static,
    {
        Self {
            config,
            users: store.clone(),
            profiles: store.clone(),
            activities: store,
        }
    }

    /// In-memory state for tests.
    pub fn fake() -> Self {
        Self::fake_with(Arc::new(MemoryStore::default()))
    }

    pub fn fake_with(store: Arc<MemoryStore>) -> Self {
        let config = Arc::new(AppConfig {
            database_url: "memory://".into(),
            jwt: JwtConfig {
                secret: "test".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: 5,
            },
            cookie: CookieConfig {
                expire_days: 30,
                domain: None,
            },
            run_mode: RunMode::Development,
        });
        Self::with_store(store, config)
    }
}
