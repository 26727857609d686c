//! Result cache keyed by normalised query.
//!
//! Values are the final, price-sorted product list stored as a JSON array
//! with a fixed TTL. The production backend is Redis; if Redis cannot be
//! reached at startup the cache runs degraded, where every lookup misses and
//! every write is dropped. An in-process [`moka`] backend serves tests and
//! deployments without Redis.
//!
//! Cache failures never reach the caller: they are logged and turned into a
//! miss or a no-op.

use std::time::Duration;

use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use url::Url;

use crate::error::SearchError;
use crate::types::Product;

/// Upper bound on entries kept by the in-process backend.
const MAX_MEMORY_ENTRIES: u64 = 1_000;

/// How to reach Redis at startup.
#[derive(Debug, Clone)]
pub struct RedisSettings {
    /// `host:port`.
    pub addr: String,
    /// Optional `AUTH` password; empty means none.
    pub password: Option<String>,
    /// Logical database index.
    pub db: u32,
    /// Connection attempts before giving up and running degraded.
    pub connect_attempts: u32,
    /// Pause between connection attempts.
    pub retry_interval: Duration,
    /// Timeout for one connection attempt (connect + `PING`).
    pub connect_timeout: Duration,
}

impl Default for RedisSettings {
    fn default() -> Self {
        Self {
            addr: "localhost:6379".into(),
            password: None,
            db: 0,
            connect_attempts: 4,
            retry_interval: Duration::from_secs(2),
            connect_timeout: Duration::from_secs(5),
        }
    }
}

impl RedisSettings {
    /// `redis://` URL with the password percent-encoded.
    fn url(&self) -> Result<Url, SearchError> {
        let mut url = Url::parse(&format!("redis://{}/{}", self.addr, self.db))
            .map_err(|e| SearchError::Cache(format!("invalid redis address {}: {e}", self.addr)))?;
        if let Some(password) = self.password.as_deref().filter(|p| !p.is_empty()) {
            url.set_password(Some(password))
                .map_err(|()| SearchError::Cache("redis address cannot carry a password".into()))?;
        }
        Ok(url)
    }
}

#[derive(Clone)]
enum Backend {
    Redis(ConnectionManager),
    Memory(moka::future::Cache<String, String>),
    Disabled,
}

/// Product list cache shared by all searches of one orchestrator.
#[derive(Clone)]
pub struct ProductCache {
    backend: Backend,
    ttl: Duration,
}

impl ProductCache {
    /// Connect to Redis, retrying at a fixed interval.
    ///
    /// Never fails: when every attempt fails the returned cache is degraded,
    /// which is logged once here.
    pub async fn connect(settings: &RedisSettings, ttl: Duration) -> Self {
        match Self::connect_redis(settings).await {
            Ok(manager) => {
                tracing::info!(addr = %settings.addr, "connected to redis");
                Self {
                    backend: Backend::Redis(manager),
                    ttl,
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "redis unavailable, running without cache");
                Self::disabled()
            }
        }
    }

    /// In-process cache with the same TTL semantics.
    pub fn in_memory(ttl: Duration) -> Self {
        let cache = moka::future::Cache::builder()
            .max_capacity(MAX_MEMORY_ENTRIES)
            .time_to_live(ttl)
            .build();
        Self {
            backend: Backend::Memory(cache),
            ttl,
        }
    }

    /// Degraded cache: lookups miss, writes are dropped.
    pub fn disabled() -> Self {
        Self {
            backend: Backend::Disabled,
            ttl: Duration::ZERO,
        }
    }

    /// Whether this cache drops everything.
    pub fn is_degraded(&self) -> bool {
        matches!(self.backend, Backend::Disabled)
    }

    /// Look up the product list for a normalised query.
    ///
    /// Returns `None` on miss, in degraded mode, and on any backend or
    /// decoding error.
    pub async fn get(&self, key: &str) -> Option<Vec<Product>> {
        match self.try_get(key).await {
            Ok(hit) => hit,
            Err(e) => {
                tracing::warn!(error = %e, "cache read failed, treating as miss");
                None
            }
        }
    }

    /// Store the product list for a normalised query with the cache TTL.
    ///
    /// Failures are logged and otherwise ignored.
    pub async fn set(&self, key: &str, products: &[Product]) {
        if let Err(e) = self.try_set(key, products).await {
            tracing::warn!(error = %e, "cache write failed");
        }
    }

    async fn try_get(&self, key: &str) -> Result<Option<Vec<Product>>, SearchError> {
        let raw = match &self.backend {
            Backend::Redis(manager) => {
                let mut conn = manager.clone();
                conn.get::<_, Option<String>>(key)
                    .await
                    .map_err(|e| SearchError::Cache(format!("redis GET failed: {e}")))?
            }
            Backend::Memory(cache) => cache.get(key).await,
            Backend::Disabled => None,
        };

        raw.map(|json| {
            serde_json::from_str(&json)
                .map_err(|e| SearchError::Cache(format!("cached value is not a product list: {e}")))
        })
        .transpose()
    }

    async fn try_set(&self, key: &str, products: &[Product]) -> Result<(), SearchError> {
        if self.is_degraded() {
            return Ok(());
        }
        let json = serde_json::to_string(products)
            .map_err(|e| SearchError::Cache(format!("cannot encode product list: {e}")))?;

        match &self.backend {
            Backend::Redis(manager) => {
                let mut conn = manager.clone();
                conn.set_ex::<_, _, ()>(key, json, self.ttl.as_secs())
                    .await
                    .map_err(|e| SearchError::Cache(format!("redis SETEX failed: {e}")))
            }
            Backend::Memory(cache) => {
                cache.insert(key.to_string(), json).await;
                Ok(())
            }
            Backend::Disabled => Ok(()),
        }
    }

    async fn connect_redis(settings: &RedisSettings) -> Result<ConnectionManager, SearchError> {
        let url = settings.url()?;
        let client = redis::Client::open(url.as_str())
            .map_err(|e| SearchError::Cache(format!("invalid redis URL: {e}")))?;

        let attempts = settings.connect_attempts.max(1);
        let mut last_error = String::new();
        for attempt in 1..=attempts {
            match tokio::time::timeout(settings.connect_timeout, open_manager(&client)).await {
                Ok(Ok(manager)) => return Ok(manager),
                Ok(Err(e)) => last_error = e.to_string(),
                Err(_) => last_error = "connection timed out".into(),
            }
            tracing::warn!(attempt, error = %last_error, "redis connection attempt failed");
            if attempt < attempts {
                tokio::time::sleep(settings.retry_interval).await;
            }
        }

        Err(SearchError::Cache(format!(
            "redis unreachable after {attempts} attempts: {last_error}"
        )))
    }
}

async fn open_manager(client: &redis::Client) -> redis::RedisResult<ConnectionManager> {
    let mut manager = ConnectionManager::new(client.clone()).await?;
    let _: String = redis::cmd("PING").query_async(&mut manager).await?;
    Ok(manager)
}
