//! Service configuration read from the process environment.
//!
//! | Variable         | Default          |
//! |------------------|------------------|
//! | `PORT`           | `8080`           |
//! | `REDIS_ADDR`     | `localhost:6379` |
//! | `REDIS_PASSWORD` | empty            |
//! | `STATIC_DIR`     | `web/dist`       |
//! | `OZON_COOKIES`   | `cookies.json`   |
//! | `PROXY_FILE`     | `proxy.txt`      |
//!
//! An empty variable counts as unset.

use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use pricehound_search::{RedisSettings, SearchConfig};

use crate::error::{Result, ServiceError};

/// Resolved service settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// TCP port to listen on (all interfaces).
    pub port: u16,
    /// Redis `host:port`.
    pub redis_addr: String,
    /// Redis password, if any.
    pub redis_password: Option<String>,
    /// Directory served for every path other than `/search`.
    pub static_dir: PathBuf,
    /// Browser-exported Ozon cookie snapshot.
    pub ozon_cookies: PathBuf,
    /// Optional upstream proxy file shared by both marketplaces.
    pub proxy_file: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            redis_addr: "localhost:6379".into(),
            redis_password: None,
            static_dir: PathBuf::from("web/dist"),
            ozon_cookies: PathBuf::from("cookies.json"),
            proxy_file: PathBuf::from("proxy.txt"),
        }
    }
}

impl ServerConfig {
    /// Read the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Config`] if `PORT` is not a valid port number.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the configuration through `lookup`, which maps a variable name
    /// to its value.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Config`] if `PORT` is not a valid port number.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let defaults = Self::default();

        let port = match var("PORT") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|e| ServiceError::Config(format!("invalid PORT {raw:?}: {e}")))?,
            None => defaults.port,
        };

        Ok(Self {
            port,
            redis_addr: var("REDIS_ADDR").unwrap_or(defaults.redis_addr),
            redis_password: var("REDIS_PASSWORD"),
            static_dir: var("STATIC_DIR").map_or(defaults.static_dir, PathBuf::from),
            ozon_cookies: var("OZON_COOKIES").map_or(defaults.ozon_cookies, PathBuf::from),
            proxy_file: var("PROXY_FILE").map_or(defaults.proxy_file, PathBuf::from),
        })
    }

    /// Address to bind the listener to.
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.port))
    }

    /// Search core configuration with this service's file paths applied.
    pub fn search_config(&self) -> SearchConfig {
        let mut config = SearchConfig::default();
        config.ozon.cookies_path = self.ozon_cookies.clone();
        config.ozon.proxy_path = Some(self.proxy_file.clone());
        config.wildberries.proxy_path = Some(self.proxy_file.clone());
        config
    }

    /// Redis connection settings.
    pub fn redis_settings(&self) -> RedisSettings {
        RedisSettings {
            addr: self.redis_addr.clone(),
            password: self.redis_password.clone(),
            ..Default::default()
        }
    }
}
