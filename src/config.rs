/*
 * Responsibility
 * - 環境変数や設定の読み込み (PORT, CORS 許可, resource route / method / paging 設定など)
 * - 設定値のバリデーション (不足・不正なら起動失敗)
 */
use std::fmt;
use std::net::SocketAddr;
use std::num::NonZeroU64;
use std::str::FromStr;
use std::time::Duration;

use url::Url;

use crate::dispatch::{AllowedMethods, PageSizePolicy, ResourceRoute};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    fn parse(raw: Option<String>) -> Self {
        match raw
            .unwrap_or_else(|| "development".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Memory,
    Postgres,
}

#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,

    pub app_env: AppEnv,
    pub cors_allowed_origins: Vec<String>,
    pub public_base_url: Url,

    pub route: ResourceRoute,
    pub collection_methods: AllowedMethods,
    pub entity_methods: AllowedMethods,
    pub page_size: PageSizePolicy,
    pub collection_name: Option<String>,

    pub backend: BackendKind,
    pub database_url: Option<String>,

    pub request_timeout: Duration,
    pub body_limit_bytes: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key → value source (env, a map in tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port: u16 = lookup("PORT")
            .and_then(|s| s.parse().ok())
            .unwrap_or(3000);

        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let app_env = AppEnv::parse(lookup("APP_ENV"));

        let cors_allowed_origins = lookup("CORS_ALLOWED_ORIGINS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();

        let public_base_url = lookup("PUBLIC_BASE_URL")
            .unwrap_or_else(|| format!("http://localhost:{}", port));
        let public_base_url =
            Url::parse(&public_base_url).map_err(|_| ConfigError::Invalid("PUBLIC_BASE_URL"))?;
        if public_base_url.cannot_be_a_base() {
            return Err(ConfigError::Invalid("PUBLIC_BASE_URL"));
        }

        let route_name = lookup("RESOURCE_ROUTE")
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::Missing("RESOURCE_ROUTE"))?;
        let identifier = lookup("RESOURCE_IDENTIFIER").unwrap_or_else(|| "id".to_string());
        let route = ResourceRoute::new(route_name, identifier);
        // `/health` is taken by the service itself.
        if !route.is_valid() || route.name() == "health" {
            return Err(ConfigError::Invalid("RESOURCE_ROUTE"));
        }

        let collection_methods = match lookup("COLLECTION_HTTP_METHODS") {
            Some(list) => AllowedMethods::parse_list(&list)
                .map_err(|_| ConfigError::Invalid("COLLECTION_HTTP_METHODS"))?,
            None => AllowedMethods::collection_default(),
        };

        let entity_methods = match lookup("ENTITY_HTTP_METHODS") {
            Some(list) => AllowedMethods::parse_list(&list)
                .map_err(|_| ConfigError::Invalid("ENTITY_HTTP_METHODS"))?,
            None => AllowedMethods::entity_default(),
        };

        let page_size_param = lookup("PAGE_SIZE_PARAM");
        let page_size = match lookup("PAGE_SIZE") {
            Some(v) => {
                let size = v
                    .trim()
                    .parse::<NonZeroU64>()
                    .map_err(|_| ConfigError::Invalid("PAGE_SIZE"))?;
                PageSizePolicy::new(size, page_size_param)
            }
            None => PageSizePolicy::default().with_param(page_size_param),
        };

        let collection_name = lookup("COLLECTION_NAME").filter(|s| !s.trim().is_empty());

        let backend = match lookup("BACKEND")
            .unwrap_or_else(|| "memory".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "memory" => BackendKind::Memory,
            "postgres" | "postgresql" => BackendKind::Postgres,
            _ => return Err(ConfigError::Invalid("BACKEND")),
        };

        let database_url = lookup("DATABASE_URL");
        if backend == BackendKind::Postgres && database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        let request_timeout = Duration::from_secs(
            lookup("REQUEST_TIMEOUT_SECS")
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(30),
        );

        let body_limit_bytes = lookup("BODY_LIMIT_BYTES")
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(1024 * 1024);

        Ok(Self {
            addr,
            app_env,
            cors_allowed_origins,
            public_base_url,
            route,
            collection_methods,
            entity_methods,
            page_size,
            collection_name,
            backend,
            database_url,
            request_timeout,
            body_limit_bytes,
        })
    }
}
