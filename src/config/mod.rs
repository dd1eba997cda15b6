use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub scope: ScopeConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
    pub signing: SigningConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScopeConfig {
    /// Hard cap on the leader-tree walk. A corrupted cyclic graph becomes a
    /// fast error instead of a hang.
    pub max_tree_depth: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub default_page_size: i64,
    pub max_page_size: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SigningConfig {
    /// Lifetime of signed download/upload URLs.
    pub url_ttl_secs: u64,
    /// Cached entries are dropped this long before their real expiry, so a
    /// URL handed out from cache still has useful life left.
    pub cache_expiry_margin_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Environment defaults first, then specific env vars override.
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = env::var("SCOPE_MAX_TREE_DEPTH") {
            self.scope.max_tree_depth = v.parse().unwrap_or(self.scope.max_tree_depth);
        }

        if let Ok(v) = env::var("API_DEFAULT_PAGE_SIZE") {
            self.api.default_page_size = v.parse().unwrap_or(self.api.default_page_size);
        }
        if let Ok(v) = env::var("API_MAX_PAGE_SIZE") {
            self.api.max_page_size = v.parse().unwrap_or(self.api.max_page_size);
        }

        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("SECURITY_JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }

        if let Ok(v) = env::var("SIGNING_URL_TTL_SECS") {
            self.signing.url_ttl_secs = v.parse().unwrap_or(self.signing.url_ttl_secs);
        }
        if let Ok(v) = env::var("SIGNING_CACHE_EXPIRY_MARGIN_SECS") {
            self.signing.cache_expiry_margin_secs =
                v.parse().unwrap_or(self.signing.cache_expiry_margin_secs);
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            scope: ScopeConfig { max_tree_depth: 16 },
            api: ApiConfig { default_page_size: 50, max_page_size: 500 },
            security: SecurityConfig {
                jwt_secret: "dev-secret-do-not-deploy".to_string(),
                jwt_expiry_hours: 24 * 7, // 1 week
            },
            signing: SigningConfig { url_ttl_secs: 3600, cache_expiry_margin_secs: 60 },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            scope: ScopeConfig { max_tree_depth: 16 },
            api: ApiConfig { default_page_size: 50, max_page_size: 200 },
            security: SecurityConfig { jwt_secret: String::new(), jwt_expiry_hours: 24 },
            signing: SigningConfig { url_ttl_secs: 1800, cache_expiry_margin_secs: 60 },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            scope: ScopeConfig { max_tree_depth: 12 },
            api: ApiConfig { default_page_size: 20, max_page_size: 100 },
            security: SecurityConfig { jwt_secret: String::new(), jwt_expiry_hours: 4 },
            signing: SigningConfig { url_ttl_secs: 900, cache_expiry_margin_secs: 30 },
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}
