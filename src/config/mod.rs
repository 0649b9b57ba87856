use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

use crate::hierarchy::DeletePolicy;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub store: StoreBackend,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
    pub ean: EanConfig,
    pub hierarchy: HierarchyConfig,
    pub organization: OrganizationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

/// Which store implementation the server runs against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
    pub run_migrations: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub port: u16,
    pub enable_request_logging: bool,
    pub max_request_size_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EanConfig {
    /// Base URL of the EAN lookup service; lookups are disabled when unset
    pub lookup_url: Option<String>,
    pub lookup_timeout_secs: u64,
    /// Run the lookup while creating a connection request with a Dutch EAN
    pub auto_lookup_on_create: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HierarchyConfig {
    pub delete_policy: DeletePolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizationConfig {
    pub deletion_grace_hours: i64,
    pub purge_interval_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = env::var("STORE") {
            match v.to_ascii_lowercase().as_str() {
                "memory" => self.store = StoreBackend::Memory,
                "postgres" | "pg" => self.store = StoreBackend::Postgres,
                other => tracing::warn!("Ignoring unknown STORE value '{}'", other),
            }
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = Some(v);
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }
        if let Ok(v) = env::var("DATABASE_RUN_MIGRATIONS") {
            self.database.run_migrations = v.parse().unwrap_or(self.database.run_migrations);
        }

        // API overrides
        if let Some(port) = env::var("ENERGY_ADMIN_PORT")
            .ok()
            .or_else(|| env::var("PORT").ok())
            .and_then(|s| s.parse::<u16>().ok())
        {
            self.api.port = port;
        }
        if let Ok(v) = env::var("API_ENABLE_REQUEST_LOGGING") {
            self.api.enable_request_logging = v.parse().unwrap_or(self.api.enable_request_logging);
        }
        if let Ok(v) = env::var("API_MAX_REQUEST_SIZE_BYTES") {
            self.api.max_request_size_bytes = v.parse().unwrap_or(self.api.max_request_size_bytes);
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }

        // EAN lookup overrides
        if let Ok(v) = env::var("EAN_LOOKUP_URL") {
            self.ean.lookup_url = if v.trim().is_empty() { None } else { Some(v) };
        }
        if let Ok(v) = env::var("EAN_LOOKUP_TIMEOUT_SECS") {
            self.ean.lookup_timeout_secs = v.parse().unwrap_or(self.ean.lookup_timeout_secs);
        }
        if let Ok(v) = env::var("EAN_AUTO_LOOKUP_ON_CREATE") {
            self.ean.auto_lookup_on_create = v.parse().unwrap_or(self.ean.auto_lookup_on_create);
        }

        if let Ok(v) = env::var("HIERARCHY_DELETE_POLICY") {
            match v.parse() {
                Ok(policy) => self.hierarchy.delete_policy = policy,
                Err(_) => tracing::warn!("Ignoring unknown HIERARCHY_DELETE_POLICY '{}'", v),
            }
        }

        // Organization overrides
        if let Ok(v) = env::var("ORGANIZATION_DELETION_GRACE_HOURS") {
            self.organization.deletion_grace_hours =
                v.parse().unwrap_or(self.organization.deletion_grace_hours);
        }
        if let Ok(v) = env::var("ORGANIZATION_PURGE_INTERVAL_SECS") {
            self.organization.purge_interval_secs =
                v.parse().unwrap_or(self.organization.purge_interval_secs);
        }

        self
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            store: StoreBackend::Postgres,
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                connection_timeout: 30,
                run_migrations: true,
            },
            api: ApiConfig {
                port: 3000,
                enable_request_logging: true,
                max_request_size_bytes: 10 * 1024 * 1024, // 10MB
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
            },
            ean: EanConfig {
                lookup_url: None,
                lookup_timeout_secs: 10,
                auto_lookup_on_create: true,
            },
            hierarchy: HierarchyConfig {
                delete_policy: DeletePolicy::Restrict,
            },
            organization: OrganizationConfig {
                deletion_grace_hours: 1,
                purge_interval_secs: 60,
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            store: StoreBackend::Postgres,
            database: DatabaseConfig {
                url: None,
                max_connections: 20,
                connection_timeout: 10,
                run_migrations: true,
            },
            api: ApiConfig {
                port: 3000,
                enable_request_logging: true,
                max_request_size_bytes: 5 * 1024 * 1024, // 5MB
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://staging.example.com".to_string()],
            },
            ean: EanConfig {
                lookup_url: None,
                lookup_timeout_secs: 5,
                auto_lookup_on_create: true,
            },
            hierarchy: HierarchyConfig {
                delete_policy: DeletePolicy::Restrict,
            },
            organization: OrganizationConfig {
                deletion_grace_hours: 24,
                purge_interval_secs: 300,
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            store: StoreBackend::Postgres,
            database: DatabaseConfig {
                url: None,
                max_connections: 50,
                connection_timeout: 5,
                run_migrations: false,
            },
            api: ApiConfig {
                port: 3000,
                enable_request_logging: false,
                max_request_size_bytes: 2 * 1024 * 1024, // 2MB
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://app.example.com".to_string()],
            },
            ean: EanConfig {
                lookup_url: None,
                lookup_timeout_secs: 5,
                auto_lookup_on_create: true,
            },
            hierarchy: HierarchyConfig {
                delete_policy: DeletePolicy::Restrict,
            },
            organization: OrganizationConfig {
                deletion_grace_hours: 24 * 30,
                purge_interval_secs: 900,
            },
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[macro_export]
macro_rules! is_production {
    () => {
        matches!($crate::config::CONFIG.environment, $crate::config::Environment::Production)
    };
}
