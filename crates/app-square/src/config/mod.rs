use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration, built once at startup and handed to every component.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub database: DatabaseConfig,
    pub admin: AdminConfig,
    pub portal: PortalConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;
        let api_prefix = env::var("APP_API_PREFIX").unwrap_or_else(|_| "/api".to_string());
        if !api_prefix.starts_with('/') || api_prefix.len() < 2 {
            return Err(ConfigError::InvalidApiPrefix(api_prefix));
        }

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let database_path = env::var("APP_DATABASE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("ai_app_square.db"));

        let admin_token = env::var("APP_ADMIN_TOKEN")
            .ok()
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty());

        let oa_rule_base_url = env::var("APP_OA_RULE_BASE_URL")
            .map(|url| url.trim().to_string())
            .unwrap_or_else(|_| "https://oa.example.internal".to_string());
        if !(oa_rule_base_url.starts_with("https://") || oa_rule_base_url.starts_with("http://")) {
            return Err(ConfigError::InvalidRuleBaseUrl(oa_rule_base_url));
        }

        Ok(Self {
            environment,
            server: ServerConfig {
                host,
                port,
                api_prefix,
            },
            telemetry: TelemetryConfig { log_level },
            database: DatabaseConfig {
                path: database_path,
            },
            admin: AdminConfig { token: admin_token },
            portal: PortalConfig { oa_rule_base_url },
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub api_prefix: String,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Location of the SQLite database backing the directory and leaderboards.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

impl DatabaseConfig {
    pub fn is_in_memory(&self) -> bool {
        self.path.as_os_str() == ":memory:"
    }
}

/// Credentials for privileged endpoints. A missing token locks every admin route.
#[derive(Clone, Default)]
pub struct AdminConfig {
    pub token: Option<String>,
}

impl fmt::Debug for AdminConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminConfig")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Links the portal hands out to the front end.
#[derive(Debug, Clone)]
pub struct PortalConfig {
    pub oa_rule_base_url: String,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidApiPrefix(String),
    InvalidRuleBaseUrl(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidApiPrefix(prefix) => {
                write!(f, "APP_API_PREFIX must start with '/' (found '{prefix}')")
            }
            ConfigError::InvalidRuleBaseUrl(url) => {
                write!(f, "APP_OA_RULE_BASE_URL must be an http(s) URL (found '{url}')")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort
            | ConfigError::InvalidApiPrefix(_)
            | ConfigError::InvalidRuleBaseUrl(_) => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        env::remove_var("APP_ENV");
        env::remove_var("APP_HOST");
        env::remove_var("APP_PORT");
        env::remove_var("APP_LOG_LEVEL");
        env::remove_var("APP_DATABASE_PATH");
        env::remove_var("APP_ADMIN_TOKEN");
        env::remove_var("APP_API_PREFIX");
        env::remove_var("APP_OA_RULE_BASE_URL");
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.api_prefix, "/api");
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.database.path, PathBuf::from("ai_app_square.db"));
        assert!(config.admin.token.is_none());
        assert_eq!(config.portal.oa_rule_base_url, "https://oa.example.internal");
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
        reset_env();
    }

    #[test]
    fn blank_admin_token_is_treated_as_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_ADMIN_TOKEN", "   ");
        let config = AppConfig::load().expect("config loads");
        assert!(config.admin.token.is_none());
        reset_env();
    }

    #[test]
    fn rejects_relative_api_prefix() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_API_PREFIX", "api");
        match AppConfig::load() {
            Err(ConfigError::InvalidApiPrefix(prefix)) => assert_eq!(prefix, "api"),
            other => panic!("expected invalid prefix, got {other:?}"),
        }
        reset_env();
    }

    #[test]
    fn rule_base_url_must_be_http() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_OA_RULE_BASE_URL", "oa.internal/rules");
        match AppConfig::load() {
            Err(ConfigError::InvalidRuleBaseUrl(url)) => assert_eq!(url, "oa.internal/rules"),
            other => panic!("expected invalid rule base url, got {other:?}"),
        }

        env::set_var("APP_OA_RULE_BASE_URL", " https://oa.corp.test ");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.portal.oa_rule_base_url, "https://oa.corp.test");
        reset_env();
    }

    #[test]
    fn debug_output_redacts_admin_token() {
        let config = AdminConfig {
            token: Some("secret-token".to_string()),
        };
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("secret-token"));
        assert!(rendered.contains("redacted"));
    }
}
