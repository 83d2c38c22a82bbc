use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

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

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub resilience: ResilienceConfig,
    pub verification: VerificationConfig,
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

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let resilience = ResilienceConfig {
            max_attempts: parse_env_u32("MAX_RETRIES", 3)?,
            call_timeout_ms: parse_env_u64("API_TIMEOUT_MS", 5_000)?,
            base_delay_ms: parse_env_u64("RETRY_BASE_DELAY_MS", 500)?,
            max_delay_ms: parse_env_u64("RETRY_MAX_DELAY_MS", 6_000)?,
        };

        // Default to the mock endpoints the api service mounts on itself, so a
        // bare `serve` is immediately exercisable in development.
        let base = format!("http://{host}:{port}");
        let verification = VerificationConfig {
            identity_url: env::var("IDENTITY_SERVICE_URL")
                .unwrap_or_else(|_| format!("{base}/mock/identity")),
            fraud_url: env::var("FRAUD_SERVICE_URL")
                .unwrap_or_else(|_| format!("{base}/mock/fraud")),
            bureau_url: env::var("BUREAU_SERVICE_URL")
                .unwrap_or_else(|_| format!("{base}/mock/bureau")),
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            resilience,
            verification,
        })
    }
}

fn parse_env_u32(key: &'static str, default: u32) -> Result<u32, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .parse::<u32>()
            .map_err(|_| ConfigError::InvalidInteger { key }),
        Err(_) => Ok(default),
    }
}

fn parse_env_u64(key: &'static str, default: u64) -> Result<u64, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidInteger { key }),
        Err(_) => Ok(default),
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
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

/// Retry and timeout settings applied to every external verification call.
#[derive(Debug, Clone)]
pub struct ResilienceConfig {
    pub max_attempts: u32,
    pub call_timeout_ms: u64,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl ResilienceConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

/// Endpoints for the three external verification dependencies.
#[derive(Debug, Clone)]
pub struct VerificationConfig {
    pub identity_url: String,
    pub fraud_url: String,
    pub bureau_url: String,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidInteger { key: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidInteger { key } => {
                write!(f, "{key} must be a non-negative integer")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidInteger { .. } => None,
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
        env::remove_var("MAX_RETRIES");
        env::remove_var("API_TIMEOUT_MS");
        env::remove_var("RETRY_BASE_DELAY_MS");
        env::remove_var("RETRY_MAX_DELAY_MS");
        env::remove_var("IDENTITY_SERVICE_URL");
        env::remove_var("FRAUD_SERVICE_URL");
        env::remove_var("BUREAU_SERVICE_URL");
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.resilience.max_attempts, 3);
        assert_eq!(config.resilience.call_timeout(), Duration::from_secs(5));
        assert!(config.verification.identity_url.ends_with("/mock/identity"));
    }

    #[test]
    fn load_rejects_non_numeric_retry_settings() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("MAX_RETRIES", "many");
        let result = AppConfig::load();
        assert!(matches!(
            result,
            Err(ConfigError::InvalidInteger { key: "MAX_RETRIES" })
        ));
        env::remove_var("MAX_RETRIES");
    }

    #[test]
    fn external_urls_override_defaults() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("FRAUD_SERVICE_URL", "http://fraud.internal/v2/check");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.verification.fraud_url, "http://fraud.internal/v2/check");
        assert!(config.verification.bureau_url.ends_with("/mock/bureau"));
        env::remove_var("FRAUD_SERVICE_URL");
    }
}
