use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::workflows::eligibility::FinalStatusPolicy;

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
    pub roster: RosterSourceConfig,
    pub academic: AcademicServiceConfig,
    pub pipeline: PipelineConfig,
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

        let roster = RosterSourceConfig {
            base_url: env_url("ROSTER_BASE_URL", "http://127.0.0.1:8081")?,
            username: env::var("ROSTER_USER").unwrap_or_default(),
            secret: env::var("ROSTER_SECRET").unwrap_or_default(),
            remote_path: env::var("ROSTER_PATH")
                .unwrap_or_else(|_| "rosters/practicas.csv".to_string()),
            timeout: Duration::from_secs(env_u64("ROSTER_TIMEOUT_SECS", 30)?),
        };

        let academic = AcademicServiceConfig {
            base_url: env_url("ACADEMIC_BASE_URL", "http://127.0.0.1:8082")?,
            api_token: env::var("ACADEMIC_API_TOKEN")
                .ok()
                .filter(|token| !token.trim().is_empty()),
            timeout: Duration::from_secs(env_u64("ACADEMIC_TIMEOUT_SECS", 20)?),
        };

        let final_status_policy = match env::var("ELIGIBILITY_FINAL_STATUS_POLICY") {
            Ok(raw) => FinalStatusPolicy::parse(&raw)
                .ok_or(ConfigError::InvalidFinalStatusPolicy { value: raw })?,
            Err(_) => FinalStatusPolicy::default(),
        };

        let pipeline = PipelineConfig {
            pacing: Duration::from_millis(env_u64("ELIGIBILITY_PACING_MS", 250)?),
            rules_path: env::var("ELIGIBILITY_RULES_PATH").ok().map(PathBuf::from),
            final_status_policy,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            roster,
            academic,
            pipeline,
        })
    }
}

fn env_url(key: &'static str, default: &str) -> Result<Url, ConfigError> {
    let raw = env::var(key).unwrap_or_else(|_| default.to_string());
    Url::parse(raw.trim()).map_err(|source| ConfigError::InvalidUrl { key, source })
}

fn env_u64(key: &'static str, default: u64) -> Result<u64, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidNumber { key }),
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

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Credentials and location of the roster file on the remote file server.
#[derive(Clone)]
pub struct RosterSourceConfig {
    pub base_url: Url,
    pub username: String,
    pub secret: String,
    pub remote_path: String,
    pub timeout: Duration,
}

impl fmt::Debug for RosterSourceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RosterSourceConfig")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("secret", &"[REDACTED]")
            .field("remote_path", &self.remote_path)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Endpoint of the external academic-records service.
#[derive(Clone)]
pub struct AcademicServiceConfig {
    pub base_url: Url,
    pub api_token: Option<String>,
    pub timeout: Duration,
}

impl fmt::Debug for AcademicServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AcademicServiceConfig")
            .field("base_url", &self.base_url)
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Scheduling and policy knobs for the eligibility pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Delay inserted between two consecutive academic lookups.
    pub pacing: Duration,
    /// Optional JSON file with rule drafts used to seed the rule store.
    pub rules_path: Option<PathBuf>,
    pub final_status_policy: FinalStatusPolicy,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidUrl { key: &'static str, source: url::ParseError },
    InvalidNumber { key: &'static str },
    InvalidFinalStatusPolicy { value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidUrl { key, .. } => write!(f, "{key} must be an absolute URL"),
            ConfigError::InvalidNumber { key } => {
                write!(f, "{key} must be a non-negative integer")
            }
            ConfigError::InvalidFinalStatusPolicy { value } => write!(
                f,
                "ELIGIBILITY_FINAL_STATUS_POLICY '{value}' must be 'reset' or 'preserve_override'"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidUrl { source, .. } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidNumber { .. }
            | ConfigError::InvalidFinalStatusPolicy { .. } => None,
        }
    }
}
